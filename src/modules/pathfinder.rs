use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::modules::grid::{Cell, Direction, Grid};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Frontier {
    f: i32,
    h: i32,
    seq: u64,
    cell: Cell,
}

// BinaryHeap is a max-heap; invert so the lowest f (then h, then insertion order) pops first.
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* over the 4-connected grid with a Manhattan heuristic.
///
/// Occupied cells are walls, except `tail`, which vacates as the head advances.
pub struct Pathfinder<'a> {
    grid: &'a Grid,
    occupancy: &'a HashSet<Cell>,
    tail: Option<Cell>,
}

impl<'a> Pathfinder<'a> {
    pub fn new(grid: &'a Grid, occupancy: &'a HashSet<Cell>, tail: Option<Cell>) -> Self {
        Self {
            grid,
            occupancy,
            tail,
        }
    }

    fn passable(&self, cell: Cell) -> bool {
        self.grid.in_bounds(cell) && (!self.occupancy.contains(&cell) || self.tail == Some(cell))
    }

    /// Shortest route from `start` (exclusive) to `goal` (inclusive). Empty when the goal
    /// is unreachable.
    pub fn route(&self, start: Cell, goal: Cell) -> Vec<Cell> {
        self.route_with_first_steps(start, goal, &Direction::ALL)
    }

    /// Like [`route`](Self::route), but leaves the start cell only through `first_steps`,
    /// tried in that order, so ties between equally short routes favour earlier entries.
    pub fn route_with_first_steps(
        &self,
        start: Cell,
        goal: Cell,
        first_steps: &[Direction],
    ) -> Vec<Cell> {
        if start == goal || !self.grid.in_bounds(start) || !self.grid.in_bounds(goal) {
            return Vec::new();
        }

        let n = self.grid.cell_count();
        let mut g_score = vec![i32::MAX; n];
        let mut came_from: Vec<Option<Cell>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut open = BinaryHeap::new();
        let mut seq = 0u64;

        let h0 = start.manhattan(goal);
        g_score[self.grid.index_of(start)] = 0;
        open.push(Frontier {
            f: h0,
            h: h0,
            seq,
            cell: start,
        });

        while let Some(Frontier { cell, .. }) = open.pop() {
            let ci = self.grid.index_of(cell);
            if closed[ci] {
                continue;
            }
            closed[ci] = true;

            if cell == goal {
                return self.reconstruct(&came_from, start, goal);
            }

            let order: &[Direction] = if cell == start {
                first_steps
            } else {
                &Direction::ALL
            };
            let base = g_score[ci];
            for &dir in order {
                let next = cell.step(dir);
                if !self.passable(next) {
                    continue;
                }
                let ni = self.grid.index_of(next);
                let tentative = base + 1;
                if tentative < g_score[ni] {
                    g_score[ni] = tentative;
                    came_from[ni] = Some(cell);
                    seq += 1;
                    let h = next.manhattan(goal);
                    open.push(Frontier {
                        f: tentative + h,
                        h,
                        seq,
                        cell: next,
                    });
                }
            }
        }

        Vec::new()
    }

    fn reconstruct(&self, came_from: &[Option<Cell>], start: Cell, goal: Cell) -> Vec<Cell> {
        let mut path = vec![goal];
        let mut current = goal;
        while let Some(prev) = came_from[self.grid.index_of(current)] {
            if prev == start {
                break;
            }
            path.push(prev);
            current = prev;
        }
        path.reverse();
        debug_assert!(
            path.iter().all(|c| self.passable(*c)),
            "route crosses an occupied cell"
        );
        path
    }
}
