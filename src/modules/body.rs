use std::collections::{HashSet, VecDeque};

use crate::modules::collision::{Collision, classify};
use crate::modules::grid::{Cell, Grid};

/// Outcome of moving the head one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Continue,
    Captured,
    Terminated(Collision),
}

/// The agent's body: head first, tail last, with an occupancy mirror kept in step.
#[derive(Debug, Clone)]
pub struct SegmentChain {
    cells: VecDeque<Cell>,
    occupancy: HashSet<Cell>,
}

impl SegmentChain {
    pub fn new(head: Cell) -> Self {
        let mut cells = VecDeque::new();
        cells.push_back(head);
        let mut occupancy = HashSet::new();
        occupancy.insert(head);
        Self { cells, occupancy }
    }

    /// Build a chain from explicit cells, head first. Panics if the cells are not a
    /// simple path of unit steps.
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        let cells: VecDeque<Cell> = cells.into_iter().collect();
        assert!(!cells.is_empty(), "segment chain needs a head");
        let occupancy: HashSet<Cell> = cells.iter().copied().collect();
        let chain = Self { cells, occupancy };
        chain.check_invariants();
        chain
    }

    pub fn head(&self) -> Cell {
        self.cells[0]
    }

    pub fn tail(&self) -> Cell {
        self.cells[self.cells.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Cell> {
        self.cells.iter().copied().collect()
    }

    pub fn occupancy(&self) -> &HashSet<Cell> {
        &self.occupancy
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.occupancy.contains(&cell)
    }

    /// Move the head into `next`. On a capture the tail stays and the chain grows by one;
    /// otherwise the tail vacates. Collisions leave the chain untouched.
    pub fn advance(&mut self, grid: &Grid, next: Cell, goal: Option<Cell>) -> Advance {
        let capturing = goal == Some(next);
        let vacating = (!capturing).then(|| self.tail());

        let collision = classify(grid, next, &self.occupancy, vacating);
        if !collision.is_safe() {
            return Advance::Terminated(collision);
        }

        let head = self.head();
        assert!(
            head.is_adjacent(next),
            "head jumped from {} to {}",
            head,
            next
        );

        if !capturing {
            if let Some(tail) = self.cells.pop_back() {
                self.occupancy.remove(&tail);
            }
        }
        self.cells.push_front(next);
        self.occupancy.insert(next);

        debug_assert_eq!(self.cells.len(), self.occupancy.len(), "chain overlaps itself");

        if capturing {
            Advance::Captured
        } else {
            Advance::Continue
        }
    }

    fn check_invariants(&self) {
        assert_eq!(
            self.cells.len(),
            self.occupancy.len(),
            "segment chain repeats a cell"
        );
        for (a, b) in self.cells.iter().zip(self.cells.iter().skip(1)) {
            assert!(a.is_adjacent(*b), "segments {} and {} are not adjacent", a, b);
        }
    }
}
