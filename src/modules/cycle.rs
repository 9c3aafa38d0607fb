use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::modules::error::{EngineError, EngineResult};
use crate::modules::grid::{Cell, Direction, Grid};

/// How the full-coverage tour is laid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CycleStrategy {
    /// Back-and-forth row sweep with a return lane up column 0. Covers every cell when one
    /// side is even and all but one corner otherwise.
    #[default]
    Boustrophedon,
    /// Clockwise inward spiral from the origin. Closed only on two-wide grids.
    Spiral,
}

impl CycleStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            CycleStrategy::Boustrophedon => "boustrophedon",
            CycleStrategy::Spiral => "spiral",
        }
    }
}

impl fmt::Display for CycleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for CycleStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "boustrophedon" => Ok(CycleStrategy::Boustrophedon),
            "spiral" => Ok(CycleStrategy::Spiral),
            other => Err(format!(
                "unknown cycle strategy '{}', use boustrophedon|spiral",
                other
            )),
        }
    }
}

/// A Hamiltonian circuit over the cells of a grid, read-only once built.
///
/// Odd-by-odd grids admit no such circuit, so their tour leaves out the bottom-right
/// corner (the `spare` cell). The spare is reachable only as a detour: in from the cell
/// above it, out to the cell beside it, skipping the one tour cell in between.
#[derive(Debug, Clone)]
pub struct FallbackCycle {
    grid: Grid,
    strategy: CycleStrategy,
    order: Vec<Cell>,
    position: Vec<Option<usize>>,
    spare: Option<Cell>,
}

impl FallbackCycle {
    /// Build and verify the tour. Fails if the construction does not close on this grid.
    pub fn build(grid: Grid, strategy: CycleStrategy) -> EngineResult<Self> {
        let no_tour = || EngineError::NoClosedTour {
            width: grid.width() as u32,
            height: grid.height() as u32,
            strategy,
        };

        let (order, spare) = match strategy {
            CycleStrategy::Boustrophedon => boustrophedon(&grid).ok_or_else(no_tour)?,
            CycleStrategy::Spiral => (spiral(&grid), None),
        };
        if !covers_all_but(&grid, &order, spare) {
            return Err(no_tour());
        }

        let mut position = vec![None; grid.cell_count()];
        for (i, cell) in order.iter().enumerate() {
            position[grid.index_of(*cell)] = Some(i);
        }

        Ok(Self {
            grid,
            strategy,
            order,
            position,
            spare,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn strategy(&self) -> CycleStrategy {
        self.strategy
    }

    pub fn cells(&self) -> &[Cell] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The cell the tour skips, if any.
    pub fn spare(&self) -> Option<Cell> {
        self.spare
    }

    /// Position of `cell` along the tour; `None` for the spare cell.
    pub fn position_of(&self, cell: Cell) -> Option<usize> {
        self.position[self.grid.index_of(cell)]
    }

    /// The tour cell above the spare, the only way into the detour.
    pub fn spare_entry(&self) -> Option<Cell> {
        self.spare.map(|c| c.step(Direction::Up))
    }

    /// The cell that follows `cell` on the tour, wrapping at the end. The spare cell
    /// rejoins the tour beside it.
    pub fn next_after(&self, cell: Cell) -> Cell {
        self.next_from(cell, None)
    }

    /// Like [`next_after`](Self::next_after), but a head on the spare cell never turns
    /// back into `neck`.
    pub fn next_from(&self, cell: Cell, neck: Option<Cell>) -> Cell {
        match self.position_of(cell) {
            Some(i) => self.order[(i + 1) % self.order.len()],
            None => {
                let beside = cell.step(Direction::Left);
                if neck == Some(beside) {
                    cell.step(Direction::Up)
                } else {
                    beside
                }
            }
        }
    }

    /// Position in the cyclic order used to keep a body sorted along the tour. Tour cells
    /// take even keys; the spare slots in right after its entry cell.
    pub fn order_key(&self, cell: Cell) -> usize {
        match self.position_of(cell) {
            Some(i) => 2 * i,
            None => {
                let entry = self.position_of(cell.step(Direction::Up)).unwrap_or_default();
                2 * entry + 1
            }
        }
    }

    /// Forward distance from `from` to `to` in order keys, in `0..2 * len`.
    pub fn key_distance(&self, from: Cell, to: Cell) -> usize {
        let span = 2 * self.order.len();
        (self.order_key(to) + span - self.order_key(from)) % span
    }

    /// Whether `cells`, given head first, climb strictly through the tour order from the
    /// last one. Any one or two cells qualify.
    pub fn is_ordered<I>(&self, cells: I, tail: Cell) -> bool
    where
        I: IntoIterator<Item = Cell>,
    {
        let mut above = usize::MAX;
        for cell in cells {
            let key = self.key_distance(tail, cell);
            if key >= above {
                return false;
            }
            above = key;
        }
        true
    }
}

/// Every cell exactly once, unit steps throughout, last cell adjacent to the first.
pub fn is_closed_tour(grid: &Grid, order: &[Cell]) -> bool {
    covers_all_but(grid, order, None)
}

fn covers_all_but(grid: &Grid, order: &[Cell], spare: Option<Cell>) -> bool {
    let expected = grid.cell_count() - usize::from(spare.is_some());
    if order.len() != expected || order.len() < 2 {
        return false;
    }
    let mut seen = vec![false; grid.cell_count()];
    if let Some(cell) = spare {
        if !grid.in_bounds(cell) {
            return false;
        }
        seen[grid.index_of(cell)] = true;
    }
    for cell in order {
        if !grid.in_bounds(*cell) {
            return false;
        }
        let i = grid.index_of(*cell);
        if seen[i] {
            return false;
        }
        seen[i] = true;
    }
    order
        .iter()
        .zip(order.iter().cycle().skip(1))
        .all(|(a, b)| a.is_adjacent(*b))
}

fn boustrophedon(grid: &Grid) -> Option<(Vec<Cell>, Option<Cell>)> {
    let (w, h) = (grid.width(), grid.height());
    if h % 2 == 0 {
        Some((sweep(w, h), None))
    } else if w % 2 == 0 {
        let order = sweep(h, w)
            .into_iter()
            .map(|c| Cell::new(c.y, c.x))
            .collect();
        Some((order, None))
    } else if w >= 3 && h >= 3 {
        Some((sweep_odd(w, h), Some(Cell::new(w - 1, h - 1))))
    } else {
        None
    }
}

// Row 0 left to right, rows 1..h snake over columns 1..w, then back up column 0.
// The last sweep row (h - 1) is odd and ends at x = 1, next to the return lane.
fn sweep(w: i32, h: i32) -> Vec<Cell> {
    let mut order = Vec::with_capacity((w * h) as usize);
    order.extend((0..w).map(|x| Cell::new(x, 0)));
    for y in 1..h {
        if y % 2 == 1 {
            order.extend((1..w).rev().map(|x| Cell::new(x, y)));
        } else {
            order.extend((1..w).map(|x| Cell::new(x, y)));
        }
    }
    order.extend((1..h).rev().map(|y| Cell::new(0, y)));
    order
}

// Odd-by-odd variant of `sweep`: rows 1..h-2 snake as usual, the last two rows are
// zig-zagged column by column from x = w-2 down to x = 1, and (w-1, h-1) is left out.
fn sweep_odd(w: i32, h: i32) -> Vec<Cell> {
    let mut order = Vec::with_capacity((w * h - 1) as usize);
    order.extend((0..w).map(|x| Cell::new(x, 0)));
    for y in 1..h - 2 {
        if y % 2 == 1 {
            order.extend((1..w).rev().map(|x| Cell::new(x, y)));
        } else {
            order.extend((1..w).map(|x| Cell::new(x, y)));
        }
    }
    order.push(Cell::new(w - 1, h - 2));
    for x in (1..w - 1).rev() {
        if (w - 2 - x) % 2 == 0 {
            order.extend([Cell::new(x, h - 2), Cell::new(x, h - 1)]);
        } else {
            order.extend([Cell::new(x, h - 1), Cell::new(x, h - 2)]);
        }
    }
    order.extend((1..h).rev().map(|y| Cell::new(0, y)));
    order
}

fn spiral(grid: &Grid) -> Vec<Cell> {
    let mut order = Vec::with_capacity(grid.cell_count());
    let mut visited = vec![false; grid.cell_count()];
    let mut cell = Cell::origin();
    let mut heading = Direction::Right;

    for _ in 0..grid.cell_count() {
        order.push(cell);
        visited[grid.index_of(cell)] = true;

        let open = |c: Cell| grid.in_bounds(c) && !visited[grid.index_of(c)];
        if !open(cell.step(heading)) {
            heading = heading.turn_right();
        }
        let next = cell.step(heading);
        if !open(next) {
            break;
        }
        cell = next;
    }
    order
}

/// Tours keyed by grid size and strategy, built on first use and shared by `Arc`.
#[derive(Debug, Default)]
pub struct CycleCache {
    tours: HashMap<(i32, i32, CycleStrategy), Arc<FallbackCycle>>,
}

impl CycleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(
        &mut self,
        grid: Grid,
        strategy: CycleStrategy,
    ) -> EngineResult<Arc<FallbackCycle>> {
        let key = (grid.width(), grid.height(), strategy);
        if let Some(cycle) = self.tours.get(&key) {
            return Ok(Arc::clone(cycle));
        }
        let cycle = Arc::new(FallbackCycle::build(grid, strategy)?);
        self.tours.insert(key, Arc::clone(&cycle));
        Ok(cycle)
    }

    pub fn len(&self) -> usize {
        self.tours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tours.is_empty()
    }
}
