use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::modules::grid::{Cell, Grid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collision {
    Safe,
    Wall,
    SelfCollision,
}

impl Collision {
    pub const fn is_safe(self) -> bool {
        matches!(self, Collision::Safe)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Collision::Safe => "safe",
            Collision::Wall => "wall",
            Collision::SelfCollision => "self",
        }
    }
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify a head move into `next`.
///
/// `tail` is the cell that vacates this tick. Pass `None` when the move captures the
/// goal: the chain grows, the tail stays put, and stepping onto it is a self-collision.
pub fn classify(
    grid: &Grid,
    next: Cell,
    occupancy: &HashSet<Cell>,
    tail: Option<Cell>,
) -> Collision {
    if !grid.in_bounds(next) {
        return Collision::Wall;
    }
    if occupancy.contains(&next) && tail != Some(next) {
        return Collision::SelfCollision;
    }
    Collision::Safe
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(cells: &[(i32, i32)]) -> HashSet<Cell> {
        cells.iter().map(|&(x, y)| Cell::new(x, y)).collect()
    }

    #[test]
    fn off_grid_is_wall() {
        let grid = Grid::new(5, 5).unwrap();
        let occ = body(&[(0, 0)]);
        assert_eq!(classify(&grid, Cell::new(-1, 0), &occ, None), Collision::Wall);
        assert_eq!(classify(&grid, Cell::new(0, 5), &occ, None), Collision::Wall);
    }

    #[test]
    fn body_cell_is_self_collision() {
        let grid = Grid::new(5, 5).unwrap();
        let occ = body(&[(1, 1), (1, 2), (2, 2), (2, 1)]);
        let tail = Some(Cell::new(2, 1));
        assert_eq!(
            classify(&grid, Cell::new(1, 2), &occ, tail),
            Collision::SelfCollision
        );
        assert_eq!(classify(&grid, Cell::new(0, 1), &occ, tail), Collision::Safe);
    }

    #[test]
    fn vacating_tail_is_safe() {
        let grid = Grid::new(5, 5).unwrap();
        let occ = body(&[(1, 1), (1, 2), (2, 2), (2, 1)]);
        let tail = Cell::new(2, 1);
        assert_eq!(classify(&grid, tail, &occ, Some(tail)), Collision::Safe);
    }

    #[test]
    fn tail_is_forbidden_when_capture_pending() {
        let grid = Grid::new(5, 5).unwrap();
        let occ = body(&[(1, 1), (1, 2), (2, 2), (2, 1)]);
        assert_eq!(
            classify(&grid, Cell::new(2, 1), &occ, None),
            Collision::SelfCollision
        );
    }
}
