//! Construction-time errors for the engine.
//!
//! Collisions and missing routes are not errors: they are reported through
//! [`TickEvent`](crate::TickEvent) and absorbed by the fallback tour respectively.

use thiserror::Error;

use crate::modules::cycle::CycleStrategy;
use crate::modules::grid::Cell;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("grid {width}x{height} cannot hold a distinct start and goal cell")]
    GridTooSmall { width: u32, height: u32 },

    #[error("{strategy} tour is not a closed circuit on a {width}x{height} grid")]
    NoClosedTour {
        width: u32,
        height: u32,
        strategy: CycleStrategy,
    },

    #[error("learning rate must be in (0, 1], got {0}")]
    InvalidLearningRate(f64),

    #[error("discount factor must be in (0, 1], got {0}")]
    InvalidDiscount(f64),

    #[error("exploration rate must be in [0, 1], got {0}")]
    InvalidExploration(f64),

    #[error("fallback tour was built for {tour_width}x{tour_height}, agent grid is {width}x{height}")]
    CycleGridMismatch {
        width: u32,
        height: u32,
        tour_width: u32,
        tour_height: u32,
    },

    #[error("goal {0} is outside the grid")]
    GoalOutOfBounds(Cell),

    #[error("goal {0} is covered by the agent")]
    GoalOccupied(Cell),

    #[error("value table has {actual} entries, expected {expected} for this grid")]
    ValueTableMismatch { expected: usize, actual: usize },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
