//! Tick-driven decision engine for a self-moving agent on a bounded grid.
//!
//! Each tick the agent either follows the shortest safe route to its goal, rides a
//! precomputed full-coverage tour when no route exists, or obeys a manual direction.
//! A tabular value learner watches every move and can bias tie-breaks between equally
//! short routes.
//!
//! ```no_run
//! let mut agent = gridrunner::reset(10, 10)?;
//! let result = agent.tick(None);
//! println!("{} {} {:?}", result.mode, result.head, result.event);
//! # Ok::<(), gridrunner::EngineError>(())
//! ```

pub mod modules;

pub use modules::arbiter::{Decision, DecisionContext, Mode, rank_first_steps};
pub use modules::body::{Advance, SegmentChain};
pub use modules::collision::{Collision, classify};
pub use modules::config::{DEFAULT_GRID_SIDE, EngineConfig};
pub use modules::cycle::{CycleCache, CycleStrategy, FallbackCycle, is_closed_tour};
pub use modules::engine::{
    AgentHandle, START_HEADING, TerminationReason, TickEvent, TickResult, reset,
};
pub use modules::error::{EngineError, EngineResult};
pub use modules::grid::{Cell, Direction, Grid};
pub use modules::learning::{
    LearningConfig, RelativeAction, Rewards, Transition, ValueLearner, ValueTable, encode,
    state_count,
};
pub use modules::pathfinder::Pathfinder;
pub use modules::state::{self, DEFAULT_STATE_DIR, RunState};
pub use modules::stats::{
    ModeStats, ModeStatsStore, load_mode_stats, reset_mode_stats, save_mode_stats,
};
pub use modules::view::{AgentSnapshot, load_snapshot, save_snapshot, snapshot_file_path};
