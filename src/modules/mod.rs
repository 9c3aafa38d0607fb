pub mod arbiter;
pub mod body;
pub mod collision;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod grid;
pub mod learning;
pub mod pathfinder;
pub mod state;
pub mod stats;
pub mod view;
