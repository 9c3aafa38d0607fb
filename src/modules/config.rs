use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::modules::cycle::CycleStrategy;
use crate::modules::error::EngineResult;
use crate::modules::grid::Grid;
use crate::modules::learning::LearningConfig;

/// Default board side, matching the classic 30x30 playfield.
pub const DEFAULT_GRID_SIDE: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub cycle: CycleStrategy,
    /// Ignore the pathfinder and follow the fallback tour every tick. On odd-by-odd grids a
    /// goal on the spare corner is still reached, through a one-cell detour off the tour.
    pub force_fallback: bool,
    /// Seed for goal placement and exploration. `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub learning: LearningConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_SIDE,
            height: DEFAULT_GRID_SIDE,
            cycle: CycleStrategy::default(),
            force_fallback: false,
            seed: None,
            learning: LearningConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check dimensions and learning rates, returning the grid they describe.
    pub fn validate(&self) -> EngineResult<Grid> {
        let grid = Grid::new(self.width, self.height)?;
        self.learning.validate()?;
        Ok(grid)
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to parse config file {}: {}", path.display(), e),
            )
        })
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)
    }
}
