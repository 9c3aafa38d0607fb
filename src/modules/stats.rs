use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::modules::arbiter::Mode;
use crate::modules::engine::{TerminationReason, TickEvent, TickResult};

/// Tick and outcome counters for one grid size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeStats {
    pub seeking_ticks: u64,
    pub fallback_ticks: u64,
    pub manual_ticks: u64,
    pub captures: u64,
    pub wall_crashes: u64,
    pub self_collisions: u64,
    pub boards_filled: u64,
}

impl ModeStats {
    pub fn record(&mut self, result: &TickResult) {
        match result.mode {
            Mode::Seeking => self.seeking_ticks = self.seeking_ticks.saturating_add(1),
            Mode::Fallback => self.fallback_ticks = self.fallback_ticks.saturating_add(1),
            Mode::Manual => self.manual_ticks = self.manual_ticks.saturating_add(1),
        }
        match result.event {
            TickEvent::Continue => {}
            TickEvent::Captured => self.captures = self.captures.saturating_add(1),
            TickEvent::Terminated(TerminationReason::Wall) => {
                self.wall_crashes = self.wall_crashes.saturating_add(1)
            }
            TickEvent::Terminated(TerminationReason::SelfCollision) => {
                self.self_collisions = self.self_collisions.saturating_add(1)
            }
            TickEvent::Terminated(TerminationReason::BoardFull) => {
                self.boards_filled = self.boards_filled.saturating_add(1)
            }
        }
    }

    pub fn total_ticks(&self) -> u64 {
        self.seeking_ticks + self.fallback_ticks + self.manual_ticks
    }
}

/// Stats keyed by grid size, `"WxH"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeStatsStore {
    pub per_grid: BTreeMap<String, ModeStats>,
}

impl ModeStatsStore {
    pub fn grid_mut(&mut self, width: u32, height: u32) -> &mut ModeStats {
        self.per_grid.entry(grid_key(width, height)).or_default()
    }
}

pub fn grid_key(width: u32, height: u32) -> String {
    format!("{}x{}", width, height)
}

pub fn stats_file_path(dir: &Path) -> PathBuf {
    dir.join("stats.json")
}

pub fn reset_mode_stats(dir: &Path) -> io::Result<()> {
    save_mode_stats(dir, &ModeStatsStore::default())
}

pub fn load_mode_stats(dir: &Path) -> io::Result<ModeStatsStore> {
    let path = stats_file_path(dir);
    if !path.exists() {
        return Ok(ModeStatsStore::default());
    }

    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(ModeStatsStore::default());
    }

    let store: ModeStatsStore = serde_json::from_slice(&bytes)?;
    Ok(store)
}

pub fn save_mode_stats(dir: &Path, store: &ModeStatsStore) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_vec_pretty(store)?;
    fs::write(stats_file_path(dir), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::grid::Cell;

    fn tick(mode: Mode, event: TickEvent) -> TickResult {
        TickResult {
            tick: 1,
            mode,
            head: Cell::origin(),
            chain: vec![Cell::origin()],
            goal: None,
            score: 0,
            event,
            new_high_score: false,
        }
    }

    #[test]
    fn record_counts_modes_and_outcomes() {
        let mut stats = ModeStats::default();
        stats.record(&tick(Mode::Seeking, TickEvent::Continue));
        stats.record(&tick(Mode::Seeking, TickEvent::Captured));
        stats.record(&tick(Mode::Fallback, TickEvent::Continue));
        stats.record(&tick(
            Mode::Manual,
            TickEvent::Terminated(TerminationReason::Wall),
        ));

        assert_eq!(stats.seeking_ticks, 2);
        assert_eq!(stats.fallback_ticks, 1);
        assert_eq!(stats.manual_ticks, 1);
        assert_eq!(stats.captures, 1);
        assert_eq!(stats.wall_crashes, 1);
        assert_eq!(stats.total_ticks(), 4);
    }

    #[test]
    fn store_is_keyed_by_grid_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = load_mode_stats(dir.path()).unwrap();
        assert!(store.per_grid.is_empty());

        store
            .grid_mut(6, 4)
            .record(&tick(Mode::Fallback, TickEvent::Captured));
        save_mode_stats(dir.path(), &store).unwrap();

        let loaded = load_mode_stats(dir.path()).unwrap();
        assert_eq!(loaded.per_grid["6x4"].captures, 1);

        reset_mode_stats(dir.path()).unwrap();
        assert_eq!(load_mode_stats(dir.path()).unwrap(), ModeStatsStore::default());
    }
}
