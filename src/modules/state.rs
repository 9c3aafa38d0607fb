use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::engine::TerminationReason;
use crate::modules::learning::ValueTable;

/// Default location of the state directory, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".gridrunner";

/// What survives between runs of the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub high_score: u32,
    pub games_played: u64,
    pub total_ticks: u64,
    pub last_score: Option<u32>,
    pub last_outcome: Option<TerminationReason>,
    pub last_played: Option<DateTime<Utc>>,
}

pub fn state_file_path(dir: &Path) -> PathBuf {
    dir.join("state.json")
}

pub fn init_state(dir: &Path) -> io::Result<RunState> {
    let state = RunState::default();
    save_state(dir, &state)?;
    Ok(state)
}

pub fn load_state(dir: &Path) -> io::Result<Option<RunState>> {
    let path = state_file_path(dir);
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(None);
    }

    let state: RunState = serde_json::from_slice(&bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "failed to parse state file {}; delete it or run `gridrunner init` to reset: {}",
                path.display(),
                e
            ),
        )
    })?;
    Ok(Some(state))
}

pub fn save_state(dir: &Path, state: &RunState) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_vec_pretty(state)?;
    fs::write(state_file_path(dir), json)?;
    Ok(())
}

/// Fold one finished game into the stored state.
pub fn record_game(
    dir: &Path,
    score: u32,
    ticks: u64,
    outcome: Option<TerminationReason>,
) -> io::Result<RunState> {
    let mut state = load_state(dir)?.unwrap_or_default();
    state.high_score = state.high_score.max(score);
    state.games_played = state.games_played.saturating_add(1);
    state.total_ticks = state.total_ticks.saturating_add(ticks);
    state.last_score = Some(score);
    state.last_outcome = outcome;
    state.last_played = Some(Utc::now());
    save_state(dir, &state)?;
    Ok(state)
}

pub fn load_values(path: &Path) -> io::Result<Option<ValueTable>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let table = serde_json::from_slice(&bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed to parse value table {}: {}", path.display(), e),
        )
    })?;
    Ok(Some(table))
}

pub fn save_values(path: &Path, table: &ValueTable) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec(table)?)
}
