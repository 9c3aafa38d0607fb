use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::modules::arbiter::Mode;
use crate::modules::engine::TerminationReason;
use crate::modules::grid::{Cell, Direction};

/// Render-ready picture of one agent at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub width: u32,
    pub height: u32,
    pub tick: u64,
    pub mode: Mode,
    pub heading: Direction,
    pub score: u32,
    pub high_score: u32,
    pub goal: Option<Cell>,
    /// Head first.
    pub chain: Vec<Cell>,
    #[serde(default)]
    pub outcome: Option<TerminationReason>,
}

impl AgentSnapshot {
    /// One line per row: `H` head, `o` body, `*` goal, `.` empty.
    pub fn render(&self) -> String {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut rows = vec![vec!['.'; w]; h];
        let mut put = |cell: Cell, ch: char| {
            if cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < w && (cell.y as usize) < h {
                rows[cell.y as usize][cell.x as usize] = ch;
            }
        };
        if let Some(goal) = self.goal {
            put(goal, '*');
        }
        for (i, cell) in self.chain.iter().enumerate() {
            put(*cell, if i == 0 { 'H' } else { 'o' });
        }
        let mut out = String::with_capacity((w + 1) * h);
        for row in rows {
            out.extend(row);
            out.push('\n');
        }
        out
    }
}

pub fn snapshot_file_path(dir: &Path) -> PathBuf {
    dir.join("snapshot.json")
}

pub fn save_snapshot(dir: &Path, snapshot: &AgentSnapshot) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = snapshot_file_path(dir);
    let json = serde_json::to_vec_pretty(snapshot)?;
    fs::write(&path, json)?;
    Ok(path)
}

pub fn load_snapshot(dir: &Path) -> io::Result<Option<AgentSnapshot>> {
    let path = snapshot_file_path(dir);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let snapshot = serde_json::from_slice(&bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed to parse snapshot {}: {}", path.display(), e),
        )
    })?;
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AgentSnapshot {
        AgentSnapshot {
            width: 4,
            height: 3,
            tick: 7,
            mode: Mode::Fallback,
            heading: Direction::Down,
            score: 2,
            high_score: 5,
            goal: Some(Cell::new(3, 2)),
            chain: vec![Cell::new(1, 1), Cell::new(1, 0), Cell::new(0, 0)],
            outcome: None,
        }
    }

    #[test]
    fn render_marks_head_body_and_goal() {
        assert_eq!(sample().render(), "oo..\n.H..\n...*\n");
    }

    #[test]
    fn snapshot_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_snapshot(dir.path()).unwrap(), None);
        let path = save_snapshot(dir.path(), &sample()).unwrap();
        assert!(path.ends_with("snapshot.json"));
        assert_eq!(load_snapshot(dir.path()).unwrap(), Some(sample()));
    }

    #[test]
    fn snapshot_json_uses_lowercase_labels() {
        let mut snap = sample();
        snap.outcome = Some(TerminationReason::SelfCollision);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["mode"], "fallback");
        assert_eq!(json["outcome"], "self_collision");
    }
}
