//! Tabular value learning over (head cell, goal bearing) states.
//!
//! The engine feeds every tick's transition into [`ValueLearner::observe`]. The table
//! never steers the pathfinder or the fallback tour on its own; applications may read it
//! back through [`ValueLearner::suggest`], and the arbiter consults it only to order
//! equally short first steps when `bias_tie_breaks` is set.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::modules::error::{EngineError, EngineResult};
use crate::modules::grid::{Cell, Direction, Grid};

/// Goal bearing buckets: sign(dx) and sign(dy), each in {-1, 0, 1}.
pub const BEARING_BUCKETS: usize = 9;
pub const ACTION_COUNT: usize = 3;

/// A move expressed relative to the current heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeAction {
    TurnLeft,
    Straight,
    TurnRight,
}

impl RelativeAction {
    pub const ALL: [RelativeAction; ACTION_COUNT] = [
        RelativeAction::TurnLeft,
        RelativeAction::Straight,
        RelativeAction::TurnRight,
    ];

    pub const fn index(self) -> usize {
        match self {
            RelativeAction::TurnLeft => 0,
            RelativeAction::Straight => 1,
            RelativeAction::TurnRight => 2,
        }
    }

    /// The relative action that turns `heading` into `moved`. A reversal has none.
    pub fn between(heading: Direction, moved: Direction) -> Option<Self> {
        if moved == heading {
            Some(RelativeAction::Straight)
        } else if moved == heading.turn_left() {
            Some(RelativeAction::TurnLeft)
        } else if moved == heading.turn_right() {
            Some(RelativeAction::TurnRight)
        } else {
            None
        }
    }

    pub const fn apply(self, heading: Direction) -> Direction {
        match self {
            RelativeAction::TurnLeft => heading.turn_left(),
            RelativeAction::Straight => heading,
            RelativeAction::TurnRight => heading.turn_right(),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RelativeAction::TurnLeft => "left",
            RelativeAction::Straight => "straight",
            RelativeAction::TurnRight => "right",
        }
    }
}

impl fmt::Display for RelativeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for RelativeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" | "turn_left" => Ok(RelativeAction::TurnLeft),
            "straight" => Ok(RelativeAction::Straight),
            "right" | "turn_right" => Ok(RelativeAction::TurnRight),
            other => Err(format!(
                "unknown action '{}', use left|straight|right",
                other
            )),
        }
    }
}

/// State id in `[0, W*H*9)`: the head's linear index times 9 plus the goal bearing.
pub fn encode(grid: &Grid, head: Cell, goal: Cell) -> usize {
    let sx = (goal.x - head.x).signum() + 1;
    let sy = (goal.y - head.y).signum() + 1;
    grid.index_of(head) * BEARING_BUCKETS + (sx as usize) * 3 + sy as usize
}

pub fn state_count(grid: &Grid) -> usize {
    grid.cell_count() * BEARING_BUCKETS
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub capture: f64,
    pub terminal: f64,
    pub step: f64,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            capture: 10.0,
            terminal: -10.0,
            step: -0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Learning rate, in (0, 1].
    pub alpha: f64,
    /// Discount factor, in (0, 1].
    pub gamma: f64,
    pub rewards: Rewards,
    /// Initial exploration rate for [`ValueLearner::suggest`].
    pub epsilon: f64,
    /// Multiplied into epsilon at the end of every game.
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    /// Let learned values order equally short first steps.
    pub bias_tie_breaks: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.95,
            rewards: Rewards::default(),
            epsilon: 1.0,
            epsilon_decay: 0.995,
            min_epsilon: 0.01,
            bias_tie_breaks: false,
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(EngineError::InvalidLearningRate(self.alpha));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(EngineError::InvalidDiscount(self.gamma));
        }
        for rate in [self.epsilon, self.min_epsilon, self.epsilon_decay] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(EngineError::InvalidExploration(rate));
            }
        }
        Ok(())
    }
}

/// One observed step. `next_state` is `None` when the step ended the game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub state: usize,
    pub action: RelativeAction,
    pub reward: f64,
    pub next_state: Option<usize>,
}

/// Dense `states x 3` table of action values, zero-initialised.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueTable {
    states: usize,
    values: Vec<f64>,
}

impl ValueTable {
    pub fn new(grid: &Grid) -> Self {
        let states = state_count(grid);
        Self {
            states,
            values: vec![0.0; states * ACTION_COUNT],
        }
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn get(&self, state: usize, action: RelativeAction) -> f64 {
        self.values[state * ACTION_COUNT + action.index()]
    }

    pub fn row(&self, state: usize) -> &[f64] {
        let start = state * ACTION_COUNT;
        &self.values[start..start + ACTION_COUNT]
    }

    pub fn max_value(&self, state: usize) -> f64 {
        self.row(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Highest-valued action; ties go to the earliest in `RelativeAction::ALL`.
    pub fn best_action(&self, state: usize) -> RelativeAction {
        let row = self.row(state);
        let mut best = RelativeAction::ALL[0];
        for action in RelativeAction::ALL.into_iter().skip(1) {
            if row[action.index()] > row[best.index()] {
                best = action;
            }
        }
        best
    }

    /// `Q[s,a] += alpha * (r + gamma * max Q[s'] - Q[s,a])`; terminal steps use `r` alone.
    /// Returns the temporal-difference error.
    pub fn update(&mut self, t: &Transition, alpha: f64, gamma: f64) -> f64 {
        let bootstrap = t.next_state.map(|s| gamma * self.max_value(s)).unwrap_or(0.0);
        let slot = t.state * ACTION_COUNT + t.action.index();
        let td_error = t.reward + bootstrap - self.values[slot];
        self.values[slot] += alpha * td_error;
        td_error
    }

    /// Number of (state, action) pairs that have moved off zero.
    pub fn touched(&self) -> usize {
        self.values.iter().filter(|v| **v != 0.0).count()
    }

    fn check_shape(&self, grid: &Grid) -> EngineResult<()> {
        let expected = state_count(grid) * ACTION_COUNT;
        if self.states * ACTION_COUNT != expected || self.values.len() != expected {
            return Err(EngineError::ValueTableMismatch {
                expected,
                actual: self.values.len(),
            });
        }
        Ok(())
    }
}

/// Owns the value table and the exploration schedule for one agent.
#[derive(Clone, Debug)]
pub struct ValueLearner {
    config: LearningConfig,
    table: ValueTable,
    epsilon: f64,
}

impl ValueLearner {
    pub fn new(grid: &Grid, config: LearningConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            table: ValueTable::new(grid),
            epsilon: config.epsilon,
            config,
        })
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Swap in a previously saved table for the same grid size.
    pub fn import(&mut self, grid: &Grid, table: ValueTable) -> EngineResult<()> {
        table.check_shape(grid)?;
        self.table = table;
        Ok(())
    }

    pub fn observe(&mut self, transition: &Transition) -> f64 {
        self.table
            .update(transition, self.config.alpha, self.config.gamma)
    }

    /// Epsilon-greedy pick over the learned values.
    pub fn suggest<R: Rng + ?Sized>(&self, state: usize, rng: &mut R) -> RelativeAction {
        if rng.r#gen::<f64>() < self.epsilon {
            RelativeAction::ALL[rng.gen_range(0..ACTION_COUNT)]
        } else {
            self.table.best_action(state)
        }
    }

    /// Decay exploration once per finished game.
    pub fn end_episode(&mut self) {
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.min_epsilon);
    }
}
