use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::modules::arbiter::{DecisionContext, Mode, rank_first_steps};
use crate::modules::body::{Advance, SegmentChain};
use crate::modules::collision::Collision;
use crate::modules::config::EngineConfig;
use crate::modules::cycle::FallbackCycle;
use crate::modules::error::{EngineError, EngineResult};
use crate::modules::grid::{Cell, Direction, Grid};
use crate::modules::learning::{RelativeAction, Transition, ValueLearner, ValueTable, encode};
use crate::modules::view::AgentSnapshot;

/// Heading of a fresh agent.
pub const START_HEADING: Direction = Direction::Right;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Wall,
    SelfCollision,
    /// The chain covers every cell; nowhere is left to put a goal.
    BoardFull,
}

impl TerminationReason {
    pub const fn label(self) -> &'static str {
        match self {
            TerminationReason::Wall => "wall",
            TerminationReason::SelfCollision => "self_collision",
            TerminationReason::BoardFull => "board_full",
        }
    }

    pub const fn is_collision(self) -> bool {
        !matches!(self, TerminationReason::BoardFull)
    }

    fn from_collision(collision: Collision) -> Self {
        match collision {
            Collision::SelfCollision => TerminationReason::SelfCollision,
            _ => TerminationReason::Wall,
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickEvent {
    Continue,
    Captured,
    Terminated(TerminationReason),
}

impl TickEvent {
    pub const fn is_terminal(self) -> bool {
        matches!(self, TickEvent::Terminated(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickResult {
    pub tick: u64,
    pub mode: Mode,
    pub head: Cell,
    pub chain: Vec<Cell>,
    pub goal: Option<Cell>,
    pub score: u32,
    pub event: TickEvent,
    pub new_high_score: bool,
}

/// One agent on one grid. Owns its chain, learner and random source; the fallback tour
/// may be shared with other handles on the same grid.
#[derive(Debug)]
pub struct AgentHandle {
    config: EngineConfig,
    grid: Grid,
    cycle: Arc<FallbackCycle>,
    chain: SegmentChain,
    heading: Direction,
    goal: Option<Cell>,
    score: u32,
    high_score: u32,
    tick: u64,
    mode: Mode,
    outcome: Option<TerminationReason>,
    learner: ValueLearner,
    rng: StdRng,
}

/// Fresh agent on a `width` x `height` grid with default settings.
pub fn reset(width: u32, height: u32) -> EngineResult<AgentHandle> {
    AgentHandle::reset(&EngineConfig::new(width, height))
}

impl AgentHandle {
    pub fn reset(config: &EngineConfig) -> EngineResult<Self> {
        let grid = config.validate()?;
        let cycle = Arc::new(FallbackCycle::build(grid, config.cycle)?);
        Self::reset_with_cycle(config, cycle)
    }

    /// Like [`AgentHandle::reset`] but reuses a tour built elsewhere, typically from a
    /// [`CycleCache`](crate::CycleCache).
    pub fn reset_with_cycle(config: &EngineConfig, cycle: Arc<FallbackCycle>) -> EngineResult<Self> {
        let grid = config.validate()?;
        if *cycle.grid() != grid {
            return Err(EngineError::CycleGridMismatch {
                width: config.width,
                height: config.height,
                tour_width: cycle.grid().width() as u32,
                tour_height: cycle.grid().height() as u32,
            });
        }

        let learner = ValueLearner::new(&grid, config.learning.clone())?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut handle = Self {
            config: config.clone(),
            grid,
            cycle,
            chain: SegmentChain::new(Cell::origin()),
            heading: START_HEADING,
            goal: None,
            score: 0,
            high_score: 0,
            tick: 0,
            mode: Mode::Seeking,
            outcome: None,
            learner,
            rng,
        };
        handle.relocate_goal();
        debug!(
            width = config.width,
            height = config.height,
            strategy = %config.cycle,
            goal = ?handle.goal,
            "agent reset"
        );
        Ok(handle)
    }

    /// Start a new game on the same grid. The learned table, the high score and the
    /// random stream carry over; exploration decays by one episode.
    pub fn restart(&mut self) {
        self.learner.end_episode();
        self.chain = SegmentChain::new(Cell::origin());
        self.heading = START_HEADING;
        self.score = 0;
        self.tick = 0;
        self.mode = Mode::Seeking;
        self.outcome = None;
        self.relocate_goal();
        debug!(goal = ?self.goal, epsilon = self.learner.epsilon(), "agent restarted");
    }

    /// Advance the game one step. Once terminated, every further call repeats the
    /// terminal event without moving.
    pub fn tick(&mut self, manual: Option<Direction>) -> TickResult {
        if let Some(reason) = self.outcome {
            return self.result(TickEvent::Terminated(reason), false);
        }

        let head = self.chain.head();
        let state = self.goal.map(|goal| encode(&self.grid, head, goal));
        let first_steps = match state {
            Some(s) if self.learner.config().bias_tie_breaks => {
                rank_first_steps(self.heading, self.learner.table(), s)
            }
            _ => Direction::ALL,
        };

        let decision = DecisionContext {
            grid: &self.grid,
            chain: &self.chain,
            cycle: &self.cycle,
            heading: self.heading,
            goal: self.goal,
            force_fallback: self.config.force_fallback,
            first_steps,
        }
        .decide(manual);

        self.mode = decision.mode;
        self.tick += 1;
        let previous_heading = self.heading;
        let moved = Direction::between(head, decision.next);
        let rewards = self.learner.config().rewards;

        let mut new_high_score = false;
        let (event, reward) = match self.chain.advance(&self.grid, decision.next, self.goal) {
            Advance::Continue => {
                self.turn_to(moved);
                (TickEvent::Continue, rewards.step)
            }
            Advance::Captured => {
                self.turn_to(moved);
                self.score += 1;
                if self.score > self.high_score {
                    self.high_score = self.score;
                    new_high_score = true;
                    info!(score = self.score, "new high score");
                }
                self.relocate_goal();
                info!(tick = self.tick, score = self.score, length = self.chain.len(), "goal captured");
                if self.goal.is_none() {
                    self.outcome = Some(TerminationReason::BoardFull);
                    info!(tick = self.tick, score = self.score, "board full");
                }
                (TickEvent::Captured, rewards.capture)
            }
            Advance::Terminated(collision) => {
                let reason = TerminationReason::from_collision(collision);
                self.outcome = Some(reason);
                info!(
                    tick = self.tick,
                    score = self.score,
                    mode = %self.mode,
                    reason = %reason,
                    "agent terminated"
                );
                (TickEvent::Terminated(reason), rewards.terminal)
            }
        };

        let action = moved.and_then(|dir| RelativeAction::between(previous_heading, dir));
        match (state, action) {
            (Some(state), Some(action)) => {
                let next_state = match (self.outcome, self.goal) {
                    (None, Some(goal)) => Some(encode(&self.grid, self.chain.head(), goal)),
                    _ => None,
                };
                self.learner.observe(&Transition {
                    state,
                    action,
                    reward,
                    next_state,
                });
            }
            _ => debug!(heading = %previous_heading, next = %decision.next, "move has no relative action, not learned"),
        }

        self.result(event, new_high_score)
    }

    /// Learned value of taking `action` with the head at `head` and the goal at `goal`.
    /// Cells off the grid read as zero.
    pub fn value_estimate(&self, head: Cell, goal: Cell, action: RelativeAction) -> f64 {
        if !self.grid.in_bounds(head) || !self.grid.in_bounds(goal) {
            return 0.0;
        }
        self.learner.table().get(encode(&self.grid, head, goal), action)
    }

    /// Epsilon-greedy direction from the learned table, for callers that want the
    /// learner to steer through the manual channel.
    pub fn suggest_direction(&mut self) -> Option<Direction> {
        if self.outcome.is_some() {
            return None;
        }
        let goal = self.goal?;
        let state = encode(&self.grid, self.chain.head(), goal);
        let action = self.learner.suggest(state, &mut self.rng);
        Some(action.apply(self.heading))
    }

    /// Put the goal on a specific free cell.
    pub fn place_goal(&mut self, cell: Cell) -> EngineResult<()> {
        if !self.grid.in_bounds(cell) {
            return Err(EngineError::GoalOutOfBounds(cell));
        }
        if self.chain.contains(cell) {
            return Err(EngineError::GoalOccupied(cell));
        }
        self.goal = Some(cell);
        Ok(())
    }

    pub fn set_high_score(&mut self, high_score: u32) {
        self.high_score = high_score;
    }

    /// Switch between route seeking and riding the tour mid-game.
    pub fn set_force_fallback(&mut self, on: bool) {
        if self.config.force_fallback != on {
            debug!(force_fallback = on, tick = self.tick, "fallback mode toggled");
        }
        self.config.force_fallback = on;
    }

    pub fn import_values(&mut self, table: ValueTable) -> EngineResult<()> {
        self.learner.import(&self.grid, table)
    }

    pub fn value_table(&self) -> &ValueTable {
        self.learner.table()
    }

    pub fn learner(&self) -> &ValueLearner {
        &self.learner
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cycle(&self) -> &Arc<FallbackCycle> {
        &self.cycle
    }

    pub fn chain(&self) -> &SegmentChain {
        &self.chain
    }

    pub fn head(&self) -> Cell {
        self.chain.head()
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn goal(&self) -> Option<Cell> {
        self.goal
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn outcome(&self) -> Option<TerminationReason> {
        self.outcome
    }

    pub fn is_terminated(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            width: self.grid.width() as u32,
            height: self.grid.height() as u32,
            tick: self.tick,
            mode: self.mode,
            heading: self.heading,
            score: self.score,
            high_score: self.high_score,
            goal: self.goal,
            chain: self.chain.to_vec(),
            outcome: self.outcome,
        }
    }

    fn turn_to(&mut self, moved: Option<Direction>) {
        if let Some(dir) = moved {
            self.heading = dir;
        }
    }

    fn relocate_goal(&mut self) {
        self.goal = self
            .grid
            .free_cells(self.chain.occupancy())
            .choose(&mut self.rng);
    }

    fn result(&self, event: TickEvent, new_high_score: bool) -> TickResult {
        TickResult {
            tick: self.tick,
            mode: self.mode,
            head: self.chain.head(),
            chain: self.chain.to_vec(),
            goal: self.goal,
            score: self.score,
            event,
            new_high_score,
        }
    }

    #[cfg(test)]
    fn set_chain(&mut self, cells: &[(i32, i32)], heading: Direction) {
        self.chain = SegmentChain::from_cells(cells.iter().map(|&(x, y)| Cell::new(x, y)));
        self.heading = heading;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::modules::cycle::{CycleCache, CycleStrategy};

    fn seeded(width: u32, height: u32, seed: u64) -> AgentHandle {
        AgentHandle::reset(&EngineConfig::new(width, height).with_seed(seed)).unwrap()
    }

    fn assert_chain_ok(result: &TickResult) {
        let unique: HashSet<_> = result.chain.iter().copied().collect();
        assert_eq!(unique.len(), result.chain.len(), "chain repeats a cell");
        for pair in result.chain.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]), "{} and {} apart", pair[0], pair[1]);
        }
        if let Some(goal) = result.goal {
            assert!(!unique.contains(&goal), "goal {} under the chain", goal);
        }
    }

    #[test]
    fn reset_starts_at_origin_heading_right() {
        let agent = seeded(8, 6, 1);
        assert_eq!(agent.head(), Cell::origin());
        assert_eq!(agent.heading(), Direction::Right);
        assert_eq!(agent.score(), 0);
        assert_eq!(agent.mode(), Mode::Seeking);
        let goal = agent.goal().unwrap();
        assert_ne!(goal, Cell::origin());
        assert!(agent.grid().in_bounds(goal));
    }

    #[test]
    fn five_by_five_walks_down_and_captures() {
        let mut agent = seeded(5, 5, 3);
        agent.place_goal(Cell::new(0, 4)).unwrap();

        for expected in 1..=3 {
            let result = agent.tick(None);
            assert_eq!(result.event, TickEvent::Continue);
            assert_eq!(result.mode, Mode::Seeking);
            assert_eq!(result.head, Cell::new(0, expected));
        }

        let result = agent.tick(None);
        assert_eq!(result.tick, 4);
        assert_eq!(result.event, TickEvent::Captured);
        assert_eq!(result.score, 1);
        assert_eq!(result.chain, vec![Cell::new(0, 4), Cell::new(0, 3)]);
        assert!(result.new_high_score);
        let goal = result.goal.unwrap();
        assert!(!result.chain.contains(&goal));
        assert_eq!(agent.heading(), Direction::Down);
    }

    #[test]
    fn chain_stays_well_formed_over_many_games() {
        let mut agent = seeded(6, 6, 42);
        for _ in 0..3_000 {
            let result = agent.tick(None);
            assert_chain_ok(&result);
            if result.event.is_terminal() {
                agent.restart();
            }
        }
        assert!(agent.high_score() > 0);
    }

    #[test]
    fn head_moves_into_the_vacating_tail() {
        let mut agent = seeded(3, 3, 5);
        agent.set_chain(&[(0, 1), (0, 0), (1, 0), (1, 1)], Direction::Down);
        agent.place_goal(Cell::new(2, 1)).unwrap();

        let first = agent.tick(None);
        assert_eq!(first.event, TickEvent::Continue);
        assert_eq!(first.mode, Mode::Seeking);
        assert_eq!(first.head, Cell::new(1, 1));
        assert_eq!(first.chain.len(), 4);
        assert_eq!(agent.heading(), Direction::Right);

        let second = agent.tick(None);
        assert_eq!(second.event, TickEvent::Captured);
        assert_eq!(second.head, Cell::new(2, 1));
        assert_eq!(second.chain.len(), 5);
        assert_chain_ok(&second);
    }

    #[test]
    fn forced_fallback_never_collides() {
        let config = EngineConfig {
            force_fallback: true,
            ..EngineConfig::new(4, 4).with_seed(9)
        };
        let mut agent = AgentHandle::reset(&config).unwrap();
        let mut captures = 0;
        for _ in 0..(2 * 16 * 16) {
            let result = agent.tick(None);
            assert_chain_ok(&result);
            match result.event {
                TickEvent::Terminated(reason) => {
                    assert_eq!(reason, TerminationReason::BoardFull);
                    break;
                }
                TickEvent::Captured => captures += 1,
                TickEvent::Continue => assert_eq!(result.mode, Mode::Fallback),
            }
        }
        assert_eq!(captures, 15);
        assert_eq!(agent.outcome(), Some(TerminationReason::BoardFull));
        assert_eq!(agent.goal(), None);
        assert_eq!(agent.chain().len(), 16);
    }

    #[test]
    fn capture_raises_value_and_crash_lowers_it() {
        let mut agent = seeded(5, 5, 7);
        agent.place_goal(Cell::new(1, 0)).unwrap();
        assert_eq!(agent.tick(None).event, TickEvent::Captured);
        assert!(
            agent.value_estimate(Cell::origin(), Cell::new(1, 0), RelativeAction::Straight) > 0.0
        );

        let mut agent = seeded(5, 5, 7);
        agent.place_goal(Cell::new(3, 3)).unwrap();
        let result = agent.tick(Some(Direction::Up));
        assert_eq!(result.event, TickEvent::Terminated(TerminationReason::Wall));
        assert_eq!(result.mode, Mode::Manual);
        assert!(
            agent.value_estimate(Cell::origin(), Cell::new(3, 3), RelativeAction::TurnLeft) < 0.0
        );
        assert_eq!(
            agent.value_estimate(Cell::origin(), Cell::new(3, 3), RelativeAction::TurnRight),
            0.0
        );
    }

    #[test]
    fn plain_steps_carry_the_step_penalty() {
        let mut agent = seeded(5, 5, 2);
        agent.place_goal(Cell::new(4, 0)).unwrap();
        agent.tick(None);
        assert!(
            agent.value_estimate(Cell::origin(), Cell::new(4, 0), RelativeAction::Straight) < 0.0
        );
    }

    #[test]
    fn reversed_manual_direction_is_ignored() {
        let mut agent = seeded(5, 5, 4);
        agent.place_goal(Cell::new(4, 0)).unwrap();
        let result = agent.tick(Some(Direction::Left));
        assert_eq!(result.mode, Mode::Seeking);
        assert_eq!(result.head, Cell::new(1, 0));
        assert_eq!(result.event, TickEvent::Continue);
    }

    #[test]
    fn manual_direction_steers() {
        let mut agent = seeded(5, 5, 4);
        agent.place_goal(Cell::new(4, 0)).unwrap();
        let result = agent.tick(Some(Direction::Down));
        assert_eq!(result.mode, Mode::Manual);
        assert_eq!(result.head, Cell::new(0, 1));
        assert_eq!(agent.heading(), Direction::Down);
    }

    #[test]
    fn terminated_handle_repeats_its_event() {
        let mut agent = seeded(4, 4, 8);
        agent.place_goal(Cell::new(3, 3)).unwrap();
        let crash = agent.tick(Some(Direction::Up));
        assert!(crash.event.is_terminal());
        let again = agent.tick(None);
        assert_eq!(again.event, crash.event);
        assert_eq!(again.tick, crash.tick);
        assert_eq!(again.chain, crash.chain);
    }

    #[test]
    fn restart_keeps_learning_and_high_score() {
        let mut agent = seeded(5, 5, 11);
        agent.place_goal(Cell::new(1, 0)).unwrap();
        agent.tick(None);
        agent.tick(Some(Direction::Up));
        assert!(agent.is_terminated());
        let epsilon = agent.learner().epsilon();
        let learned = agent.value_table().clone();

        agent.restart();
        assert!(!agent.is_terminated());
        assert_eq!(agent.score(), 0);
        assert_eq!(agent.ticks(), 0);
        assert_eq!(agent.high_score(), 1);
        assert_eq!(agent.head(), Cell::origin());
        assert_eq!(agent.value_table(), &learned);
        assert!(agent.learner().epsilon() < epsilon);
    }

    #[test]
    fn new_high_score_only_past_the_recorded_best() {
        let mut agent = seeded(5, 5, 12);
        agent.set_high_score(1);
        agent.place_goal(Cell::new(1, 0)).unwrap();
        let first = agent.tick(None);
        assert_eq!(first.event, TickEvent::Captured);
        assert!(!first.new_high_score);

        let goal = Cell::new(3, 0);
        agent.place_goal(goal).unwrap();
        agent.tick(None);
        let second = agent.tick(None);
        assert_eq!(second.event, TickEvent::Captured);
        assert!(second.new_high_score);
        assert_eq!(agent.high_score(), 2);
    }

    #[test]
    fn configuration_errors_surface_at_reset() {
        assert!(matches!(
            reset(0, 5),
            Err(EngineError::InvalidDimensions { .. })
        ));
        assert!(matches!(reset(1, 1), Err(EngineError::GridTooSmall { .. })));
        assert!(matches!(reset(1, 3), Err(EngineError::NoClosedTour { .. })));

        let mut config = EngineConfig::new(4, 4);
        config.learning.alpha = 1.5;
        assert!(matches!(
            AgentHandle::reset(&config),
            Err(EngineError::InvalidLearningRate(_))
        ));
    }

    #[test]
    fn goal_placement_is_checked() {
        let mut agent = seeded(4, 4, 0);
        assert_eq!(
            agent.place_goal(Cell::new(4, 0)),
            Err(EngineError::GoalOutOfBounds(Cell::new(4, 0)))
        );
        assert_eq!(
            agent.place_goal(Cell::origin()),
            Err(EngineError::GoalOccupied(Cell::origin()))
        );
    }

    #[test]
    fn handles_share_a_cached_tour() {
        let mut cache = CycleCache::new();
        let config = EngineConfig::new(6, 4).with_seed(1);
        let grid = config.validate().unwrap();
        let tour = cache.get_or_build(grid, CycleStrategy::Boustrophedon).unwrap();
        let a = AgentHandle::reset_with_cycle(&config, Arc::clone(&tour)).unwrap();
        let b = AgentHandle::reset_with_cycle(&config, tour).unwrap();
        assert!(Arc::ptr_eq(a.cycle(), b.cycle()));

        let other = cache
            .get_or_build(Grid::new(4, 4).unwrap(), CycleStrategy::Boustrophedon)
            .unwrap();
        assert!(matches!(
            AgentHandle::reset_with_cycle(&config, other),
            Err(EngineError::CycleGridMismatch { .. })
        ));
    }

    #[test]
    fn same_seed_same_game() {
        let mut a = seeded(6, 6, 99);
        let mut b = seeded(6, 6, 99);
        for _ in 0..200 {
            assert_eq!(a.tick(None), b.tick(None));
        }
    }

    #[test]
    fn suggested_direction_is_never_a_reversal() {
        let mut agent = seeded(6, 6, 13);
        for _ in 0..50 {
            let dir = agent.suggest_direction().unwrap();
            assert_ne!(dir, agent.heading().opposite());
        }
    }

    #[test]
    fn tie_break_bias_keeps_routes_shortest() {
        let mut config = EngineConfig::new(6, 6).with_seed(21);
        config.learning.bias_tie_breaks = true;
        let mut agent = AgentHandle::reset(&config).unwrap();
        agent.place_goal(Cell::new(3, 3)).unwrap();
        let mut steps = 0;
        loop {
            let result = agent.tick(None);
            steps += 1;
            if result.event == TickEvent::Captured {
                break;
            }
        }
        assert_eq!(steps, 6);
    }

    #[test]
    fn snapshot_mirrors_the_handle() {
        let mut agent = seeded(4, 4, 6);
        agent.place_goal(Cell::new(0, 3)).unwrap();
        agent.tick(None);
        let snap = agent.snapshot();
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.chain, agent.chain().to_vec());
        assert_eq!(snap.goal, agent.goal());
        assert_eq!(snap.heading, Direction::Down);
        assert_eq!(snap.outcome, None);
    }

    #[test]
    fn unattended_games_fill_the_board() {
        for (width, height) in [(8, 8), (6, 4)] {
            for seed in 0..4 {
                let mut agent = seeded(width, height, seed);
                let cells = agent.grid().cell_count();
                for _ in 0..(4 * cells * cells) {
                    let result = agent.tick(None);
                    if let TickEvent::Terminated(reason) = result.event {
                        assert_eq!(
                            reason,
                            TerminationReason::BoardFull,
                            "{}x{} seed {} crashed in {} mode",
                            width,
                            height,
                            seed,
                            result.mode
                        );
                        break;
                    }
                }
                assert_eq!(agent.outcome(), Some(TerminationReason::BoardFull));
                assert_eq!(agent.chain().len(), cells);
            }
        }
    }

    #[test]
    fn tour_is_safe_after_seeking_growth() {
        for seed in [1, 5, 17] {
            let mut agent = seeded(6, 6, seed);
            while agent.chain().len() < 14 {
                let result = agent.tick(None);
                assert!(!result.event.is_terminal(), "seed {} crashed while seeking", seed);
                assert!(agent.ticks() < 5_000, "seed {} stopped growing", seed);
            }

            agent.set_force_fallback(true);
            for _ in 0..agent.cycle().len() {
                let result = agent.tick(None);
                assert_eq!(result.mode, Mode::Fallback);
                if let TickEvent::Terminated(reason) = result.event {
                    assert_eq!(reason, TerminationReason::BoardFull, "seed {}", seed);
                    break;
                }
            }
        }
    }

    #[test]
    fn corner_exit_skips_the_neck() {
        let mut agent = seeded(5, 5, 30);
        agent.set_chain(
            &[(4, 4), (4, 3), (3, 3), (2, 3), (2, 4), (1, 4)],
            Direction::Down,
        );
        agent.place_goal(Cell::origin()).unwrap();
        let result = agent.tick(None);
        assert_eq!(result.mode, Mode::Fallback);
        assert_eq!(result.event, TickEvent::Continue);
        assert_eq!(result.head, Cell::new(3, 4));
        assert_eq!(agent.heading(), Direction::Left);
    }

    #[test]
    fn forced_fallback_detours_to_a_corner_goal() {
        let config = EngineConfig {
            force_fallback: true,
            ..EngineConfig::new(5, 5).with_seed(4)
        };
        let mut agent = AgentHandle::reset(&config).unwrap();
        let corner = agent.cycle().spare().unwrap();
        agent.place_goal(corner).unwrap();

        let mut captured = false;
        for _ in 0..agent.cycle().len() {
            let result = agent.tick(None);
            if result.event == TickEvent::Captured {
                assert_eq!(result.head, corner);
                captured = true;
                break;
            }
        }
        assert!(captured, "corner goal never reached");

        for _ in 0..(2 * 25 * 25) {
            let result = agent.tick(None);
            assert_chain_ok(&result);
            if let TickEvent::Terminated(reason) = result.event {
                assert_eq!(reason, TerminationReason::BoardFull);
                break;
            }
        }
        assert_eq!(agent.outcome(), Some(TerminationReason::BoardFull));
    }
}
