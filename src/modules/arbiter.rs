use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::modules::body::SegmentChain;
use crate::modules::collision::{Collision, classify};
use crate::modules::cycle::FallbackCycle;
use crate::modules::grid::{Cell, Direction, Grid};
use crate::modules::learning::{RelativeAction, ValueTable};
use crate::modules::pathfinder::Pathfinder;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Seeking,
    Fallback,
    Manual,
}

impl Mode {
    pub const fn label(self) -> &'static str {
        match self {
            Mode::Seeking => "seeking",
            Mode::Fallback => "fallback",
            Mode::Manual => "manual",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub mode: Mode,
    pub next: Cell,
}

/// Everything the arbiter reads for one tick. Nothing here is mutated.
pub struct DecisionContext<'a> {
    pub grid: &'a Grid,
    pub chain: &'a SegmentChain,
    pub cycle: &'a FallbackCycle,
    pub heading: Direction,
    pub goal: Option<Cell>,
    /// Skip the pathfinder and ride the tour.
    pub force_fallback: bool,
    /// Expansion order for the head's neighbours.
    pub first_steps: [Direction; 4],
}

impl DecisionContext<'_> {
    /// Manual override beats the route, the route beats the tour. A manual direction that
    /// reverses the heading is dropped as if it had not been given.
    ///
    /// While the body lies sorted along the tour from tail to head, the cells ahead of the
    /// head up to the tail are free. Routes may only start with a step into that stretch,
    /// so the body stays sorted and the tour never runs into it.
    pub fn decide(&self, manual: Option<Direction>) -> Decision {
        let head = self.chain.head();

        if let Some(dir) = manual {
            if dir != self.heading.opposite() {
                debug!(direction = %dir, "manual override");
                return Decision {
                    mode: Mode::Manual,
                    next: head.step(dir),
                };
            }
            debug!(direction = %dir, heading = %self.heading, "ignoring reversed manual direction");
        }

        let ordered = self
            .cycle
            .is_ordered(self.chain.cells(), self.chain.tail());

        if !self.force_fallback {
            if let Some(goal) = self.goal {
                let steps: Vec<Direction> = self
                    .first_steps
                    .iter()
                    .copied()
                    .filter(|dir| {
                        !ordered || self.chain.len() == 1 || self.keeps_order(head.step(*dir), goal)
                    })
                    .collect();
                let finder =
                    Pathfinder::new(self.grid, self.chain.occupancy(), Some(self.chain.tail()));
                let route = finder.route_with_first_steps(head, goal, &steps);
                if let Some(next) = route.first() {
                    return Decision {
                        mode: Mode::Seeking,
                        next: *next,
                    };
                }
                debug!(head = %head, goal = %goal, "no safe route to goal, following fallback tour");
            }
        }

        Decision {
            mode: Mode::Fallback,
            next: self.fallback_step(ordered),
        }
    }

    /// Free key distance ahead of the head, up to the tail.
    fn room(&self) -> usize {
        if self.chain.len() == 1 {
            2 * self.cycle.len()
        } else {
            self.cycle.key_distance(self.chain.head(), self.chain.tail())
        }
    }

    /// A step keeps the body sorted when it lands strictly inside the free stretch and
    /// does not overshoot a goal lying in it.
    fn keeps_order(&self, next: Cell, goal: Cell) -> bool {
        if !self.grid.in_bounds(next) {
            return false;
        }
        let head = self.chain.head();
        let step = self.cycle.key_distance(head, next);
        let room = self.room();
        if step == 0 || step >= room {
            return false;
        }
        let to_goal = self.cycle.key_distance(head, goal);
        if to_goal < room && step > to_goal {
            return false;
        }
        if Some(next) == self.cycle.spare() {
            return self.spare_open();
        }
        true
    }

    /// The spare corner is entered only from the cell above it, and only while its exit
    /// beside it will be free or be the tail on the next tick.
    fn spare_open(&self) -> bool {
        let (Some(spare), Some(entry)) = (self.cycle.spare(), self.cycle.spare_entry()) else {
            return false;
        };
        if self.chain.head() != entry {
            return false;
        }
        let skipped = Cell::new(spare.x - 1, spare.y - 1);
        let fills_board =
            self.goal == Some(spare) && self.chain.len() + 1 == self.grid.cell_count();
        self.chain.len() == 1 || fills_board || self.chain.tail() != skipped
    }

    fn fallback_step(&self, ordered: bool) -> Cell {
        let head = self.chain.head();
        let tail = self.chain.tail();

        // The last free cell ends the game, wherever it sits in the order.
        if let Some(goal) = self.goal {
            if goal.is_adjacent(head) && self.chain.len() + 1 == self.grid.cell_count() {
                return goal;
            }
        }

        if ordered {
            // Nearest neighbour forward along the tour that is free by ordering or is the
            // tail. The spare is only worth the detour when the goal sits on it.
            let room = self.room();
            let nearest = self
                .grid
                .neighbors(head)
                .filter(|n| {
                    Some(*n) != self.cycle.spare()
                        || *n == tail
                        || (self.goal == Some(*n) && self.spare_open())
                })
                .map(|n| (self.cycle.key_distance(head, n), n))
                .filter(|&(d, n)| d > 0 && (d < room || n == tail))
                .min_by_key(|&(d, _)| d);
            if let Some((_, next)) = nearest {
                return next;
            }
        }

        let neck = self.chain.cells().nth(1);
        let preferred = self.cycle.next_from(head, neck);
        if self.is_safe(preferred) {
            return preferred;
        }
        let mut options: Vec<Cell> = self
            .grid
            .neighbors(head)
            .filter(|n| self.is_safe(*n))
            .collect();
        options.sort_by_key(|n| self.cycle.key_distance(head, *n));
        match options.first() {
            Some(next) => {
                debug!(head = %head, tour = %preferred, next = %next, "tour step blocked, sidestepping");
                *next
            }
            None => preferred,
        }
    }

    fn is_safe(&self, next: Cell) -> bool {
        let tail = (self.goal != Some(next)).then(|| self.chain.tail());
        classify(self.grid, next, self.chain.occupancy(), tail) == Collision::Safe
    }
}

/// Order the head's neighbours by learned value: best relative action first, the
/// reversal last.
pub fn rank_first_steps(heading: Direction, table: &ValueTable, state: usize) -> [Direction; 4] {
    let mut actions = RelativeAction::ALL;
    // Stable: equal values keep left, straight, right order.
    actions.sort_by(|a, b| table.get(state, *b).total_cmp(&table.get(state, *a)));
    [
        actions[0].apply(heading),
        actions[1].apply(heading),
        actions[2].apply(heading),
        heading.opposite(),
    ]
}
