//! Allocation strategies: pure decisions over what a hungry philosopher sees.
//!
//! Every policy answers the same question — given read-only views of my two
//! forks, my state, and which forks I already hold, what single action do I
//! take this round? The three policies form a closed set:
//!
//! - [`Strategy::Greedy`] grabs the left fork, then the right, with no
//!   ordering discipline. Intentionally deadlock-prone: a synchronized
//!   hunger wave leaves every agent holding its left fork forever.
//! - [`Strategy::Hierarchy`] acquires strictly in ascending fork-id order
//!   and releases a mis-ordered hold, which breaks circular wait.
//! - [`Strategy::Coordinated`] acts only on one-shot grants from the
//!   [`Coordinator`](crate::coordinator::Coordinator), plus the direct
//!   second-fork take its grant already reserved.

use crate::coordinator::GrantSlot;
use crate::fork::ForkView;
use crate::philosopher::PhilosopherState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single step a philosopher can attempt against its forks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Do nothing this round.
    None,
    /// Begin acquiring the left fork.
    TakeLeft,
    /// Begin acquiring the right fork.
    TakeRight,
    /// Put the left fork back.
    ReleaseLeft,
    /// Put the right fork back.
    ReleaseRight,
    /// Put both forks back.
    ReleaseBoth,
}

/// Strategy selector, fixed at table construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Take left then right, no discipline. Can deadlock.
    Greedy,
    /// Acquire in ascending fork-id order. Deadlock-free.
    Hierarchy,
    /// Central arbiter grants fork pairs. Deadlock-free.
    Coordinated,
}

impl StrategyKind {
    /// Short machine-friendly name (CLI and logs).
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Greedy => "greedy",
            StrategyKind::Hierarchy => "hierarchy",
            StrategyKind::Coordinated => "coordinated",
        }
    }

    /// One-line description for help output.
    pub fn description(&self) -> &'static str {
        match self {
            StrategyKind::Greedy => "left-then-right with no ordering discipline (deadlock-prone)",
            StrategyKind::Hierarchy => "acquire forks in ascending id order (deadlock-free)",
            StrategyKind::Coordinated => "central arbiter reserves fork pairs (deadlock-free)",
        }
    }

    /// All strategies, in evaluation order.
    pub fn all() -> Vec<StrategyKind> {
        vec![
            StrategyKind::Greedy,
            StrategyKind::Hierarchy,
            StrategyKind::Coordinated,
        ]
    }

    /// Whether this policy promises liveness. A deadlock under such a policy
    /// is a regression, not an expected outcome.
    pub fn avoids_deadlock(&self) -> bool {
        !matches!(self, StrategyKind::Greedy)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" | "naive" => Ok(StrategyKind::Greedy),
            "hierarchy" | "hierarchical" => Ok(StrategyKind::Hierarchy),
            "coordinated" | "coordinator" => Ok(StrategyKind::Coordinated),
            other => Err(format!(
                "unknown strategy '{other}' (expected greedy, hierarchy, or coordinated)"
            )),
        }
    }
}

/// A concrete decision policy bound to one philosopher.
///
/// Only [`Strategy::Coordinated`] carries state: the grant mailbox its
/// coordinator writes into.
#[derive(Debug)]
pub enum Strategy {
    Greedy,
    Hierarchy,
    Coordinated {
        /// One-shot mailbox filled by the coordinator's arbitration step.
        grants: GrantSlot,
    },
}

impl Strategy {
    /// The selector this policy was built from.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Greedy => StrategyKind::Greedy,
            Strategy::Hierarchy => StrategyKind::Hierarchy,
            Strategy::Coordinated { .. } => StrategyKind::Coordinated,
        }
    }

    /// Decides the next action. Pure with respect to table state: the only
    /// inputs are the two fork views and the caller's own flags. Any state
    /// other than `Hungry` decides `None`.
    pub fn decide(
        &self,
        left: ForkView,
        right: ForkView,
        state: PhilosopherState,
        has_left: bool,
        has_right: bool,
    ) -> Action {
        if state != PhilosopherState::Hungry {
            return Action::None;
        }
        match self {
            Strategy::Greedy => decide_greedy(left, right, has_left, has_right),
            Strategy::Hierarchy => decide_hierarchy(left, right, has_left, has_right),
            Strategy::Coordinated { grants } => decide_coordinated(grants, has_left, has_right),
        }
    }
}

fn decide_greedy(left: ForkView, right: ForkView, has_left: bool, has_right: bool) -> Action {
    if has_left && has_right {
        return Action::None;
    }
    if !has_left {
        if left.is_available() {
            return Action::TakeLeft;
        }
        return Action::None;
    }
    if !has_right && right.is_available() {
        return Action::TakeRight;
    }
    Action::None
}

fn decide_hierarchy(left: ForkView, right: ForkView, has_left: bool, has_right: bool) -> Action {
    if has_left && has_right {
        return Action::None;
    }
    let left_is_lower = left.id < right.id;

    if !has_left && !has_right {
        // Start with the lower-ordered fork or wait for it.
        return if left_is_lower {
            if left.is_available() {
                Action::TakeLeft
            } else {
                Action::None
            }
        } else if right.is_available() {
            Action::TakeRight
        } else {
            Action::None
        };
    }

    if left_is_lower {
        if has_left {
            // Holding the lower fork: go for the higher one when free.
            if right.is_available() {
                return Action::TakeRight;
            }
            return Action::None;
        }
        // Holding only the higher-ordered fork: back out and retry in order.
        return Action::ReleaseRight;
    }

    if has_right {
        if left.is_available() {
            return Action::TakeLeft;
        }
        return Action::None;
    }
    Action::ReleaseLeft
}

fn decide_coordinated(grants: &GrantSlot, has_left: bool, has_right: bool) -> Action {
    if let Some(granted) = grants.take() {
        return granted;
    }
    // The grant reserved the whole pair; the second fork needs no arbitration.
    if has_left && !has_right {
        return Action::TakeRight;
    }
    Action::None
}
