//! Table assembly: forks, philosophers, and wiring between them.
//!
//! Seat `i` gets fork `i` on its left and fork `(i + 1) % n` on its right,
//! closing the ring. Under the Coordinated strategy the table also owns the
//! arbiter and threads a grant slot into every philosopher's strategy.

use crate::config::SimulationConfig;
use crate::context::RunContext;
use crate::coordinator::Coordinator;
use crate::error::SimulationError;
use crate::fork::{Fork, ForkView};
use crate::philosopher::{Philosopher, PhilosopherState, PhilosopherView};
use crate::strategy::{Strategy, StrategyKind};
use std::fmt;
use std::sync::Arc;

/// A fully wired table, ready for either driver.
pub struct Table {
    /// Forks in ring order; `forks[i]` sits between seats `i-1` and `i`.
    pub forks: Vec<Arc<Fork>>,
    /// Philosophers in seat order.
    pub philosophers: Vec<Philosopher>,
    /// The arbiter, present only under the Coordinated strategy.
    pub coordinator: Option<Arc<Coordinator>>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("seats", &self.seats())
            .field("coordinated", &self.coordinator.is_some())
            .finish_non_exhaustive()
    }
}

impl Table {
    /// Validates the config and builds the ring.
    pub fn new(config: &SimulationConfig, ctx: &RunContext) -> Result<Self, SimulationError> {
        config.validate()?;
        let seats = config.philosopher_count();

        let forks: Vec<Arc<Fork>> = (0..seats)
            .map(|id| Arc::new(Fork::new(id, ctx.clock.clone())))
            .collect();

        let coordinator = (config.strategy == StrategyKind::Coordinated)
            .then(|| Arc::new(Coordinator::new(seats)));

        let philosophers = config
            .names
            .iter()
            .enumerate()
            .map(|(id, name)| {
                let strategy = if let Some(arbiter) = &coordinator {
                    Strategy::Coordinated {
                        grants: arbiter.grant_slot(id),
                    }
                } else if config.strategy == StrategyKind::Hierarchy {
                    Strategy::Hierarchy
                } else {
                    Strategy::Greedy
                };
                Philosopher::new(
                    id,
                    name.clone(),
                    strategy,
                    forks[id].clone(),
                    forks[(id + 1) % seats].clone(),
                    coordinator.clone(),
                    ctx,
                    config,
                )
            })
            .collect();

        Ok(Self {
            forks,
            philosophers,
            coordinator,
        })
    }

    /// Number of seats (= forks).
    pub fn seats(&self) -> usize {
        self.forks.len()
    }

    /// Snapshots of every philosopher, in seat order.
    pub fn philosopher_views(&self) -> Vec<PhilosopherView> {
        self.philosophers.iter().map(Philosopher::view).collect()
    }

    /// Snapshots of every fork, in ring order.
    pub fn fork_views(&self) -> Vec<ForkView> {
        self.forks.iter().map(|fork| fork.view()).collect()
    }

    /// The detector's input: one hold signature per seat.
    pub fn hold_signatures(&self) -> Vec<(PhilosopherState, bool, bool)> {
        self.philosophers
            .iter()
            .map(Philosopher::hold_signature)
            .collect()
    }
}
