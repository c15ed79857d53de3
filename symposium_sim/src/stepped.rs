//! Deterministic stepped driver.
//!
//! One thread, one virtual clock, explicit rounds. Each round advances the
//! clock by one millisecond, lets the arbiter hand out any pending grants,
//! then steps every philosopher in seat order. Same seed, same config, same
//! timeline — which is what makes deadlock reports reproducible enough to
//! pin in a regression test.

use crate::outcome::{RunMode, RunOutcome};
use std::sync::Arc;
use symposium_core::{
    DeadlockDetector, RunContext, SimulationConfig, SimulationError, Table, VirtualClock,
};
use tracing::{info, warn};

/// Knobs for the stepped driver.
#[derive(Debug, Clone, Copy)]
pub struct SteppedSettings {
    /// Hard stop, in rounds.
    pub max_rounds: u64,
    /// Rounds between liveness progress lines; zero disables them.
    pub progress_interval: u64,
}

impl Default for SteppedSettings {
    fn default() -> Self {
        Self {
            max_rounds: 1_000_000,
            progress_interval: 100_000,
        }
    }
}

/// Round-by-round driver over a virtual clock.
pub struct SteppedSimulation {
    config: SimulationConfig,
    settings: SteppedSettings,
    clock: Arc<VirtualClock>,
    ctx: RunContext,
    table: Table,
    detector: DeadlockDetector,
    rounds_run: u64,
    deadlock_at: Option<u64>,
}

impl SteppedSimulation {
    /// Builds the table; fails on an invalid config.
    pub fn new(
        config: SimulationConfig,
        settings: SteppedSettings,
    ) -> Result<Self, SimulationError> {
        let clock = Arc::new(VirtualClock::new());
        let ctx = RunContext::new(clock.clone(), config.philosopher_count());
        let table = Table::new(&config, &ctx)?;
        Ok(Self {
            config,
            settings,
            clock,
            ctx,
            table,
            detector: DeadlockDetector::new(),
            rounds_run: 0,
            deadlock_at: None,
        })
    }

    /// Plays one round. Returns true when the table just deadlocked.
    ///
    /// The arbiter steps before the philosophers so a grant issued this
    /// round is visible to its philosopher this round.
    pub fn step_round(&mut self) -> bool {
        self.clock.advance(1);
        if let Some(arbiter) = &self.table.coordinator {
            arbiter.step();
        }
        for philosopher in &mut self.table.philosophers {
            philosopher.step();
        }
        self.rounds_run += 1;

        if self.detector.check(self.table.hold_signatures()) {
            self.deadlock_at = Some(self.rounds_run);
            return true;
        }
        false
    }

    /// Plays rounds until deadlock or the round cap, then reports.
    pub fn run(&mut self) -> RunOutcome {
        self.ctx
            .journal
            .begin_run(self.config.strategy, self.table.seats());
        info!(
            strategy = %self.config.strategy,
            philosophers = self.table.seats(),
            max_rounds = self.settings.max_rounds,
            "stepped run starting"
        );

        while self.rounds_run < self.settings.max_rounds {
            if self.step_round() {
                warn!(round = self.rounds_run, "deadlock signature observed");
                break;
            }
            if self.settings.progress_interval > 0
                && self.rounds_run % self.settings.progress_interval == 0
            {
                info!(round = self.rounds_run, "still live");
            }
        }
        self.ctx.journal.complete();

        let elapsed_ms = self.clock.now_ms();
        RunOutcome {
            strategy: self.config.strategy,
            mode: RunMode::Stepped,
            seed: self.config.seed,
            deadlocked: self.deadlock_at.is_some(),
            deadlock_at: self.deadlock_at,
            rounds: self.rounds_run,
            elapsed_ms,
            report: self
                .ctx
                .metrics
                .report(&self.config.names, &self.table.forks, elapsed_ms),
        }
    }

    /// The table, for inspection between rounds.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// The run services (journal queries, export).
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Rounds played so far.
    pub fn rounds_run(&self) -> u64 {
        self.rounds_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symposium_core::{default_names, StrategyKind};

    fn short_settings(max_rounds: u64) -> SteppedSettings {
        SteppedSettings {
            max_rounds,
            progress_interval: 0,
        }
    }

    #[test]
    fn test_same_seed_replays_the_same_run() {
        let play = || {
            let config =
                SimulationConfig::stepwise(default_names(5), StrategyKind::Hierarchy, Some(9));
            let mut sim = SteppedSimulation::new(config, short_settings(400)).unwrap();
            let outcome = sim.run();
            let meals: Vec<u64> = outcome.report.philosophers.iter().map(|p| p.meals).collect();
            (outcome.score(), outcome.rounds, outcome.deadlocked, meals)
        };

        assert_eq!(play(), play());
    }

    #[test]
    fn test_synchronized_greedy_table_deadlocks_within_rounds() {
        let config = SimulationConfig::stepwise(default_names(5), StrategyKind::Greedy, Some(322));
        let mut sim = SteppedSimulation::new(config, short_settings(50)).unwrap();
        let outcome = sim.run();

        assert!(outcome.deadlocked);
        assert!(outcome.deadlock_at.unwrap() <= 20);
    }

    #[test]
    fn test_journal_brackets_the_run_and_answers_snapshots() {
        let config =
            SimulationConfig::stepwise(default_names(3), StrategyKind::Coordinated, Some(5));
        let mut sim = SteppedSimulation::new(config, short_settings(200)).unwrap();
        let outcome = sim.run();
        assert!(!outcome.deadlocked);

        let journal = &sim.context().journal;
        let markers = journal.run_markers().unwrap();
        assert_eq!(markers.strategy, "coordinated");
        assert_eq!(markers.philosophers, 3);
        assert_eq!(markers.ended_at_ms, Some(outcome.elapsed_ms));

        // Construction publishes the initial Thinking record at t = 0.
        let snapshot = journal.philosopher_at(0, outcome.elapsed_ms).unwrap();
        assert_eq!(snapshot.philosopher, 0);

        let export = journal.export();
        assert!(!export.philosophers.is_empty());
        assert!(!export.forks.is_empty());
    }

    #[test]
    fn test_invalid_config_fails_at_build() {
        let config = SimulationConfig::stepwise(Vec::new(), StrategyKind::Greedy, None);
        assert!(SteppedSimulation::new(config, SteppedSettings::default()).is_err());
    }
}
