//! Concurrent driver: one tokio task per philosopher, wall-clock time.
//!
//! Philosophers really race here — the reach for a fork is a real sleep,
//! and interleaving comes from the scheduler instead of seat order. The
//! driver task doubles as the monitor: it polls hold signatures on an
//! interval, stops the run on the deadlock signature or the configured
//! duration, and cancels every task through one token. Each task releases
//! whatever it holds on the way out, so the table is always clean after a
//! run, deadlocked or not.
//!
//! Lock discipline: philosopher mutexes are taken only between awaits,
//! never across one.

use crate::outcome::{RunMode, RunOutcome};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use symposium_core::{
    Action, Coordinator, DeadlockDetector, Fork, ForkView, Philosopher, PhilosopherState,
    PhilosopherView, RunContext, SimulationConfig, SimulationError, Table, WallClock,
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Knobs for the threaded driver.
#[derive(Debug, Clone, Copy)]
pub struct ThreadedSettings {
    /// Wall-clock run length.
    pub duration_ms: u64,
    /// Monitor poll interval.
    pub monitor_interval_ms: u64,
    /// Arbiter step interval (Coordinated strategy only).
    pub arbiter_interval_ms: u64,
}

impl Default for ThreadedSettings {
    fn default() -> Self {
        Self {
            duration_ms: 10_000,
            monitor_interval_ms: 150,
            arbiter_interval_ms: 5,
        }
    }
}

/// Wall-clock driver owning the philosopher cells.
pub struct ThreadedSimulation {
    config: SimulationConfig,
    settings: ThreadedSettings,
    ctx: RunContext,
    cells: Vec<Arc<Mutex<Philosopher>>>,
    forks: Vec<Arc<Fork>>,
    coordinator: Option<Arc<Coordinator>>,
    detector: DeadlockDetector,
}

impl ThreadedSimulation {
    /// Builds the table; fails on an invalid config.
    pub fn new(
        config: SimulationConfig,
        settings: ThreadedSettings,
    ) -> Result<Self, SimulationError> {
        let clock = Arc::new(WallClock::new());
        let ctx = RunContext::new(clock, config.philosopher_count());
        let Table {
            forks,
            philosophers,
            coordinator,
        } = Table::new(&config, &ctx)?;
        let cells = philosophers
            .into_iter()
            .map(|philosopher| Arc::new(Mutex::new(philosopher)))
            .collect();
        Ok(Self {
            config,
            settings,
            ctx,
            cells,
            forks,
            coordinator,
            detector: DeadlockDetector::new(),
        })
    }

    /// Runs the table for the configured duration (or until deadlock),
    /// then joins every task and reports.
    pub async fn run(&mut self) -> Result<RunOutcome, SimulationError> {
        self.ctx
            .journal
            .begin_run(self.config.strategy, self.cells.len());
        info!(
            strategy = %self.config.strategy,
            philosophers = self.cells.len(),
            duration_ms = self.settings.duration_ms,
            "threaded run starting"
        );

        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(self.cells.len() + 1);
        for cell in &self.cells {
            handles.push(tokio::spawn(run_philosopher(cell.clone(), cancel.clone())));
        }
        if let Some(arbiter) = &self.coordinator {
            handles.push(tokio::spawn(run_arbiter(
                arbiter.clone(),
                cancel.clone(),
                self.settings.arbiter_interval_ms,
            )));
        }

        let mut deadlock_at = None;
        let mut polls = 0u64;
        loop {
            sleep(Duration::from_millis(self.settings.monitor_interval_ms)).await;
            polls += 1;

            let signatures: Vec<_> = self
                .cells
                .iter()
                .map(|cell| cell.lock().unwrap().hold_signature())
                .collect();
            if self.detector.check(signatures) {
                let now = self.ctx.clock.now_ms();
                warn!(elapsed_ms = now, "deadlock signature observed");
                deadlock_at = Some(now);
                break;
            }
            if self.ctx.clock.now_ms() >= self.settings.duration_ms {
                debug!(polls, "duration reached");
                break;
            }
        }

        cancel.cancel();
        for handle in handles {
            handle
                .await
                .map_err(|join_error| SimulationError::task(join_error.to_string()))?;
        }
        self.ctx.journal.complete();

        let elapsed_ms = self.ctx.clock.now_ms();
        Ok(RunOutcome {
            strategy: self.config.strategy,
            mode: RunMode::Threaded,
            seed: self.config.seed,
            deadlocked: deadlock_at.is_some(),
            deadlock_at,
            rounds: polls,
            elapsed_ms,
            report: self
                .ctx
                .metrics
                .report(&self.config.names, &self.forks, elapsed_ms),
        })
    }

    /// The run services (journal queries, export).
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Snapshots of every philosopher, in seat order.
    pub fn philosopher_views(&self) -> Vec<PhilosopherView> {
        self.cells
            .iter()
            .map(|cell| cell.lock().unwrap().view())
            .collect()
    }

    /// Snapshots of every fork, in ring order.
    pub fn fork_views(&self) -> Vec<ForkView> {
        self.forks.iter().map(|fork| fork.view()).collect()
    }
}

/// One philosopher's life until cancellation. Every sleep races the token,
/// and the exit path returns any held forks to the table.
async fn run_philosopher(cell: Arc<Mutex<Philosopher>>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let state = cell.lock().unwrap().state();
        match state {
            PhilosopherState::Thinking => {
                let think_ms = cell.lock().unwrap().draw_thinking_ms();
                if !pause(&cancel, think_ms).await {
                    break;
                }
                cell.lock().unwrap().become_hungry();
            }
            PhilosopherState::Hungry => {
                let (action, latency_ms) = {
                    let mut philosopher = cell.lock().unwrap();
                    (philosopher.decide(), philosopher.latency_ms())
                };
                match action {
                    Action::TakeLeft => {
                        if !pause(&cancel, latency_ms).await {
                            break;
                        }
                        cell.lock().unwrap().take_left();
                    }
                    Action::TakeRight => {
                        if !pause(&cancel, latency_ms).await {
                            break;
                        }
                        cell.lock().unwrap().take_right();
                    }
                    Action::ReleaseLeft => cell.lock().unwrap().release_left(),
                    Action::ReleaseRight => cell.lock().unwrap().release_right(),
                    Action::ReleaseBoth => cell.lock().unwrap().release_both(),
                    Action::None => {
                        // Nothing to do until the table changes; back off briefly.
                        if !pause(&cancel, 1).await {
                            break;
                        }
                    }
                }
                cell.lock().unwrap().try_begin_eating();
            }
            PhilosopherState::Eating => {
                let eat_ms = cell.lock().unwrap().draw_eating_ms();
                if !pause(&cancel, eat_ms).await {
                    break;
                }
                cell.lock().unwrap().finish_eating();
            }
        }
    }
    cell.lock().unwrap().release_both();
}

/// Arbitration ticker for the Coordinated strategy.
async fn run_arbiter(arbiter: Arc<Coordinator>, cancel: CancellationToken, interval_ms: u64) {
    while pause(&cancel, interval_ms).await {
        arbiter.step();
    }
}

/// Sleeps unless cancelled first; true means the sleep completed.
async fn pause(cancel: &CancellationToken, ms: u64) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(Duration::from_millis(ms)) => true,
    }
}
