//! The summary both drivers hand back when a run ends.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use symposium_core::{MetricsReport, StrategyKind};

/// Which driver plays the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunMode {
    /// Deterministic rounds on one thread over a virtual clock.
    Stepped,
    /// One tokio task per philosopher over the wall clock.
    Threaded,
}

impl RunMode {
    /// Short machine-friendly name (CLI and logs).
    pub fn name(&self) -> &'static str {
        match self {
            RunMode::Stepped => "stepped",
            RunMode::Threaded => "threaded",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stepped" => Ok(RunMode::Stepped),
            "threaded" => Ok(RunMode::Threaded),
            other => Err(format!(
                "unknown mode '{other}' (expected stepped or threaded)"
            )),
        }
    }
}

/// Everything a finished run reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Strategy the table played.
    pub strategy: StrategyKind,
    /// Driver that played it.
    pub mode: RunMode,
    /// Seed the run was played under, if fixed.
    pub seed: Option<u64>,
    /// Whether the deadlock signature was observed.
    pub deadlocked: bool,
    /// When the deadlock was observed: the round number under the stepped
    /// driver, elapsed wall milliseconds under the threaded driver.
    pub deadlock_at: Option<u64>,
    /// Rounds played (stepped) or monitor passes completed (threaded).
    pub rounds: u64,
    /// Run length in the driver's clock, milliseconds.
    pub elapsed_ms: u64,
    /// Meal/wait/utilization aggregation.
    pub report: MetricsReport,
}

impl RunOutcome {
    /// Total meals: the single number strategy comparisons rank by.
    pub fn score(&self) -> u64 {
        self.report.total_meals
    }

    /// True when a strategy that promises liveness deadlocked anyway.
    pub fn failed_liveness(&self) -> bool {
        self.deadlocked && self.strategy.avoids_deadlock()
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.strategy, self.mode)?;
        if let Some(seed) = self.seed {
            write!(f, " (seed {seed})")?;
        }
        if self.deadlocked {
            write!(f, ": DEADLOCK at {}", self.deadlock_at.unwrap_or(0))?;
        } else {
            write!(f, ": completed")?;
        }
        write!(
            f,
            " after {} rounds, {} ms, {} meals",
            self.rounds,
            self.elapsed_ms,
            self.report.total_meals
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(strategy: StrategyKind, deadlocked: bool) -> RunOutcome {
        RunOutcome {
            strategy,
            mode: RunMode::Stepped,
            seed: Some(322),
            deadlocked,
            deadlock_at: deadlocked.then_some(14),
            rounds: 100,
            elapsed_ms: 100,
            report: MetricsReport {
                total_meals: 7,
                philosophers: Vec::new(),
                forks: Vec::new(),
            },
        }
    }

    #[test]
    fn test_mode_parses_strictly() {
        assert_eq!("stepped".parse(), Ok(RunMode::Stepped));
        assert_eq!("Threaded".parse(), Ok(RunMode::Threaded));
        assert!("realtime".parse::<RunMode>().is_err());
    }

    #[test]
    fn test_liveness_failure_only_for_promising_strategies() {
        assert!(!outcome(StrategyKind::Greedy, true).failed_liveness());
        assert!(outcome(StrategyKind::Hierarchy, true).failed_liveness());
        assert!(!outcome(StrategyKind::Coordinated, false).failed_liveness());
    }

    #[test]
    fn test_display_mentions_deadlock_and_seed() {
        let rendered = outcome(StrategyKind::Greedy, true).to_string();
        assert!(rendered.contains("greedy / stepped"));
        assert!(rendered.contains("seed 322"));
        assert!(rendered.contains("DEADLOCK at 14"));

        let clean = outcome(StrategyKind::Coordinated, false).to_string();
        assert!(clean.contains("completed"));
    }
}
