//! Error taxonomy for configuration and run failures.

use crate::config::DurationRange;
use thiserror::Error;

/// Everything that can stop a run from being built or finishing cleanly.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The roster is empty; there is no table to simulate.
    #[error("no philosophers configured")]
    EmptyRoster,

    /// A ring of one philosopher would share both forks with itself.
    #[error("a table needs at least two philosophers, got {0}")]
    TableTooSmall(usize),

    /// A duration range with a zero or inverted bound.
    #[error("invalid {what} range {min}..{max}: bounds must satisfy 1 <= min <= max")]
    InvalidRange {
        /// Which config field the range came from.
        what: &'static str,
        /// Offending lower bound.
        min: u64,
        /// Offending upper bound.
        max: u64,
    },

    /// Instant acquisition would remove the contention window the whole
    /// experiment is about.
    #[error("acquisition latency must be at least one time unit")]
    ZeroLatency,

    /// A philosopher task ended abnormally under the threaded driver.
    #[error("philosopher task failed: {0}")]
    Task(String),
}

impl SimulationError {
    /// Wraps an offending range with the config field it came from.
    pub fn invalid_range(what: &'static str, range: DurationRange) -> Self {
        SimulationError::InvalidRange {
            what,
            min: range.min,
            max: range.max,
        }
    }

    /// Wraps a task join failure.
    pub fn task(message: impl Into<String>) -> Self {
        SimulationError::Task(message.into())
    }
}
