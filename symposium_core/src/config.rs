//! Run configuration: roster, strategy, timing ranges, seeding.
//!
//! One config type serves both drivers; only the unit changes. The stepped
//! model reads durations as rounds, the threaded model as real milliseconds,
//! and `stepwise`/`realtime` bake in the matching defaults.

use crate::error::SimulationError;
use crate::strategy::StrategyKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusive duration range, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    /// Smallest duration drawn.
    pub min: u64,
    /// Largest duration drawn.
    pub max: u64,
}

impl DurationRange {
    /// Builds an inclusive range. Bounds are checked by
    /// [`SimulationConfig::validate`], not here.
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Draws one duration.
    pub fn sample(&self, rng: &mut impl Rng) -> u64 {
        rng.gen_range(self.min..=self.max)
    }
}

impl fmt::Display for DurationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

impl FromStr for DurationRange {
    type Err = String;

    /// Accepts `"3..10"`, `"3..=10"` (the same inclusive range), or a bare
    /// `"7"` for a fixed duration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((lo, hi)) = s.split_once("..") {
            let hi = hi.strip_prefix('=').unwrap_or(hi);
            let min = lo
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("bad lower bound in '{s}'"))?;
            let max = hi
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("bad upper bound in '{s}'"))?;
            Ok(DurationRange::new(min, max))
        } else {
            let value = s
                .parse::<u64>()
                .map_err(|_| format!("bad duration '{s}'"))?;
            Ok(DurationRange::new(value, value))
        }
    }
}

/// The traditional roster, used when the caller does not name the table.
pub const CLASSIC_NAMES: [&str; 10] = [
    "Aristotle",
    "Plato",
    "Socrates",
    "Descartes",
    "Kant",
    "Nietzsche",
    "Hume",
    "Spinoza",
    "Locke",
    "Confucius",
];

/// `count` display names: the classic roster first, numbered seats beyond.
pub fn default_names(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match CLASSIC_NAMES.get(i) {
            Some(name) => (*name).to_string(),
            None => format!("Philosopher-{i}"),
        })
        .collect()
}

/// Everything a run needs decided up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Display names; the roster length is the table size.
    pub names: Vec<String>,
    /// Allocation strategy for every seat.
    pub strategy: StrategyKind,
    /// Thinking-phase duration range.
    pub thinking: DurationRange,
    /// Eating-phase duration range.
    pub eating: DurationRange,
    /// Time units between deciding to take a fork and holding it.
    pub acquisition_latency: u64,
    /// When set, every philosopher draws from the same seeded stream,
    /// making the run reproducible (and hunger waves synchronized).
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Defaults tuned for the stepped model, in rounds: short phases so
    /// interesting interleavings show up within a few dozen rounds.
    pub fn stepwise(names: Vec<String>, strategy: StrategyKind, seed: Option<u64>) -> Self {
        Self {
            names,
            strategy,
            thinking: DurationRange::new(3, 10),
            eating: DurationRange::new(4, 5),
            acquisition_latency: 2,
            seed,
        }
    }

    /// Defaults tuned for the threaded model, in milliseconds.
    pub fn realtime(names: Vec<String>, strategy: StrategyKind, seed: Option<u64>) -> Self {
        Self {
            names,
            strategy,
            thinking: DurationRange::new(30, 100),
            eating: DurationRange::new(40, 50),
            acquisition_latency: 20,
            seed,
        }
    }

    /// Number of seats (= forks) this config describes.
    pub fn philosopher_count(&self) -> usize {
        self.names.len()
    }

    /// Rejects configs no run could make sense of.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.names.is_empty() {
            return Err(SimulationError::EmptyRoster);
        }
        if self.names.len() < 2 {
            return Err(SimulationError::TableTooSmall(self.names.len()));
        }
        if self.thinking.min == 0 || self.thinking.min > self.thinking.max {
            return Err(SimulationError::invalid_range("thinking", self.thinking));
        }
        if self.eating.min == 0 || self.eating.min > self.eating.max {
            return Err(SimulationError::invalid_range("eating", self.eating));
        }
        if self.acquisition_latency == 0 {
            return Err(SimulationError::ZeroLatency);
        }
        Ok(())
    }
}
