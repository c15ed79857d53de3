//! Symposium Core - Dining Philosophers Resource-Allocation Laboratory
//!
//! This library models N philosophers sharing N forks around a table and
//! lets three allocation strategies compete on the same protocol:
//! 1. **Greedy**: left-then-right with no discipline - reliably deadlocks
//! 2. **Hierarchy**: forks acquired in ascending id order - breaks circular wait
//! 3. **Coordinated**: a central arbiter reserves whole fork pairs - nobody blocks
//!
//! The state machines are driver-agnostic: a deterministic stepped runner
//! and a tokio-threaded runner (both in the companion binary crate) drive
//! the same philosophers, forks, journal, and deadlock detector.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod detector;
pub mod error;
pub mod fork;
pub mod journal;
pub mod metrics;
pub mod philosopher;
pub mod strategy;
pub mod table;

// Re-export key types for convenience
pub use config::{default_names, DurationRange, SimulationConfig, CLASSIC_NAMES};
pub use context::{Clock, RunContext, VirtualClock, WallClock};
pub use coordinator::{Coordinator, GrantSlot};
pub use detector::DeadlockDetector;
pub use error::SimulationError;
pub use fork::{Fork, ForkState, ForkUtilization, ForkView};
pub use journal::{ForkRecord, PhilosopherRecord, RunExport, RunMarkers, StateJournal};
pub use metrics::{MetricsCollector, MetricsReport, PhilosopherReport};
pub use philosopher::{Philosopher, PhilosopherState, PhilosopherView};
pub use strategy::{Action, Strategy, StrategyKind};
pub use table::Table;
