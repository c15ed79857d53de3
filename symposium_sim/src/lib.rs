//! Symposium Simulation Drivers
//!
//! Two drivers play the same table from `symposium_core`:
//! - **Stepped**: one thread, a virtual clock, explicit rounds. Fully
//!   deterministic under a fixed seed, so deadlocks replay exactly.
//! - **Threaded**: one tokio task per philosopher on the wall clock, with a
//!   monitor task polling for the deadlock signature and a cancellation
//!   token that guarantees forks come back at shutdown.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                        Table                           │
//! │    F0 ── P0 ── F1 ── P1 ── F2 ── P2 ── F3 ── P3 ──┐    │
//! │    └──────────────────── ring ────────────────────┘    │
//! └────────────────────────────────────────────────────────┘
//!          ▲                                ▲
//!   SteppedSimulation                ThreadedSimulation
//!   (virtual clock, rounds,          (task per seat, wall
//!    seat-order stepping)             clock, monitor poll)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use symposium_core::{default_names, SimulationConfig, StrategyKind};
//! use symposium_sim::{SteppedSettings, SteppedSimulation};
//!
//! let config = SimulationConfig::stepwise(default_names(5), StrategyKind::Hierarchy, Some(42));
//! let mut sim = SteppedSimulation::new(config, SteppedSettings::default())?;
//! let outcome = sim.run();
//! println!("{outcome}");
//! ```

mod display;
mod outcome;
mod stepped;
mod threaded;

pub use display::{render_outcome, render_table};
pub use outcome::{RunMode, RunOutcome};
pub use stepped::{SteppedSettings, SteppedSimulation};
pub use threaded::{ThreadedSettings, ThreadedSimulation};
