//! Run clocks and the shared service bundle handed to every philosopher.
//!
//! The two scheduling models tell time differently: the stepped driver owns a
//! virtual clock it advances by one millisecond per round, while the threaded
//! driver reads wall time from the moment the run was built. Everything that
//! stamps or measures time (forks, journal, wait metrics) goes through the
//! `Clock` trait so the same protocol code serves both drivers.

use crate::journal::StateJournal;
use crate::metrics::MetricsCollector;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of run-relative time in milliseconds.
///
/// Implementations must be cheap and callable from any thread; the threaded
/// driver reads the clock from every agent task.
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since the start of the run.
    fn now_ms(&self) -> u64;
}

/// Driver-advanced clock for the stepped model.
///
/// One round equals one virtual millisecond, so timestamps double as round
/// numbers and utilization percentages come out in round units.
#[derive(Debug, Default)]
pub struct VirtualClock {
    ms: AtomicU64,
}

impl VirtualClock {
    /// Creates a clock at t = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances virtual time.
    pub fn advance(&self, ms: u64) {
        self.ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::Relaxed)
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        VirtualClock::now_ms(self)
    }
}

/// Real-time clock for the threaded model, anchored at construction.
#[derive(Debug)]
pub struct WallClock {
    started: Instant,
}

impl WallClock {
    /// Creates a clock anchored at the current instant.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Shared run services: the clock plus the two observers every philosopher
/// reports into.
#[derive(Clone)]
pub struct RunContext {
    /// Run-relative time source.
    pub clock: Arc<dyn Clock>,

    /// State-transition journal (snapshot queries, export).
    pub journal: Arc<StateJournal>,

    /// Meal/wait aggregation.
    pub metrics: Arc<MetricsCollector>,
}

impl RunContext {
    /// Builds a context around the given clock, with a journal sharing that
    /// clock and a metrics collector sized for `philosophers` agents.
    pub fn new(clock: Arc<dyn Clock>, philosophers: usize) -> Self {
        let journal = Arc::new(StateJournal::new(clock.clone()));
        let metrics = Arc::new(MetricsCollector::new(philosophers));
        Self {
            clock,
            journal,
            metrics,
        }
    }
}
