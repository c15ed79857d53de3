//! Deadlock detection over hold signatures.
//!
//! The shipped strategies can only wedge the table one way: every
//! philosopher hungry and clutching exactly one fork, each waiting on a
//! neighbor who will never yield. That signature is stable once reached, so
//! a single observation is conclusive and the detector needs no history.

use crate::philosopher::PhilosopherState;

/// Scans a snapshot of hold signatures for the circular-wait pattern.
///
/// The check is deliberately scoped to the one-fork-each signature. A table
/// where some hungry philosopher holds zero forks still has a fork
/// physically free somewhere, which the strategies in this crate will
/// eventually reach for, so that shape is not reported.
#[derive(Debug, Default)]
pub struct DeadlockDetector;

impl DeadlockDetector {
    /// Creates a detector.
    pub fn new() -> Self {
        Self
    }

    /// True when every philosopher is hungry and holds exactly one fork.
    /// An empty table never counts as deadlocked.
    pub fn check<I>(&self, signatures: I) -> bool
    where
        I: IntoIterator<Item = (PhilosopherState, bool, bool)>,
    {
        let mut seen = 0usize;
        for (state, has_left, has_right) in signatures {
            seen += 1;
            if state != PhilosopherState::Hungry || has_left == has_right {
                return false;
            }
        }
        seen > 0
    }
}
