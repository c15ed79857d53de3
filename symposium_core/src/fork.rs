//! Forks: exclusive-ownership tokens shared by cycle-adjacent philosophers.
//!
//! A fork is the only synchronization point between two neighbors. All state
//! lives behind the fork's own mutex; acquisition is non-blocking (`try_take`
//! either succeeds immediately or reports contention) and callers retry on
//! their next round. The fork also keeps time buckets — how long it sat free,
//! how long it was held by a philosopher who was still assembling a pair, and
//! how long it was actively eaten with — for the final utilization report.

use crate::context::Clock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Ownership state of a fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForkState {
    /// On the table, free to take.
    Available,
    /// Held by exactly one philosopher.
    InUse,
}

/// Read-only snapshot of a fork, handed to strategies and observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkView {
    /// Fork id (= position in the ring).
    pub id: usize,
    /// Ownership state at snapshot time.
    pub state: ForkState,
    /// Holder id, present iff `state == InUse`.
    pub owner: Option<usize>,
}

impl ForkView {
    /// True when the fork can be taken.
    pub fn is_available(&self) -> bool {
        self.state == ForkState::Available
    }
}

/// Share of the run a fork spent in each usage class, in percent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForkUtilization {
    /// Fork id.
    pub fork: usize,
    /// Free on the table.
    pub free_pct: f64,
    /// Held while the holder was still hungry.
    pub blocked_pct: f64,
    /// Held while the holder was eating.
    pub eating_pct: f64,
}

#[derive(Debug)]
struct ForkCell {
    state: ForkState,
    owner: Option<usize>,
    eating: bool,
    /// Clock reading at the last state change.
    since_ms: u64,
    blocked_ms: u64,
    eating_ms: u64,
}

impl ForkCell {
    /// Folds the open interval since the last state change into the right
    /// bucket. Free time is derived later as the remainder of the run.
    fn settle(&mut self, now_ms: u64) {
        if self.state == ForkState::InUse {
            let span = now_ms.saturating_sub(self.since_ms);
            if self.eating {
                self.eating_ms += span;
            } else {
                self.blocked_ms += span;
            }
        }
        self.since_ms = now_ms;
    }
}

/// An exclusive resource in the ring.
pub struct Fork {
    id: usize,
    clock: Arc<dyn Clock>,
    cell: Mutex<ForkCell>,
}

impl Fork {
    /// Creates a fork lying free on the table.
    pub fn new(id: usize, clock: Arc<dyn Clock>) -> Self {
        let since_ms = clock.now_ms();
        Self {
            id,
            clock,
            cell: Mutex::new(ForkCell {
                state: ForkState::Available,
                owner: None,
                eating: false,
                since_ms,
                blocked_ms: 0,
                eating_ms: 0,
            }),
        }
    }

    /// Fork id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Attempts to take the fork for `owner`.
    ///
    /// Succeeds iff the fork is available; never blocks. On contention the
    /// caller re-consults its strategy next round.
    pub fn try_take(&self, owner: usize) -> bool {
        let mut cell = self.cell.lock().unwrap();
        if cell.state == ForkState::InUse {
            return false;
        }
        cell.settle(self.clock.now_ms());
        cell.state = ForkState::InUse;
        cell.owner = Some(owner);
        cell.eating = false;
        true
    }

    /// Puts the fork back on the table. Idempotent.
    pub fn release(&self) {
        let mut cell = self.cell.lock().unwrap();
        if cell.state == ForkState::Available {
            return;
        }
        cell.settle(self.clock.now_ms());
        cell.state = ForkState::Available;
        cell.owner = None;
        cell.eating = false;
    }

    /// Marks a held fork as actively eaten with. Affects utilization
    /// accounting only; exclusivity is untouched. Ignored when the fork is
    /// not held.
    pub fn mark_eating(&self) {
        let mut cell = self.cell.lock().unwrap();
        if cell.state != ForkState::InUse || cell.eating {
            return;
        }
        cell.settle(self.clock.now_ms());
        cell.eating = true;
    }

    /// Read-only snapshot.
    pub fn view(&self) -> ForkView {
        let cell = self.cell.lock().unwrap();
        ForkView {
            id: self.id,
            state: cell.state,
            owner: cell.owner,
        }
    }

    /// Usage breakdown over a run of `total_ms`. A zero-length run reports
    /// 100% free.
    pub fn utilization(&self, total_ms: u64) -> ForkUtilization {
        let cell = self.cell.lock().unwrap();

        let mut blocked = cell.blocked_ms;
        let mut eating = cell.eating_ms;
        // Account for an interval still open at report time.
        if cell.state == ForkState::InUse {
            let span = self.clock.now_ms().saturating_sub(cell.since_ms);
            if cell.eating {
                eating += span;
            } else {
                blocked += span;
            }
        }

        if total_ms == 0 {
            return ForkUtilization {
                fork: self.id,
                free_pct: 100.0,
                blocked_pct: 0.0,
                eating_pct: 0.0,
            };
        }

        let free = total_ms.saturating_sub(blocked + eating);
        let pct = |part: u64| part as f64 * 100.0 / total_ms as f64;
        ForkUtilization {
            fork: self.id,
            free_pct: pct(free),
            blocked_pct: pct(blocked),
            eating_pct: pct(eating),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VirtualClock;

    fn fork_with_clock() -> (Arc<VirtualClock>, Fork) {
        let clock = Arc::new(VirtualClock::new());
        let fork = Fork::new(0, clock.clone());
        (clock, fork)
    }

    #[test]
    fn test_new_fork_is_available() {
        let (_, fork) = fork_with_clock();
        let view = fork.view();
        assert_eq!(view.state, ForkState::Available);
        assert_eq!(view.owner, None);
        assert!(view.is_available());
    }

    #[test]
    fn test_take_marks_in_use_with_owner() {
        let (_, fork) = fork_with_clock();
        assert!(fork.try_take(3));

        let view = fork.view();
        assert_eq!(view.state, ForkState::InUse);
        assert_eq!(view.owner, Some(3));
    }

    #[test]
    fn test_second_take_fails_until_released() {
        let (_, fork) = fork_with_clock();
        assert!(fork.try_take(0));
        assert!(!fork.try_take(1));

        fork.release();
        assert!(fork.try_take(1));
        assert_eq!(fork.view().owner, Some(1));
    }

    #[test]
    fn test_release_is_idempotent() {
        let (_, fork) = fork_with_clock();
        fork.release();
        fork.release();
        assert!(fork.view().is_available());

        assert!(fork.try_take(2));
        fork.release();
        fork.release();
        assert!(fork.view().is_available());
    }

    #[test]
    fn test_utilization_buckets() {
        let (clock, fork) = fork_with_clock();

        assert!(fork.try_take(0)); // held from t=0
        clock.advance(10);
        fork.mark_eating(); // blocked for 10
        clock.advance(30);
        fork.release(); // eating for 30
        clock.advance(10); // free for 10

        let u = fork.utilization(50);
        assert!((u.blocked_pct - 20.0).abs() < 1e-9);
        assert!((u.eating_pct - 60.0).abs() < 1e-9);
        assert!((u.free_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_utilization_counts_open_interval() {
        let (clock, fork) = fork_with_clock();

        assert!(fork.try_take(0));
        clock.advance(40);

        // Still held, never released: the open interval counts as blocked.
        let u = fork.utilization(40);
        assert!((u.blocked_pct - 100.0).abs() < 1e-9);
        assert!((u.free_pct - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_utilization_of_empty_run() {
        let (_, fork) = fork_with_clock();
        let u = fork.utilization(0);
        assert!((u.free_pct - 100.0).abs() < 1e-9);
        assert!((u.blocked_pct - 0.0).abs() < 1e-9);
        assert!((u.eating_pct - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_mark_eating_without_holding_is_ignored() {
        let (clock, fork) = fork_with_clock();
        fork.mark_eating();
        clock.advance(10);

        let u = fork.utilization(10);
        assert!((u.free_pct - 100.0).abs() < 1e-9);
    }
}
