//! Central arbitration for the Coordinated strategy.
//!
//! The coordinator tracks which philosophers are hungry (FIFO) and which fork
//! ids are logically free. Each arbitration step walks the queue and, for any
//! philosopher whose *pair* of fork ids is free, reserves both ids and hands
//! the philosopher a one-shot `TakeLeft` grant through its [`GrantSlot`].
//! Reservation is logical: the ids leave the available set before the
//! physical takes happen, so no two granted philosophers can ever contend.
//! Forks return to the set only when the philosopher reports it finished
//! eating.
//!
//! The protocol assumes every seat at the table uses this coordinator; a
//! neighbor acquiring forks outside the bookkeeping would break the
//! reservation invariant.

use crate::strategy::Action;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One-slot grant mailbox shared between the coordinator and one
/// philosopher's strategy. Writing replaces any unconsumed grant; reading
/// empties the slot.
#[derive(Debug, Clone, Default)]
pub struct GrantSlot {
    cell: Arc<Mutex<Option<Action>>>,
}

impl GrantSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposits a grant.
    pub fn offer(&self, action: Action) {
        *self.cell.lock().unwrap() = Some(action);
    }

    /// Consumes the pending grant, if any.
    pub fn take(&self) -> Option<Action> {
        self.cell.lock().unwrap().take()
    }
}

#[derive(Debug)]
struct ArbiterState {
    /// Hungry philosophers in request order.
    hungry: VecDeque<usize>,
    /// Fork ids neither physically held nor reserved by a grant.
    available: HashSet<usize>,
}

/// The table-wide arbiter. All interior state sits behind a single mutex so
/// `request_to_eat`, `notify_finished`, and `step` exclude each other under
/// the threaded model.
pub struct Coordinator {
    seats: usize,
    slots: Vec<GrantSlot>,
    inner: Mutex<ArbiterState>,
}

impl Coordinator {
    /// Creates an arbiter for a table of `seats` philosophers, with every
    /// fork initially available.
    pub fn new(seats: usize) -> Self {
        Self {
            seats,
            slots: (0..seats).map(|_| GrantSlot::new()).collect(),
            inner: Mutex::new(ArbiterState {
                hungry: VecDeque::new(),
                available: (0..seats).collect(),
            }),
        }
    }

    /// Number of seats (= forks) at the table.
    pub fn seats(&self) -> usize {
        self.seats
    }

    /// The grant mailbox for one philosopher; cloned into its strategy.
    pub fn grant_slot(&self, philosopher: usize) -> GrantSlot {
        self.slots[philosopher].clone()
    }

    fn left_of(&self, philosopher: usize) -> usize {
        philosopher
    }

    fn right_of(&self, philosopher: usize) -> usize {
        (philosopher + 1) % self.seats
    }

    /// Reports a philosopher turned hungry; it joins the FIFO queue.
    pub fn request_to_eat(&self, philosopher: usize) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.hungry.contains(&philosopher) {
            inner.hungry.push_back(philosopher);
        }
        debug!(philosopher, waiting = inner.hungry.len(), "hungry request");
    }

    /// Reports a philosopher finished eating; its pair of fork ids returns
    /// to the available set.
    pub fn notify_finished(&self, philosopher: usize) {
        let left = self.left_of(philosopher);
        let right = self.right_of(philosopher);

        let mut inner = self.inner.lock().unwrap();
        inner.hungry.retain(|&waiting| waiting != philosopher);
        inner.available.insert(left);
        inner.available.insert(right);
        debug!(philosopher, "finished eating, forks returned");
    }

    /// One arbitration round: grant every queued philosopher whose fork pair
    /// is free, in FIFO order, reserving the ids as it goes.
    pub fn step(&self) {
        let mut granted = Vec::new();
        {
            let mut guard = self.inner.lock().unwrap();
            let ArbiterState { hungry, available } = &mut *guard;

            for &philosopher in hungry.iter() {
                let left = philosopher;
                let right = (philosopher + 1) % self.seats;
                if available.contains(&left) && available.contains(&right) {
                    available.remove(&left);
                    available.remove(&right);
                    granted.push(philosopher);
                }
            }
            hungry.retain(|philosopher| !granted.contains(philosopher));
        }

        for philosopher in granted {
            self.slots[philosopher].offer(Action::TakeLeft);
            debug!(philosopher, "fork pair granted");
        }
    }

    /// Queue snapshot, in request order.
    pub fn waiting(&self) -> Vec<usize> {
        self.inner.lock().unwrap().hungry.iter().copied().collect()
    }

    /// Unreserved fork ids, sorted.
    pub fn available_forks(&self) -> Vec<usize> {
        let mut forks: Vec<usize> = self
            .inner
            .lock()
            .unwrap()
            .available
            .iter()
            .copied()
            .collect();
        forks.sort_unstable();
        forks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_requires_both_forks() {
        let arbiter = Coordinator::new(5);
        let slot_0 = arbiter.grant_slot(0);
        let slot_1 = arbiter.grant_slot(1);

        arbiter.request_to_eat(0);
        arbiter.request_to_eat(1);
        arbiter.step();

        // Philosopher 0 reserved forks 0 and 1, starving 1's request.
        assert_eq!(slot_0.take(), Some(Action::TakeLeft));
        assert_eq!(slot_1.take(), None);
        assert_eq!(arbiter.waiting(), vec![1]);
        assert_eq!(arbiter.available_forks(), vec![2, 3, 4]);
    }

    #[test]
    fn test_disjoint_pairs_granted_in_one_step() {
        let arbiter = Coordinator::new(5);
        arbiter.request_to_eat(0);
        arbiter.request_to_eat(2);
        arbiter.step();

        assert_eq!(arbiter.grant_slot(0).take(), Some(Action::TakeLeft));
        assert_eq!(arbiter.grant_slot(2).take(), Some(Action::TakeLeft));
        assert!(arbiter.waiting().is_empty());
        assert_eq!(arbiter.available_forks(), vec![4]);
    }

    #[test]
    fn test_finish_returns_forks_and_unblocks_neighbor() {
        let arbiter = Coordinator::new(5);
        arbiter.request_to_eat(0);
        arbiter.step();
        assert_eq!(arbiter.grant_slot(0).take(), Some(Action::TakeLeft));

        arbiter.request_to_eat(1);
        arbiter.step();
        // Fork 1 is still reserved by philosopher 0.
        assert_eq!(arbiter.grant_slot(1).take(), None);

        arbiter.notify_finished(0);
        arbiter.step();
        assert_eq!(arbiter.grant_slot(1).take(), Some(Action::TakeLeft));
        assert_eq!(arbiter.available_forks(), vec![0, 3, 4]);
    }

    #[test]
    fn test_fifo_priority_on_contended_pair() {
        let arbiter = Coordinator::new(5);
        // 1 and 2 share fork 2; the earlier request wins when both are free.
        arbiter.request_to_eat(2);
        arbiter.request_to_eat(1);
        arbiter.step();

        assert_eq!(arbiter.grant_slot(2).take(), Some(Action::TakeLeft));
        assert_eq!(arbiter.grant_slot(1).take(), None);
        assert_eq!(arbiter.waiting(), vec![1]);
    }

    #[test]
    fn test_wraparound_pair_reserves_fork_zero() {
        let arbiter = Coordinator::new(3);
        arbiter.request_to_eat(2); // pair (2, 0)
        arbiter.step();

        assert_eq!(arbiter.grant_slot(2).take(), Some(Action::TakeLeft));
        assert_eq!(arbiter.available_forks(), vec![1]);
    }

    #[test]
    fn test_step_with_empty_queue_is_a_no_op() {
        let arbiter = Coordinator::new(4);
        arbiter.step();
        assert_eq!(arbiter.available_forks(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_duplicate_requests_are_ignored() {
        let arbiter = Coordinator::new(4);
        arbiter.request_to_eat(3);
        arbiter.request_to_eat(3);
        assert_eq!(arbiter.waiting(), vec![3]);
    }
}
