//! The philosopher state machine: Thinking → Hungry → Eating → Thinking.
//!
//! A philosopher owns nothing but its two fork handles, its strategy, and a
//! private RNG. All cross-philosopher coordination happens through the forks
//! themselves (and the optional [`Coordinator`]), so the same state machine
//! runs unchanged under the stepped driver (one `step()` per round, with
//! acquisition modeled as an in-flight countdown) and the threaded driver
//! (which calls the public transition methods around real `sleep`s).
//!
//! Fork acquisition is deliberately slow: a decision to take a fork only
//! *starts* the reach, and the physical grab lands `acquisition_latency`
//! time units later. That window is what lets two neighbors commit to
//! conflicting plans at once, which is the whole point of the experiment.

use crate::config::{DurationRange, SimulationConfig};
use crate::context::{Clock, RunContext};
use crate::coordinator::Coordinator;
use crate::fork::Fork;
use crate::journal::{ForkRecord, PhilosopherRecord, StateJournal};
use crate::metrics::MetricsCollector;
use crate::strategy::{Action, Strategy};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// The three lifecycle states of a philosopher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhilosopherState {
    /// Holds no forks, not interested in eating yet.
    Thinking,
    /// Wants to eat and is working on assembling a fork pair.
    Hungry,
    /// Holds both forks and is eating.
    Eating,
}

/// Read-only snapshot of a philosopher for display and assertions.
#[derive(Debug, Clone)]
pub struct PhilosopherView {
    /// Seat index in the ring.
    pub id: usize,
    /// Display name.
    pub name: String,
    /// Lifecycle state at snapshot time.
    pub state: PhilosopherState,
    /// Whether the left fork is held.
    pub has_left: bool,
    /// Whether the right fork is held.
    pub has_right: bool,
    /// Meals completed so far.
    pub eaten_count: u64,
    /// Most recent strategy decision.
    pub action: Action,
}

/// One agent at the table.
pub struct Philosopher {
    id: usize,
    name: String,
    state: PhilosopherState,
    strategy: Strategy,
    left: Arc<Fork>,
    right: Arc<Fork>,
    coordinator: Option<Arc<Coordinator>>,
    clock: Arc<dyn Clock>,
    journal: Arc<StateJournal>,
    metrics: Arc<MetricsCollector>,
    thinking: DurationRange,
    eating: DurationRange,
    latency: u64,
    rng: ChaCha8Rng,
    has_left: bool,
    has_right: bool,
    eaten_count: u64,
    last_action: Action,
    hungry_since_ms: u64,
    total_hungry_ms: u64,
    /// Time units spent in the current state (stepped model).
    units_in_state: u64,
    /// Planned duration of the current Thinking/Eating phase.
    units_planned: u64,
    /// Take currently in flight, if any (stepped model).
    inflight: Action,
    /// Rounds left before the in-flight take lands.
    inflight_units: u64,
}

impl Philosopher {
    /// Seats a philosopher with its two fork handles.
    ///
    /// When `config.seed` is set, every philosopher built from that config
    /// gets the *same* ChaCha8 stream; identical draws are what synchronize
    /// hunger waves and make deadlock runs reproducible. Without a seed each
    /// philosopher seeds itself from OS entropy.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        name: impl Into<String>,
        strategy: Strategy,
        left: Arc<Fork>,
        right: Arc<Fork>,
        coordinator: Option<Arc<Coordinator>>,
        ctx: &RunContext,
        config: &SimulationConfig,
    ) -> Self {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let units_planned = config.thinking.sample(&mut rng);

        let philosopher = Self {
            id,
            name: name.into(),
            state: PhilosopherState::Thinking,
            strategy,
            left,
            right,
            coordinator,
            clock: ctx.clock.clone(),
            journal: ctx.journal.clone(),
            metrics: ctx.metrics.clone(),
            thinking: config.thinking,
            eating: config.eating,
            latency: config.acquisition_latency,
            rng,
            has_left: false,
            has_right: false,
            eaten_count: 0,
            last_action: Action::None,
            hungry_since_ms: 0,
            total_hungry_ms: 0,
            units_in_state: 0,
            units_planned,
            inflight: Action::None,
            inflight_units: 0,
        };
        philosopher.publish_self();
        philosopher
    }

    /// Advances the state machine by one time unit (stepped model).
    ///
    /// An in-flight fork take consumes the whole round: the countdown ticks,
    /// and on reaching zero the physical grab is attempted. Otherwise the
    /// current state runs its logic — thinking and eating phases complete
    /// after their planned duration, and a hungry round is decide → start
    /// executing → check whether the pair is complete.
    pub fn step(&mut self) {
        self.units_in_state += 1;

        if self.inflight_units > 0 {
            self.inflight_units -= 1;
            if self.inflight_units == 0 {
                self.finish_inflight();
            }
            return;
        }

        match self.state {
            PhilosopherState::Thinking => {
                if self.units_in_state >= self.units_planned {
                    self.become_hungry();
                }
            }
            PhilosopherState::Hungry => self.hungry_step(),
            PhilosopherState::Eating => {
                if self.units_in_state >= self.units_planned {
                    self.finish_eating();
                }
            }
        }
    }

    fn hungry_step(&mut self) {
        let action = self.decide();
        match action {
            Action::TakeLeft | Action::TakeRight => self.arm_take(action),
            Action::ReleaseLeft => self.release_left(),
            Action::ReleaseRight => self.release_right(),
            Action::ReleaseBoth => self.release_both(),
            Action::None => {}
        }
        self.try_begin_eating();
    }

    /// Asks the strategy for the next move and records it as the last action.
    pub fn decide(&mut self) -> Action {
        let action = self.strategy.decide(
            self.left.view(),
            self.right.view(),
            self.state,
            self.has_left,
            self.has_right,
        );
        self.last_action = action;
        action
    }

    /// Starts the slow reach for a fork. The decision is re-checked against
    /// the current view so a grant or plan that became moot is dropped
    /// instead of armed.
    fn arm_take(&mut self, action: Action) {
        let (held, fork) = match action {
            Action::TakeLeft => (self.has_left, &self.left),
            Action::TakeRight => (self.has_right, &self.right),
            _ => return,
        };
        if held || !fork.view().is_available() {
            return;
        }
        self.inflight = action;
        self.inflight_units = self.latency;
    }

    /// The countdown expired: attempt the physical grab. The fork may have
    /// been taken during the reach, in which case the attempt simply fails
    /// and the next hungry round decides again.
    fn finish_inflight(&mut self) {
        match std::mem::replace(&mut self.inflight, Action::None) {
            Action::TakeLeft => {
                self.take_left();
            }
            Action::TakeRight => {
                self.take_right();
            }
            _ => {}
        }
    }

    /// Physically grabs the left fork. Returns whether it is now held.
    pub fn take_left(&mut self) -> bool {
        if self.has_left {
            return true;
        }
        if self.left.try_take(self.id) {
            self.has_left = true;
            self.publish_fork(&self.left);
            self.publish_self();
            return true;
        }
        false
    }

    /// Physically grabs the right fork. Returns whether it is now held.
    pub fn take_right(&mut self) -> bool {
        if self.has_right {
            return true;
        }
        if self.right.try_take(self.id) {
            self.has_right = true;
            self.publish_fork(&self.right);
            self.publish_self();
            return true;
        }
        false
    }

    /// Puts the left fork back, if held.
    pub fn release_left(&mut self) {
        if self.has_left {
            self.left.release();
            self.has_left = false;
            self.publish_fork(&self.left);
            self.publish_self();
        }
    }

    /// Puts the right fork back, if held.
    pub fn release_right(&mut self) {
        if self.has_right {
            self.right.release();
            self.has_right = false;
            self.publish_fork(&self.right);
            self.publish_self();
        }
    }

    /// Puts back whatever is held. Used by shutdown paths so a cancelled
    /// task never strands a fork, and by strategies backing out of a
    /// half-assembled pair.
    pub fn release_both(&mut self) {
        let mut changed = false;
        if self.has_left {
            self.left.release();
            self.has_left = false;
            self.publish_fork(&self.left);
            changed = true;
        }
        if self.has_right {
            self.right.release();
            self.has_right = false;
            self.publish_fork(&self.right);
            changed = true;
        }
        if changed {
            self.publish_self();
        }
    }

    /// Transitions Thinking → Hungry and files the request with the
    /// coordinator when one is in play.
    pub fn become_hungry(&mut self) {
        self.state = PhilosopherState::Hungry;
        self.units_in_state = 0;
        self.units_planned = 0;
        self.hungry_since_ms = self.clock.now_ms();
        if let Some(arbiter) = &self.coordinator {
            arbiter.request_to_eat(self.id);
        }
        debug!(philosopher = self.id, name = %self.name, "hungry");
        self.publish_self();
    }

    /// Starts eating if the pair is complete and nothing is still in flight.
    /// Returns whether the transition happened.
    pub fn try_begin_eating(&mut self) -> bool {
        if self.state == PhilosopherState::Hungry
            && self.has_left
            && self.has_right
            && self.inflight_units == 0
        {
            self.begin_eating();
            return true;
        }
        false
    }

    fn begin_eating(&mut self) {
        let waited = self.clock.now_ms().saturating_sub(self.hungry_since_ms);
        self.total_hungry_ms += waited;
        self.metrics.record_waiting(self.id, waited);

        self.state = PhilosopherState::Eating;
        self.units_in_state = 0;
        self.units_planned = self.eating.sample(&mut self.rng);
        self.left.mark_eating();
        self.right.mark_eating();
        debug!(philosopher = self.id, name = %self.name, waited_ms = waited, "eating");
        self.publish_self();
    }

    /// Transitions Eating → Thinking: releases both forks, counts the meal,
    /// and returns the pair to the coordinator when one is in play. The meal
    /// counts only here, on the way out, so an eating philosopher frozen by
    /// shutdown never inflates the tally.
    pub fn finish_eating(&mut self) {
        if self.has_left {
            self.left.release();
            self.has_left = false;
            self.publish_fork(&self.left);
        }
        if self.has_right {
            self.right.release();
            self.has_right = false;
            self.publish_fork(&self.right);
        }

        self.eaten_count += 1;
        self.metrics.record_meal(self.id);
        self.state = PhilosopherState::Thinking;
        self.units_in_state = 0;
        self.units_planned = self.thinking.sample(&mut self.rng);
        if let Some(arbiter) = &self.coordinator {
            arbiter.notify_finished(self.id);
        }
        debug!(philosopher = self.id, name = %self.name, meals = self.eaten_count, "thinking");
        self.publish_self();
    }

    /// Draws the next thinking duration (threaded driver).
    pub fn draw_thinking_ms(&mut self) -> u64 {
        self.thinking.sample(&mut self.rng)
    }

    /// Draws the next eating duration (threaded driver).
    pub fn draw_eating_ms(&mut self) -> u64 {
        self.eating.sample(&mut self.rng)
    }

    /// Configured reach time for one fork, in milliseconds.
    pub fn latency_ms(&self) -> u64 {
        self.latency
    }

    /// Seat index.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PhilosopherState {
        self.state
    }

    /// Whether the left fork is held.
    pub fn has_left(&self) -> bool {
        self.has_left
    }

    /// Whether the right fork is held.
    pub fn has_right(&self) -> bool {
        self.has_right
    }

    /// Meals completed so far.
    pub fn eaten_count(&self) -> u64 {
        self.eaten_count
    }

    /// Total time spent hungry across completed waits, in milliseconds.
    pub fn total_hungry_ms(&self) -> u64 {
        self.total_hungry_ms
    }

    /// Most recent strategy decision.
    pub fn last_action(&self) -> Action {
        self.last_action
    }

    /// Id of the left fork.
    pub fn left_id(&self) -> usize {
        self.left.id()
    }

    /// Id of the right fork.
    pub fn right_id(&self) -> usize {
        self.right.id()
    }

    /// Snapshot for display and assertions.
    pub fn view(&self) -> PhilosopherView {
        PhilosopherView {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            has_left: self.has_left,
            has_right: self.has_right,
            eaten_count: self.eaten_count,
            action: self.last_action,
        }
    }

    /// The (state, holds-left, holds-right) triple the deadlock detector
    /// scans for the all-stuck signature.
    pub fn hold_signature(&self) -> (PhilosopherState, bool, bool) {
        (self.state, self.has_left, self.has_right)
    }

    fn publish_self(&self) {
        self.journal.record_philosopher(PhilosopherRecord {
            philosopher: self.id,
            name: self.name.clone(),
            timestamp_ms: self.clock.now_ms(),
            state: self.state,
            has_left: self.has_left,
            has_right: self.has_right,
            eaten_count: self.eaten_count,
            action: self.last_action,
        });
    }

    fn publish_fork(&self, fork: &Fork) {
        let view = fork.view();
        let owner_name = (view.owner == Some(self.id)).then(|| self.name.clone());
        self.journal.record_fork(ForkRecord {
            fork: view.id,
            timestamp_ms: self.clock.now_ms(),
            state: view.state,
            owner: view.owner,
            owner_name,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_names, DurationRange, SimulationConfig};
    use crate::context::VirtualClock;
    use crate::strategy::StrategyKind;

    fn fixed_config(kind: StrategyKind) -> SimulationConfig {
        SimulationConfig {
            names: default_names(2),
            strategy: kind,
            thinking: DurationRange::new(3, 3),
            eating: DurationRange::new(2, 2),
            acquisition_latency: 2,
            seed: Some(7),
        }
    }

    fn solo_setup(
        strategy: Strategy,
        config: &SimulationConfig,
    ) -> (Philosopher, Arc<Fork>, Arc<Fork>, Arc<VirtualClock>) {
        let clock = Arc::new(VirtualClock::new());
        let ctx = RunContext::new(clock.clone(), 1);
        let left = Arc::new(Fork::new(0, clock.clone()));
        let right = Arc::new(Fork::new(1, clock.clone()));
        let philosopher = Philosopher::new(
            0,
            "Solo",
            strategy,
            left.clone(),
            right.clone(),
            None,
            &ctx,
            config,
        );
        (philosopher, left, right, clock)
    }

    #[test]
    fn test_thinking_phase_lasts_its_planned_duration() {
        let config = fixed_config(StrategyKind::Greedy);
        let (mut p, _, _, _) = solo_setup(Strategy::Greedy, &config);

        p.step();
        p.step();
        assert_eq!(p.state(), PhilosopherState::Thinking);
        p.step();
        assert_eq!(p.state(), PhilosopherState::Hungry);
    }

    #[test]
    fn test_take_lands_after_decides_plus_latency() {
        let config = fixed_config(StrategyKind::Greedy);
        let (mut p, left, _, _) = solo_setup(Strategy::Greedy, &config);

        for _ in 0..3 {
            p.step();
        }
        assert_eq!(p.state(), PhilosopherState::Hungry);

        // Decide round arms the take; latency 2 means two countdown rounds.
        p.step();
        assert!(!p.has_left());
        p.step();
        assert!(!p.has_left());
        p.step();
        assert!(p.has_left());
        assert_eq!(left.view().owner, Some(0));
    }

    #[test]
    fn test_full_cycle_eats_once_and_releases_forks() {
        let config = fixed_config(StrategyKind::Greedy);
        let (mut p, left, right, _) = solo_setup(Strategy::Greedy, &config);

        // 3 thinking + (1+2) left + (1+2) right + 1 begin eating.
        for _ in 0..10 {
            p.step();
        }
        assert_eq!(p.state(), PhilosopherState::Eating);
        assert!(p.has_left() && p.has_right());

        // Eating lasts 2 rounds, then the meal is banked and forks returned.
        p.step();
        assert_eq!(p.state(), PhilosopherState::Eating);
        p.step();
        assert_eq!(p.state(), PhilosopherState::Thinking);
        assert_eq!(p.eaten_count(), 1);
        assert!(!p.has_left() && !p.has_right());
        assert!(left.view().is_available());
        assert!(right.view().is_available());
    }

    #[test]
    fn test_waiting_time_covers_hungry_to_eating_span() {
        let config = fixed_config(StrategyKind::Greedy);
        let (mut p, _, _, clock) = solo_setup(Strategy::Greedy, &config);

        // Drive like the stepped runner: advance the clock, then step.
        for _ in 0..10 {
            clock.advance(1);
            p.step();
        }
        assert_eq!(p.state(), PhilosopherState::Eating);
        // Hungry at t=3, eating at t=10.
        assert_eq!(p.total_hungry_ms(), 7);
    }

    #[test]
    fn test_blocked_neighbor_keeps_philosopher_hungry_with_left() {
        let config = fixed_config(StrategyKind::Greedy);
        let (mut p, _, right, _) = solo_setup(Strategy::Greedy, &config);
        assert!(right.try_take(99));

        for _ in 0..20 {
            p.step();
        }
        assert_eq!(p.state(), PhilosopherState::Hungry);
        assert!(p.has_left());
        assert!(!p.has_right());
        assert_eq!(p.eaten_count(), 0);
    }

    #[test]
    fn test_failed_grab_retries_on_a_later_round() {
        let config = fixed_config(StrategyKind::Greedy);
        let (mut p, left, _, _) = solo_setup(Strategy::Greedy, &config);

        for _ in 0..4 {
            p.step();
        }
        // Take is armed; the neighbor snatches the fork mid-reach.
        assert!(left.try_take(99));
        p.step();
        p.step();
        assert!(!p.has_left());

        // Fork comes back; the next decide re-arms and the grab lands.
        left.release();
        for _ in 0..3 {
            p.step();
        }
        assert!(p.has_left());
    }

    #[test]
    fn test_release_both_with_nothing_held_is_a_no_op() {
        let config = fixed_config(StrategyKind::Greedy);
        let (mut p, left, right, _) = solo_setup(Strategy::Greedy, &config);

        p.release_both();
        assert!(!p.has_left() && !p.has_right());
        assert!(left.view().is_available());
        assert!(right.view().is_available());
    }

    #[test]
    fn test_coordinated_cycle_returns_forks_to_arbiter() {
        let config = fixed_config(StrategyKind::Coordinated);
        let clock = Arc::new(VirtualClock::new());
        let ctx = RunContext::new(clock.clone(), 2);
        let arbiter = Arc::new(Coordinator::new(2));
        let left = Arc::new(Fork::new(0, clock.clone()));
        let right = Arc::new(Fork::new(1, clock.clone()));
        let mut p = Philosopher::new(
            0,
            "Aristotle",
            Strategy::Coordinated {
                grants: arbiter.grant_slot(0),
            },
            left,
            right,
            Some(arbiter.clone()),
            &ctx,
            &config,
        );

        for _ in 0..3 {
            p.step();
        }
        assert_eq!(p.state(), PhilosopherState::Hungry);
        assert_eq!(arbiter.waiting(), vec![0]);

        // The arbiter reserves the pair and deposits the grant.
        arbiter.step();
        assert!(arbiter.available_forks().is_empty());

        // Grant → left (1+2), direct right (1+2), begin eating (1).
        for _ in 0..7 {
            p.step();
        }
        assert_eq!(p.state(), PhilosopherState::Eating);

        // Finishing the meal hands both fork ids back.
        p.step();
        p.step();
        assert_eq!(p.state(), PhilosopherState::Thinking);
        assert_eq!(p.eaten_count(), 1);
        assert!(arbiter.waiting().is_empty());
        assert_eq!(arbiter.available_forks(), vec![0, 1]);
    }
}
