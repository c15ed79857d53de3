//! Append-mostly journal of state transitions, with snapshot queries.
//!
//! Every philosopher and fork transition lands here as a timestamped record.
//! Per-entity histories are kept sorted by timestamp; a record arriving with
//! an already-seen timestamp is inserted *after* its equals, so a snapshot
//! query at that instant answers with the last write. Under the threaded
//! model records can arrive out of order (tasks race between stamping and
//! recording), which the sorted insert absorbs.
//!
//! The whole journal serializes to JSON for offline timeline analysis.

use crate::context::Clock;
use crate::fork::ForkState;
use crate::philosopher::PhilosopherState;
use crate::strategy::{Action, StrategyKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// One philosopher transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhilosopherRecord {
    /// Seat index.
    pub philosopher: usize,
    /// Display name.
    pub name: String,
    /// Clock reading when the transition was published.
    pub timestamp_ms: u64,
    /// Lifecycle state after the transition.
    pub state: PhilosopherState,
    /// Left-fork hold after the transition.
    pub has_left: bool,
    /// Right-fork hold after the transition.
    pub has_right: bool,
    /// Meals completed so far.
    pub eaten_count: u64,
    /// Most recent strategy decision.
    pub action: Action,
}

/// One fork transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkRecord {
    /// Fork id.
    pub fork: usize,
    /// Clock reading when the transition was published.
    pub timestamp_ms: u64,
    /// Ownership state after the transition.
    pub state: ForkState,
    /// Holder id, if any.
    pub owner: Option<usize>,
    /// Holder name, if the publisher was the holder.
    pub owner_name: Option<String>,
}

/// Start/end bracket of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMarkers {
    /// Strategy the run was played under.
    pub strategy: String,
    /// Number of seats.
    pub philosophers: usize,
    /// Clock reading when the run started.
    pub started_at_ms: u64,
    /// Clock reading when the run completed, if it has.
    pub ended_at_ms: Option<u64>,
}

#[derive(Debug, Default)]
struct JournalInner {
    run: Option<RunMarkers>,
    philosophers: BTreeMap<usize, Vec<PhilosopherRecord>>,
    forks: BTreeMap<usize, Vec<ForkRecord>>,
}

/// Shared transition journal for one run.
pub struct StateJournal {
    clock: Arc<dyn Clock>,
    inner: Mutex<JournalInner>,
}

impl StateJournal {
    /// Creates an empty journal stamping run markers from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(JournalInner::default()),
        }
    }

    /// Marks the run as started.
    pub fn begin_run(&self, strategy: StrategyKind, philosophers: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.run = Some(RunMarkers {
            strategy: strategy.name().to_string(),
            philosophers,
            started_at_ms: self.clock.now_ms(),
            ended_at_ms: None,
        });
    }

    /// Marks the run as completed.
    pub fn complete(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(run) = inner.run.as_mut() {
            run.ended_at_ms = Some(self.clock.now_ms());
        }
    }

    /// Files a philosopher transition into its sorted history.
    pub fn record_philosopher(&self, record: PhilosopherRecord) {
        let mut inner = self.inner.lock().unwrap();
        let records = inner.philosophers.entry(record.philosopher).or_default();
        let idx = records.partition_point(|r| r.timestamp_ms <= record.timestamp_ms);
        records.insert(idx, record);
    }

    /// Files a fork transition into its sorted history.
    pub fn record_fork(&self, record: ForkRecord) {
        let mut inner = self.inner.lock().unwrap();
        let records = inner.forks.entry(record.fork).or_default();
        let idx = records.partition_point(|r| r.timestamp_ms <= record.timestamp_ms);
        records.insert(idx, record);
    }

    /// The philosopher's last recorded state at or before `at_ms`, or `None`
    /// when nothing had been recorded yet.
    pub fn philosopher_at(&self, philosopher: usize, at_ms: u64) -> Option<PhilosopherRecord> {
        let inner = self.inner.lock().unwrap();
        let records = inner.philosophers.get(&philosopher)?;
        let idx = records.partition_point(|r| r.timestamp_ms <= at_ms);
        if idx == 0 {
            None
        } else {
            Some(records[idx - 1].clone())
        }
    }

    /// The fork's last recorded state at or before `at_ms`.
    pub fn fork_at(&self, fork: usize, at_ms: u64) -> Option<ForkRecord> {
        let inner = self.inner.lock().unwrap();
        let records = inner.forks.get(&fork)?;
        let idx = records.partition_point(|r| r.timestamp_ms <= at_ms);
        if idx == 0 {
            None
        } else {
            Some(records[idx - 1].clone())
        }
    }

    /// Current run bracket, if a run was started.
    pub fn run_markers(&self) -> Option<RunMarkers> {
        self.inner.lock().unwrap().run.clone()
    }

    /// Flattens the journal into a single export, globally ordered by
    /// timestamp (entity id breaking ties).
    pub fn export(&self) -> RunExport {
        let inner = self.inner.lock().unwrap();
        let mut philosophers: Vec<PhilosopherRecord> =
            inner.philosophers.values().flatten().cloned().collect();
        philosophers.sort_by_key(|r| (r.timestamp_ms, r.philosopher));
        let mut forks: Vec<ForkRecord> = inner.forks.values().flatten().cloned().collect();
        forks.sort_by_key(|r| (r.timestamp_ms, r.fork));
        RunExport {
            run: inner.run.clone(),
            philosophers,
            forks,
        }
    }
}

/// Serializable dump of one whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Run bracket, if a run was started.
    pub run: Option<RunMarkers>,
    /// All philosopher transitions in timestamp order.
    pub philosophers: Vec<PhilosopherRecord>,
    /// All fork transitions in timestamp order.
    pub forks: Vec<ForkRecord>,
}

impl RunExport {
    /// Writes the export as pretty JSON.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VirtualClock;

    fn journal() -> StateJournal {
        StateJournal::new(Arc::new(VirtualClock::new()))
    }

    fn ph_record(id: usize, ts: u64, eaten: u64) -> PhilosopherRecord {
        PhilosopherRecord {
            philosopher: id,
            name: format!("P{id}"),
            timestamp_ms: ts,
            state: PhilosopherState::Thinking,
            has_left: false,
            has_right: false,
            eaten_count: eaten,
            action: Action::None,
        }
    }

    fn fork_record(id: usize, ts: u64, owner: Option<usize>) -> ForkRecord {
        ForkRecord {
            fork: id,
            timestamp_ms: ts,
            state: if owner.is_some() {
                ForkState::InUse
            } else {
                ForkState::Available
            },
            owner,
            owner_name: None,
        }
    }

    #[test]
    fn test_snapshot_answers_with_last_record_at_or_before() {
        let journal = journal();
        journal.record_philosopher(ph_record(0, 5, 0));
        journal.record_philosopher(ph_record(0, 10, 1));

        assert_eq!(journal.philosopher_at(0, 7).map(|r| r.timestamp_ms), Some(5));
        assert_eq!(journal.philosopher_at(0, 10).map(|r| r.eaten_count), Some(1));
        assert_eq!(journal.philosopher_at(0, 99).map(|r| r.eaten_count), Some(1));
    }

    #[test]
    fn test_query_before_first_record_is_none() {
        let journal = journal();
        journal.record_philosopher(ph_record(0, 5, 0));

        assert!(journal.philosopher_at(0, 4).is_none());
        assert!(journal.philosopher_at(3, 100).is_none());
        assert!(journal.fork_at(0, 100).is_none());
    }

    #[test]
    fn test_same_timestamp_keeps_the_later_write() {
        let journal = journal();
        journal.record_philosopher(ph_record(1, 8, 2));
        journal.record_philosopher(ph_record(1, 8, 3));

        assert_eq!(journal.philosopher_at(1, 8).map(|r| r.eaten_count), Some(3));
    }

    #[test]
    fn test_out_of_order_arrival_lands_sorted() {
        let journal = journal();
        journal.record_fork(fork_record(2, 10, Some(1)));
        journal.record_fork(fork_record(2, 4, None));

        assert_eq!(journal.fork_at(2, 6).map(|r| r.timestamp_ms), Some(4));
        assert_eq!(journal.fork_at(2, 10).map(|r| r.owner), Some(Some(1)));
    }

    #[test]
    fn test_run_markers_bracket_the_run() {
        let clock = Arc::new(VirtualClock::new());
        let journal = StateJournal::new(clock.clone());

        clock.advance(3);
        journal.begin_run(StrategyKind::Hierarchy, 5);
        let open = journal.run_markers().unwrap();
        assert_eq!(open.strategy, "hierarchy");
        assert_eq!(open.philosophers, 5);
        assert_eq!(open.started_at_ms, 3);
        assert_eq!(open.ended_at_ms, None);

        clock.advance(40);
        journal.complete();
        assert_eq!(journal.run_markers().unwrap().ended_at_ms, Some(43));
    }

    #[test]
    fn test_export_is_globally_ordered_and_round_trips() {
        let journal = journal();
        journal.record_philosopher(ph_record(1, 9, 0));
        journal.record_philosopher(ph_record(0, 2, 0));
        journal.record_fork(fork_record(0, 5, Some(0)));
        journal.begin_run(StrategyKind::Greedy, 2);

        let export = journal.export();
        let stamps: Vec<u64> = export.philosophers.iter().map(|r| r.timestamp_ms).collect();
        assert_eq!(stamps, vec![2, 9]);

        let json = serde_json::to_string(&export).unwrap();
        let parsed: RunExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.philosophers.len(), 2);
        assert_eq!(parsed.forks.len(), 1);
        assert_eq!(parsed.run.unwrap().strategy, "greedy");
    }
}
