// crates/server-jobs/src/table.rs
//! Job table: every tracked job, the pending queue and the active set behind
//! one coarse lock.
//!
//! All state transitions live here as plain methods on `TableState` so they
//! stay atomic with respect to each other. The lock is only held for map
//! and heap updates; generators never run under it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::control::JobControl;
use crate::queue::PriorityQueue;
use crate::types::{FailureKind, JobEvent, JobId, JobSnapshot, JobState, Priority, QueueStats};

pub(crate) struct JobEntry {
    id: JobId,
    priority: Priority,
    sequence: u64,
    state: JobState,
    progress: u8,
    payload: Value,
    result: Option<Value>,
    error_message: Option<String>,
    error_kind: Option<FailureKind>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    /// Present only while Processing/Paused.
    control: Option<JobControl>,
    cancel_requested: bool,
}

impl JobEntry {
    fn new(id: JobId, priority: Priority, sequence: u64, payload: Value) -> Self {
        Self {
            id,
            priority,
            sequence,
            state: JobState::Queued,
            progress: 0,
            payload,
            result: None,
            error_message: None,
            error_kind: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            control: None,
            cancel_requested: false,
        }
    }

    pub(crate) fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            priority: self.priority,
            state: self.state,
            progress: self.progress,
            payload: self.payload.clone(),
            result: self.result.clone(),
            error_message: self.error_message.clone(),
            error_kind: self.error_kind,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }

    pub(crate) fn event(&self) -> JobEvent {
        JobEvent {
            job_id: self.id.clone(),
            state: self.state,
            progress: self.progress,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// How a runner finished.
#[derive(Debug)]
pub(crate) enum Outcome {
    Completed(Value),
    Failed { kind: FailureKind, message: String },
    Cancelled,
}

impl Outcome {
    pub(crate) fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }
}

/// Result of a runner checkpoint.
#[derive(Debug)]
pub(crate) enum Advance {
    /// Job is Processing; carries an event if progress moved.
    Proceed(Option<JobEvent>),
    Paused,
    /// Job vanished or is no longer active.
    Gone,
}

#[derive(Debug)]
pub(crate) enum CancelOutcome {
    /// Queued job removed and marked Cancelled.
    Cancelled(JobEvent),
    /// Running job signalled; its runner will finish the transition.
    Signalled(JobEvent),
    Rejected,
}

/// Result of trying to record a runner's outcome.
#[derive(Debug)]
pub(crate) enum Settle {
    /// Outcome written; `None` if the job was already terminal or gone.
    Recorded(Option<JobSnapshot>),
    /// Job is Paused; the outcome is handed back until it is resumed.
    Held(Outcome),
}

/// Dispatch ticket for a job moving from Queued to Processing.
pub(crate) struct Started {
    pub(crate) id: JobId,
    pub(crate) priority: Priority,
    pub(crate) payload: Value,
    pub(crate) event: JobEvent,
}

#[derive(Default)]
pub(crate) struct TableState {
    jobs: HashMap<JobId, JobEntry>,
    queue: PriorityQueue,
    active: HashSet<JobId>,
    next_sequence: u64,
}

impl TableState {
    pub(crate) fn enqueue(&mut self, payload: Value, priority: Priority) -> (JobId, JobEvent) {
        let id = loop {
            let id = JobId::generate();
            if !self.jobs.contains_key(&id) {
                break id;
            }
        };
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let entry = JobEntry::new(id.clone(), priority, sequence, payload);
        let event = entry.event();
        self.queue.push(priority, sequence, id.clone());
        self.jobs.insert(id.clone(), entry);
        (id, event)
    }

    pub(crate) fn has_queued(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Pop the best queued job and mark it Processing under `control`.
    pub(crate) fn start_next(&mut self, control: JobControl) -> Option<Started> {
        while let Some(id) = self.queue.pop() {
            let Some(entry) = self.jobs.get_mut(&id) else {
                continue;
            };
            if entry.state != JobState::Queued {
                continue;
            }
            entry.state = JobState::Processing;
            entry.started_at = Some(Utc::now());
            entry.control = Some(control);
            self.active.insert(id.clone());
            return Some(Started {
                priority: entry.priority,
                payload: entry.payload.clone(),
                event: entry.event(),
                id,
            });
        }
        None
    }

    /// Checkpoint bookkeeping: raise progress if Processing, report Paused.
    pub(crate) fn advance(&mut self, id: &str, progress: Option<u8>) -> Advance {
        let Some(entry) = self.jobs.get_mut(id) else {
            return Advance::Gone;
        };
        match entry.state {
            JobState::Processing => {
                let event = match progress.map(|p| p.min(100)) {
                    Some(p) if p > entry.progress => {
                        entry.progress = p;
                        Some(entry.event())
                    }
                    _ => None,
                };
                Advance::Proceed(event)
            }
            JobState::Paused => Advance::Paused,
            _ => Advance::Gone,
        }
    }

    pub(crate) fn pause(&mut self, id: &str) -> Option<JobEvent> {
        let entry = self.jobs.get_mut(id)?;
        if entry.state != JobState::Processing || entry.cancel_requested {
            return None;
        }
        let control = entry.control.as_ref()?;
        control.set_paused(true);
        entry.state = JobState::Paused;
        Some(entry.event())
    }

    pub(crate) fn resume(&mut self, id: &str) -> Option<JobEvent> {
        let entry = self.jobs.get_mut(id)?;
        if entry.state != JobState::Paused {
            return None;
        }
        let control = entry.control.as_ref()?;
        control.set_paused(false);
        entry.state = JobState::Processing;
        Some(entry.event())
    }

    pub(crate) fn cancel(&mut self, id: &str) -> CancelOutcome {
        let Some(entry) = self.jobs.get_mut(id) else {
            return CancelOutcome::Rejected;
        };
        match entry.state {
            JobState::Queued => {
                self.queue.remove(id);
                entry.state = JobState::Cancelled;
                entry.completed_at = Some(Utc::now());
                CancelOutcome::Cancelled(entry.event())
            }
            JobState::Processing | JobState::Paused => {
                entry.cancel_requested = true;
                // Logically un-paused; the runner reports Cancelled once it
                // reaches its next checkpoint.
                entry.state = JobState::Processing;
                if let Some(control) = &entry.control {
                    control.request_cancel();
                }
                CancelOutcome::Signalled(entry.event())
            }
            _ => CancelOutcome::Rejected,
        }
    }

    /// Signal cancellation to every running job.
    pub(crate) fn cancel_active(&mut self) -> Vec<JobEvent> {
        let ids: Vec<JobId> = self.active.iter().cloned().collect();
        ids.iter()
            .filter_map(|id| match self.cancel(id) {
                CancelOutcome::Signalled(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    /// Record the runner's outcome unless the job is Paused. A pending cancel
    /// turns any outcome into Cancelled.
    pub(crate) fn settle(&mut self, id: &str, outcome: Outcome) -> Settle {
        let (paused, cancel_requested) = match self.jobs.get(id) {
            Some(entry) => (entry.state == JobState::Paused, entry.cancel_requested),
            None => (false, false),
        };
        if paused {
            return Settle::Held(outcome);
        }
        let outcome = if cancel_requested {
            Outcome::Cancelled
        } else {
            outcome
        };
        Settle::Recorded(self.finish(id, outcome))
    }

    /// Record the runner's outcome. Terminal states are never overwritten.
    pub(crate) fn finish(&mut self, id: &str, outcome: Outcome) -> Option<JobSnapshot> {
        self.active.remove(id);
        let entry = self.jobs.get_mut(id)?;
        if entry.state.is_terminal() {
            return None;
        }
        entry.control = None;
        entry.completed_at = Some(Utc::now());
        match outcome {
            Outcome::Completed(result) => {
                entry.state = JobState::Completed;
                entry.progress = 100;
                entry.result = Some(result);
            }
            Outcome::Failed { kind, message } => {
                entry.state = JobState::Failed;
                entry.error_kind = Some(kind);
                entry.error_message = Some(message);
            }
            Outcome::Cancelled => {
                entry.state = JobState::Cancelled;
            }
        }
        Some(entry.snapshot())
    }

    /// Drop every terminal job. Returns how many were removed.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, entry| !entry.state.is_terminal());
        before - self.jobs.len()
    }

    pub(crate) fn stats(&self, max_concurrent: usize) -> QueueStats {
        QueueStats {
            queued_count: self.queue.len(),
            active_count: self.active.len(),
            max_concurrent,
            total_tracked: self.jobs.len(),
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&JobEntry> {
        self.jobs.get(id)
    }

    fn snapshots_where(&self, keep: impl Fn(&JobEntry) -> bool) -> Vec<JobSnapshot> {
        let mut entries: Vec<&JobEntry> = self.jobs.values().filter(|e| keep(e)).collect();
        entries.sort_by_key(|e| e.sequence);
        entries.into_iter().map(JobEntry::snapshot).collect()
    }
}

/// Owner of all job records for one scheduler.
///
/// Created by the caller and handed to `TaskManager::with_table`, or created
/// implicitly by `TaskManager::new`. A table serves a single manager.
#[derive(Default)]
pub struct JobTable {
    state: Mutex<TableState>,
    attached: AtomicBool,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::error!("job table mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Claim the table for a scheduler. False if already claimed.
    pub(crate) fn attach(&self) -> bool {
        !self.attached.swap(true, Ordering::SeqCst)
    }

    /// Snapshot of one job.
    pub fn get(&self, id: &str) -> Option<JobSnapshot> {
        self.lock().get(id).map(JobEntry::snapshot)
    }

    /// All jobs in submission order.
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.lock().snapshots_where(|_| true)
    }

    /// Processing and Paused jobs in submission order.
    pub fn active_snapshots(&self) -> Vec<JobSnapshot> {
        self.lock().snapshots_where(|e| e.state.is_active())
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn start(state: &mut TableState) -> Started {
        state.start_next(JobControl::new()).expect("a queued job")
    }

    #[test]
    fn test_enqueue_and_start_in_priority_order() {
        let mut state = TableState::default();
        let (low, ev) = state.enqueue(json!({"n": 1}), Priority::Low);
        assert_eq!(ev.state, JobState::Queued);
        let (critical, _) = state.enqueue(json!({"n": 2}), Priority::Critical);

        let first = start(&mut state);
        assert_eq!(first.id, critical);
        assert_eq!(first.payload, json!({"n": 2}));
        assert_eq!(first.event.state, JobState::Processing);

        let stats = state.stats(3);
        assert_eq!(stats.queued_count, 1);
        assert_eq!(stats.active_count, 1);
        assert_eq!(stats.total_tracked, 2);

        assert_eq!(start(&mut state).id, low);
        assert!(state.start_next(JobControl::new()).is_none());
    }

    #[test]
    fn test_cancel_queued_is_immediate() {
        let mut state = TableState::default();
        let (id, _) = state.enqueue(json!({}), Priority::Normal);

        assert!(matches!(state.cancel(&id), CancelOutcome::Cancelled(_)));
        assert_eq!(state.get(&id).unwrap().state, JobState::Cancelled);
        assert!(state.get(&id).unwrap().completed_at.is_some());
        assert!(!state.has_queued());
        assert!(matches!(state.cancel(&id), CancelOutcome::Rejected));
        assert!(matches!(state.cancel("task-unknown"), CancelOutcome::Rejected));
    }

    #[test]
    fn test_pause_resume_transitions() {
        let mut state = TableState::default();
        let (id, _) = state.enqueue(json!({}), Priority::Normal);

        assert!(state.pause(&id).is_none(), "queued jobs cannot pause");
        assert!(state.resume(&id).is_none());

        start(&mut state);
        assert_eq!(state.pause(&id).unwrap().state, JobState::Paused);
        assert!(state.pause(&id).is_none());
        assert!(matches!(state.advance(&id, Some(50)), Advance::Paused));
        assert_eq!(state.get(&id).unwrap().progress, 0);

        assert_eq!(state.resume(&id).unwrap().state, JobState::Processing);
        assert!(state.resume(&id).is_none());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut state = TableState::default();
        let (id, _) = state.enqueue(json!({}), Priority::Normal);
        start(&mut state);

        assert!(matches!(state.advance(&id, Some(30)), Advance::Proceed(Some(_))));
        assert!(matches!(state.advance(&id, Some(20)), Advance::Proceed(None)));
        assert!(matches!(state.advance(&id, None), Advance::Proceed(None)));
        assert!(matches!(state.advance(&id, Some(250)), Advance::Proceed(Some(_))));
        assert_eq!(state.get(&id).unwrap().progress, 100);
        assert!(matches!(state.advance("task-unknown", Some(10)), Advance::Gone));
    }

    #[test]
    fn test_cancel_paused_unpauses() {
        let mut state = TableState::default();
        let (id, _) = state.enqueue(json!({}), Priority::Normal);
        start(&mut state);
        state.pause(&id).unwrap();

        assert!(matches!(state.cancel(&id), CancelOutcome::Signalled(_)));
        let entry = state.get(&id).unwrap();
        assert_eq!(entry.state, JobState::Processing);
        assert!(entry.cancel_requested);
        assert!(state.pause(&id).is_none(), "cancelling jobs cannot pause");
    }

    #[test]
    fn test_finish_is_write_once() {
        let mut state = TableState::default();
        let (id, _) = state.enqueue(json!({}), Priority::Normal);
        start(&mut state);

        let snap = state.finish(&id, Outcome::Completed(json!({"ok": true}))).unwrap();
        assert_eq!(snap.state, JobState::Completed);
        assert_eq!(snap.progress, 100);
        assert_eq!(snap.result, Some(json!({"ok": true})));
        assert!(state.get(&id).unwrap().control.is_none());
        assert_eq!(state.stats(3).active_count, 0);

        assert!(state
            .finish(&id, Outcome::failed(FailureKind::Generator, "late"))
            .is_none());
        assert!(matches!(state.cancel(&id), CancelOutcome::Rejected));
        assert!(state.pause(&id).is_none());
        assert_eq!(state.get(&id).unwrap().snapshot(), snap);
    }

    #[test]
    fn test_settle_holds_paused_outcome() {
        let mut state = TableState::default();
        let (id, _) = state.enqueue(json!({}), Priority::Normal);
        start(&mut state);
        assert!(state.pause(&id).is_some());

        let held = match state.settle(&id, Outcome::Completed(json!({"ok": true}))) {
            Settle::Held(outcome) => outcome,
            other => panic!("expected Held, got {other:?}"),
        };
        assert_eq!(state.get(&id).unwrap().state, JobState::Paused);
        assert_eq!(state.stats(3).active_count, 1);

        assert!(state.resume(&id).is_some());
        match state.settle(&id, held) {
            Settle::Recorded(Some(snap)) => assert_eq!(snap.state, JobState::Completed),
            other => panic!("expected Recorded, got {other:?}"),
        }
    }

    #[test]
    fn test_settle_after_cancel_records_cancelled() {
        let mut state = TableState::default();
        let (id, _) = state.enqueue(json!({}), Priority::Normal);
        start(&mut state);
        assert!(matches!(state.cancel(&id), CancelOutcome::Signalled(_)));

        match state.settle(&id, Outcome::Completed(json!({"ok": true}))) {
            Settle::Recorded(Some(snap)) => {
                assert_eq!(snap.state, JobState::Cancelled);
                assert!(snap.result.is_none());
            }
            other => panic!("expected Recorded, got {other:?}"),
        }
        // Once settled, pause and cancel are refused.
        assert!(state.pause(&id).is_none());
        assert!(matches!(state.cancel(&id), CancelOutcome::Rejected));
    }

    #[test]
    fn test_settle_paused_then_cancelled() {
        let mut state = TableState::default();
        let (id, _) = state.enqueue(json!({}), Priority::Normal);
        start(&mut state);
        state.pause(&id);
        let held = match state.settle(&id, Outcome::Completed(json!(1))) {
            Settle::Held(outcome) => outcome,
            other => panic!("expected Held, got {other:?}"),
        };

        state.cancel(&id);
        match state.settle(&id, held) {
            Settle::Recorded(Some(snap)) => assert_eq!(snap.state, JobState::Cancelled),
            other => panic!("expected Recorded, got {other:?}"),
        }
    }

    #[test]
    fn test_sweep_removes_only_terminal() {
        let mut state = TableState::default();
        let (done, _) = state.enqueue(json!({}), Priority::High);
        let (running, _) = state.enqueue(json!({}), Priority::Normal);
        let (queued, _) = state.enqueue(json!({}), Priority::Low);
        start(&mut state);
        state.finish(&done, Outcome::Completed(json!(null)));
        start(&mut state);

        assert_eq!(state.sweep(), 1);
        assert!(state.get(&done).is_none());
        assert_eq!(state.get(&running).unwrap().state, JobState::Processing);
        assert_eq!(state.get(&queued).unwrap().state, JobState::Queued);
        assert_eq!(state.sweep(), 0);
    }

    #[test]
    fn test_cancel_active_signals_running_only() {
        let mut state = TableState::default();
        let (a, _) = state.enqueue(json!({}), Priority::Normal);
        let (b, _) = state.enqueue(json!({}), Priority::Normal);
        start(&mut state);

        let events = state.cancel_active();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].job_id, a);
        assert_eq!(state.get(&b).unwrap().state, JobState::Queued);
    }

    #[test]
    fn test_table_attach_once() {
        let table = JobTable::new();
        assert!(table.attach());
        assert!(!table.attach());
        assert!(table.is_empty());
    }
}
