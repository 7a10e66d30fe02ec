// crates/server-jobs/src/manager.rs
//! Task manager: the public face of the scheduler.

use std::sync::Arc;
use std::time::Duration;

use pixelforge_core::Generator;
use serde_json::Value;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::dispatcher;
use crate::error::SchedulerError;
use crate::metrics;
use crate::slots::SlotController;
use crate::table::{Advance, CancelOutcome, JobTable, Outcome, Settle};
use crate::types::{JobEvent, JobId, JobSnapshot, JobState, Priority, QueueStats};

/// State shared by the manager, the dispatcher and every runner.
pub(crate) struct Shared {
    pub(crate) table: Arc<JobTable>,
    pub(crate) slots: SlotController,
    pub(crate) generator: Arc<dyn Generator>,
    pub(crate) config: SchedulerConfig,
    pub(crate) wake: Arc<Notify>,
    pub(crate) events: broadcast::Sender<JobEvent>,
    pub(crate) shutdown: CancellationToken,
}

impl Shared {
    pub(crate) fn emit(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn advance(&self, id: &str, progress: Option<u8>) -> Advance {
        let advance = self.table.lock().advance(id, progress);
        if let Advance::Proceed(Some(event)) = &advance {
            tracing::trace!(job_id = %id, progress = event.progress, "job progress");
            self.emit(event.clone());
        }
        advance
    }

    /// Record an outcome unless the job is Paused, in which case the outcome
    /// is handed back and the runner must wait for resume and retry.
    pub(crate) fn settle(&self, id: &str, outcome: Outcome, run_time: Duration) -> Option<Outcome> {
        let (settled, stats) = {
            let mut state = self.table.lock();
            let settled = state.settle(id, outcome);
            (settled, state.stats(self.slots.max()))
        };
        match settled {
            Settle::Held(outcome) => {
                tracing::debug!(job_id = %id, "outcome held while paused");
                Some(outcome)
            }
            Settle::Recorded(snapshot) => {
                self.report(id, snapshot, &stats, run_time);
                None
            }
        }
    }

    /// Record an outcome regardless of pause state.
    pub(crate) fn finish(&self, id: &str, outcome: Outcome, run_time: Duration) {
        let (snapshot, stats) = {
            let mut state = self.table.lock();
            let snapshot = state.finish(id, outcome);
            (snapshot, state.stats(self.slots.max()))
        };
        self.report(id, snapshot, &stats, run_time);
    }

    fn report(
        &self,
        id: &str,
        snapshot: Option<JobSnapshot>,
        stats: &QueueStats,
        run_time: Duration,
    ) {
        metrics::record_depth(stats);

        let Some(snapshot) = snapshot else {
            tracing::warn!(job_id = %id, "runner finished a job that was already terminal");
            return;
        };
        self.emit(JobEvent {
            job_id: snapshot.id.clone(),
            state: snapshot.state,
            progress: snapshot.progress,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        metrics::record_finished(snapshot.state, Some(run_time));

        match &snapshot.error_message {
            Some(error) => tracing::warn!(
                job_id = %id,
                kind = ?snapshot.error_kind,
                error = %error,
                run_ms = run_time.as_millis() as u64,
                "job failed"
            ),
            None => tracing::info!(
                job_id = %id,
                state = %snapshot.state,
                run_ms = run_time.as_millis() as u64,
                "job finished"
            ),
        }
    }

    fn sweep(&self) -> usize {
        let (removed, stats) = {
            let mut state = self.table.lock();
            let removed = state.sweep();
            (removed, state.stats(self.slots.max()))
        };
        if removed > 0 {
            tracing::debug!(removed, remaining = stats.total_tracked, "swept finished jobs");
        }
        removed
    }
}

/// Priority scheduler for long-running generation jobs.
///
/// Thread-safe; share it behind an `Arc`. Must be created inside a tokio
/// runtime. Dropping the manager shuts it down.
pub struct TaskManager {
    shared: Arc<Shared>,
}

impl TaskManager {
    /// Create a scheduler with its own job table.
    pub fn new(
        config: SchedulerConfig,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, SchedulerError> {
        Self::with_table(Arc::new(JobTable::new()), config, generator)
    }

    /// Create a scheduler over a caller-owned job table.
    pub fn with_table(
        table: Arc<JobTable>,
        config: SchedulerConfig,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        if !table.attach() {
            return Err(SchedulerError::TableInUse);
        }

        let wake = Arc::new(Notify::new());
        let (events, _) = broadcast::channel(config.event_capacity);
        let shared = Arc::new(Shared {
            table,
            slots: SlotController::new(config.max_concurrent, Arc::clone(&wake)),
            generator,
            config,
            wake,
            events,
            shutdown: CancellationToken::new(),
        });

        tracing::info!(
            max_concurrent = shared.config.max_concurrent,
            generator = shared.generator.name(),
            "task manager started"
        );
        runtime.spawn(dispatcher::run(Arc::clone(&shared)));

        Ok(Self { shared })
    }

    /// Queue a job and return its id immediately.
    ///
    /// The payload is checked with `Generator::validate`; rejection is an
    /// `InvalidRequest` and nothing is queued.
    pub fn submit(&self, payload: Value, priority: Priority) -> Result<JobId, SchedulerError> {
        if self.shared.shutdown.is_cancelled() {
            return Err(SchedulerError::ShutDown);
        }
        self.shared
            .generator
            .validate(&payload)
            .map_err(|e| SchedulerError::invalid_request(e.to_string()))?;

        let (id, stats) = {
            let mut state = self.shared.table.lock();
            let (id, event) = state.enqueue(payload, priority);
            self.shared.emit(event);
            (id, state.stats(self.shared.slots.max()))
        };

        metrics::record_submitted(priority);
        metrics::record_depth(&stats);
        tracing::info!(
            job_id = %id,
            priority = %priority,
            queued = stats.queued_count,
            "job submitted"
        );

        self.shared.wake.notify_one();
        Ok(id)
    }

    /// Like `submit`, with the priority given as text ("critical", "high", ...).
    pub fn submit_with(&self, payload: Value, priority: &str) -> Result<JobId, SchedulerError> {
        self.submit(payload, priority.parse()?)
    }

    /// Snapshot of a job, or `None` if the id is unknown.
    pub fn status(&self, id: &str) -> Option<JobSnapshot> {
        self.shared.table.get(id)
    }

    /// Cancel a job. Queued jobs are cancelled immediately; running and
    /// paused jobs are signalled and become Cancelled at their next
    /// checkpoint. False if the id is unknown or the job is terminal.
    pub fn cancel(&self, id: &str) -> bool {
        let (outcome, stats) = {
            let mut state = self.shared.table.lock();
            let outcome = state.cancel(id);
            (outcome, state.stats(self.shared.slots.max()))
        };
        match outcome {
            CancelOutcome::Cancelled(event) => {
                self.shared.emit(event);
                metrics::record_finished(JobState::Cancelled, None);
                metrics::record_depth(&stats);
                tracing::info!(job_id = %id, "queued job cancelled");
                true
            }
            CancelOutcome::Signalled(event) => {
                self.shared.emit(event);
                tracing::info!(job_id = %id, "cancellation requested");
                true
            }
            CancelOutcome::Rejected => {
                tracing::debug!(job_id = %id, "cancel ignored");
                false
            }
        }
    }

    /// Pause a Processing job. It keeps its execution slot while paused.
    pub fn pause(&self, id: &str) -> bool {
        let event = self.shared.table.lock().pause(id);
        match event {
            Some(event) => {
                tracing::info!(job_id = %id, progress = event.progress, "job paused");
                self.shared.emit(event);
                true
            }
            None => false,
        }
    }

    /// Resume a Paused job from its frozen progress.
    pub fn resume(&self, id: &str) -> bool {
        let event = self.shared.table.lock().resume(id);
        match event {
            Some(event) => {
                tracing::info!(job_id = %id, progress = event.progress, "job resumed");
                self.shared.emit(event);
                true
            }
            None => false,
        }
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.shared.table.lock().stats(self.shared.slots.max())
    }

    /// Remove every Completed, Failed and Cancelled job from the table.
    pub fn sweep_finished(&self) -> usize {
        self.shared.sweep()
    }

    /// Run `sweep_finished` every `every` until shutdown.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        shared.sweep();
                    }
                    _ = shared.shutdown.cancelled() => break,
                }
            }
        })
    }

    /// All tracked jobs in submission order.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        self.shared.table.snapshots()
    }

    /// Processing and Paused jobs.
    pub fn active_jobs(&self) -> Vec<JobSnapshot> {
        self.shared.table.active_snapshots()
    }

    /// Subscribe to state and progress changes of all jobs.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.shared.events.subscribe()
    }

    /// Wait until the job is terminal and return its final snapshot.
    /// `None` if the id is unknown (or was swept meanwhile).
    pub async fn wait(&self, id: &str) -> Option<JobSnapshot> {
        let mut rx = self.subscribe();
        loop {
            let snapshot = self.status(id)?;
            if snapshot.state.is_terminal() {
                return Some(snapshot);
            }
            loop {
                match rx.recv().await {
                    Ok(event) if event.job_id.as_str() == id && event.state.is_terminal() => break,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => break,
                    Err(broadcast::error::RecvError::Closed) => return self.status(id),
                }
            }
        }
    }

    /// Stop dispatching and ask running jobs to cancel. Queued jobs stay
    /// Queued; `submit` fails from now on. Idempotent.
    pub fn shutdown(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        self.shared.shutdown.cancel();
        let events = self.shared.table.lock().cancel_active();
        let signalled = events.len();
        for event in events {
            self.shared.emit(event);
        }
        tracing::info!(signalled, "task manager shutting down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    pub fn table(&self) -> &Arc<JobTable> {
        &self.shared.table
    }

    pub fn generator_name(&self) -> &str {
        self.shared.generator.name()
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
