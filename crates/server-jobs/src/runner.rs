// crates/server-jobs/src/runner.rs
//! Job runner: drives one dispatched job to a terminal state.
//!
//! The runner passes `progress_steps` checkpoints, then calls the generator
//! in its own task so a panic is contained, then settles the outcome. Settling
//! checks pause and cancel under the same lock that records the outcome: a
//! Paused job holds its outcome until resumed, and a job with a pending
//! cancel always ends Cancelled.
//!
//! Cancellation and pause are cooperative. A generator that never calls its
//! `Checkpoint` runs to completion; a cancel requested meanwhile takes effect
//! when the call returns and the result is discarded.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pixelforge_core::{Checkpoint, GenerateError};
use serde_json::Value;

use crate::control::ControlHandle;
use crate::manager::Shared;
use crate::slots::ExecutionSlot;
use crate::table::{Advance, Outcome};
use crate::types::{FailureKind, JobId};

/// `Checkpoint` implementation bound to one running job.
pub(crate) struct JobCheckpoint {
    shared: Arc<Shared>,
    id: JobId,
    control: ControlHandle,
}

impl JobCheckpoint {
    /// Cancel check, pause wait, then progress update.
    async fn pass(&self, progress: u8) -> Result<(), GenerateError> {
        loop {
            if self.control.is_cancelled() {
                return Err(GenerateError::Cancelled);
            }
            match self.shared.advance(&self.id, Some(progress)) {
                Advance::Proceed(_) => return Ok(()),
                Advance::Paused => {}
                Advance::Gone => return Err(GenerateError::Cancelled),
            }
            if !self.control.wait_while_paused().await {
                return Err(GenerateError::Cancelled);
            }
        }
    }

    /// Sleep for one step, cut short by cancellation.
    async fn step(&self, interval: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = self.control.cancelled() => {}
        }
    }
}

#[async_trait]
impl Checkpoint for JobCheckpoint {
    async fn checkpoint(&self, progress: u8) -> Result<(), GenerateError> {
        self.pass(progress).await
    }

    fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }
}

/// Records the outcome exactly once and releases the slot afterwards.
///
/// If the runner future is dropped before settling (runtime shutdown, a
/// panic outside the generator task), `Drop` records an internal failure so
/// the job never stays Processing with no runner behind it.
struct RunGuard {
    shared: Arc<Shared>,
    id: JobId,
    started: Instant,
    slot: Option<ExecutionSlot>,
}

impl RunGuard {
    /// Record `outcome`, waiting out any pause first.
    async fn settle(mut self, mut outcome: Outcome, control: &ControlHandle) {
        loop {
            match self.shared.settle(&self.id, outcome, self.started.elapsed()) {
                None => break,
                Some(held) => outcome = held,
            }
            if !control.wait_while_paused().await {
                self.record(Outcome::failed(
                    FailureKind::Internal,
                    "job control dropped while paused",
                ));
                return;
            }
        }
        self.slot.take();
    }

    fn record(&mut self, outcome: Outcome) {
        if let Some(slot) = self.slot.take() {
            self.shared.finish(&self.id, outcome, self.started.elapsed());
            drop(slot);
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.slot.is_some() {
            tracing::error!(job_id = %self.id, "job runner dropped before recording an outcome");
            self.record(Outcome::failed(
                FailureKind::Internal,
                "job runner terminated unexpectedly",
            ));
        }
    }
}

pub(crate) async fn run_job(
    shared: Arc<Shared>,
    id: JobId,
    payload: Value,
    control: ControlHandle,
    slot: ExecutionSlot,
) {
    let guard = RunGuard {
        shared: Arc::clone(&shared),
        id: id.clone(),
        started: Instant::now(),
        slot: Some(slot),
    };
    let checkpoint = Arc::new(JobCheckpoint {
        shared: Arc::clone(&shared),
        id,
        control: control.clone(),
    });

    let outcome = drive(&shared, payload, checkpoint).await;
    guard.settle(outcome, &control).await;
}

async fn drive(shared: &Arc<Shared>, payload: Value, checkpoint: Arc<JobCheckpoint>) -> Outcome {
    let steps = shared.config.progress_steps.max(1);
    let interval = shared.config.step_interval();

    for step in 1..=steps {
        checkpoint.step(interval).await;
        let progress = (step * 100 / steps) as u8;
        if checkpoint.pass(progress).await.is_err() {
            return Outcome::Cancelled;
        }
    }

    invoke(shared, payload, checkpoint).await
}

async fn invoke(shared: &Arc<Shared>, payload: Value, checkpoint: Arc<JobCheckpoint>) -> Outcome {
    let generator = Arc::clone(&shared.generator);
    let task = tokio::spawn(async move { generator.generate(payload, checkpoint.as_ref()).await });

    let joined = match shared.config.job_timeout() {
        Some(limit) => {
            let abort = task.abort_handle();
            match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    return Outcome::failed(
                        FailureKind::Timeout,
                        format!("generator did not finish within {}s", limit.as_secs()),
                    );
                }
            }
        }
        None => task.await,
    };

    match joined {
        Ok(Ok(result)) => Outcome::Completed(result),
        Ok(Err(GenerateError::Cancelled)) => Outcome::Cancelled,
        Ok(Err(e @ GenerateError::Timeout(_))) => Outcome::failed(FailureKind::Timeout, e.to_string()),
        Ok(Err(e)) if e.is_validation() => Outcome::failed(FailureKind::Validation, e.to_string()),
        Ok(Err(e)) => Outcome::failed(FailureKind::Generator, e.to_string()),
        Err(e) if e.is_panic() => Outcome::failed(
            FailureKind::Generator,
            format!("generator panicked: {}", panic_message(e.into_panic())),
        ),
        Err(e) => Outcome::failed(FailureKind::Internal, format!("generator task aborted: {e}")),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
