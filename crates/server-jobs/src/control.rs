// crates/server-jobs/src/control.rs
//! Per-job cancel and pause signalling.
//!
//! A `JobControl` is created when a job is dispatched, stored on the job's
//! table entry and dropped when the job reaches a terminal state. The runner
//! only ever sees the receiving half (`ControlHandle`).

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub(crate) struct JobControl {
    cancel: CancellationToken,
    paused: watch::Sender<bool>,
}

impl JobControl {
    pub(crate) fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            cancel: CancellationToken::new(),
            paused,
        }
    }

    pub(crate) fn handle(&self) -> ControlHandle {
        ControlHandle {
            cancel: self.cancel.clone(),
            paused: self.paused.subscribe(),
        }
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.send_replace(paused);
    }

    /// Un-pause first so a runner parked on the pause signal wakes up and
    /// sees the cancellation.
    pub(crate) fn request_cancel(&self) {
        self.paused.send_replace(false);
        self.cancel.cancel();
    }
}

#[derive(Clone)]
pub(crate) struct ControlHandle {
    cancel: CancellationToken,
    paused: watch::Receiver<bool>,
}

impl ControlHandle {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Park until un-paused or cancelled. Returns false if the controlling
    /// side is gone.
    pub(crate) async fn wait_while_paused(&self) -> bool {
        let mut paused = self.paused.clone();
        let unpaused = async move {
            let alive = paused.wait_for(|p| !*p).await.is_ok();
            alive
        };
        tokio::select! {
            alive = unpaused => alive,
            _ = self.cancel.cancelled() => true,
        }
    }
}
