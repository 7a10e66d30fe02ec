// crates/server-jobs/src/slots.rs
//! Execution slot controller: a counting semaphore sized to `max_concurrent`.
//!
//! A slot is held for the whole life of a runner, including while the job is
//! paused. Dropping an `ExecutionSlot` returns the permit and wakes the
//! dispatcher, so every exit path (return, error, panic unwinding) frees it.

use std::sync::Arc;

use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

pub struct SlotController {
    semaphore: Arc<Semaphore>,
    max: usize,
    released: Arc<Notify>,
}

impl SlotController {
    /// `released` is notified every time a slot is given back.
    pub fn new(max: usize, released: Arc<Notify>) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
            released,
        }
    }

    /// Take a free slot without waiting.
    pub fn try_acquire(&self) -> Option<ExecutionSlot> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        Some(ExecutionSlot {
            permit: Some(permit),
            released: Arc::clone(&self.released),
        })
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

/// An occupied slot. Released on drop.
pub struct ExecutionSlot {
    permit: Option<OwnedSemaphorePermit>,
    released: Arc<Notify>,
}

impl Drop for ExecutionSlot {
    fn drop(&mut self) {
        // Permit first, so a woken dispatcher can actually acquire it.
        drop(self.permit.take());
        self.released.notify_one();
    }
}
