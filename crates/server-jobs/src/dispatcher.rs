// crates/server-jobs/src/dispatcher.rs
//! Dispatcher loop: admits queued jobs into execution while slots are free.
//!
//! Woken by `Shared::wake`, which is notified on every submit and every slot
//! release. `Notify` keeps one pending permit, so a wake-up that arrives
//! while a dispatch pass is running is not lost.

use std::sync::Arc;

use crate::control::JobControl;
use crate::manager::Shared;
use crate::runner;

pub(crate) async fn run(shared: Arc<Shared>) {
    tracing::debug!(max_concurrent = shared.slots.max(), "dispatcher started");
    loop {
        dispatch_ready(&shared);
        tokio::select! {
            _ = shared.wake.notified() => {}
            _ = shared.shutdown.cancelled() => break,
        }
    }
    tracing::debug!("dispatcher stopped");
}

/// Start as many queued jobs as there are free slots. Returns how many
/// runners were spawned.
pub(crate) fn dispatch_ready(shared: &Arc<Shared>) -> usize {
    let mut started = 0;
    while !shared.shutdown.is_cancelled() {
        let (ticket, slot, handle) = {
            let mut state = shared.table.lock();
            if !state.has_queued() {
                break;
            }
            let Some(slot) = shared.slots.try_acquire() else {
                break;
            };
            let control = JobControl::new();
            let handle = control.handle();
            let Some(ticket) = state.start_next(control) else {
                break;
            };
            shared.emit(ticket.event.clone());
            crate::metrics::record_depth(&state.stats(shared.slots.max()));
            (ticket, slot, handle)
        };

        tracing::info!(
            job_id = %ticket.id,
            priority = %ticket.priority,
            "job dispatched"
        );
        tokio::spawn(runner::run_job(
            Arc::clone(shared),
            ticket.id,
            ticket.payload,
            handle,
            slot,
        ));
        started += 1;
    }
    started
}
