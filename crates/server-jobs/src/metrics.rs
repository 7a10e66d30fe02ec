// crates/server-jobs/src/metrics.rs
//! Scheduler metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host process installs a recorder (see `pixelforge-observability`).

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use crate::types::{JobState, Priority, QueueStats};

/// Describe all scheduler metrics. Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(
        "pixelforge_jobs_submitted_total",
        "Jobs accepted by the scheduler, by priority"
    );
    describe_counter!(
        "pixelforge_jobs_finished_total",
        "Jobs that reached a terminal state, by state"
    );
    describe_gauge!("pixelforge_jobs_queued", "Jobs waiting for an execution slot");
    describe_gauge!("pixelforge_jobs_active", "Jobs holding an execution slot");
    describe_histogram!(
        "pixelforge_job_run_duration_seconds",
        "Time from dispatch to terminal state"
    );
}

pub(crate) fn record_submitted(priority: Priority) {
    counter!("pixelforge_jobs_submitted_total", "priority" => priority.as_str()).increment(1);
}

pub(crate) fn record_finished(state: JobState, run_time: Option<Duration>) {
    counter!("pixelforge_jobs_finished_total", "state" => state.as_str()).increment(1);
    if let Some(run_time) = run_time {
        histogram!("pixelforge_job_run_duration_seconds", "state" => state.as_str())
            .record(run_time.as_secs_f64());
    }
}

pub(crate) fn record_depth(stats: &QueueStats) {
    gauge!("pixelforge_jobs_queued").set(stats.queued_count as f64);
    gauge!("pixelforge_jobs_active").set(stats.active_count as f64);
}
