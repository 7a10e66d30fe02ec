// crates/observability/src/prometheus.rs
//! Prometheus recorder for the scheduler metrics.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and describe the scheduler metrics.
///
/// Returns `false` if a recorder was already installed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("global metrics recorder already set");
        return false;
    }
    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("prometheus handle already stored");
    }

    pixelforge_server_jobs::describe_metrics();
    tracing::debug!("prometheus metrics initialized");
    true
}

/// Current metrics in Prometheus text format, or `None` before
/// [`init_metrics`].
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(PrometheusHandle::render)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_and_render() {
        init_metrics();
        assert!(!init_metrics());

        metrics::counter!("pixelforge_jobs_submitted_total", "priority" => "high").increment(2);
        let text = render_metrics().unwrap();
        assert!(text.contains("pixelforge_jobs_submitted_total"));
        assert!(text.contains("priority=\"high\""));
    }
}
