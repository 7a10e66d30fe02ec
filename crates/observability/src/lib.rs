// crates/observability/src/lib.rs
//! Process-wide logging and metrics setup for PixelForge binaries.
//!
//! Libraries only emit through the `tracing` and `metrics` facades; a binary
//! calls [`init_tracing`] and, if it wants Prometheus output, [`init_metrics`]
//! once at startup.

mod logging;
mod prometheus;

pub use logging::{init_tracing, LogFormat, DEFAULT_FILTER};
pub use prometheus::{init_metrics, render_metrics};
