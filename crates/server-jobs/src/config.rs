// crates/server-jobs/src/config.rs
//! Scheduler configuration.

use std::path::Path;
use std::time::Duration;

use pixelforge_core::{env_override, load_toml, ConfigError};
use serde::{Deserialize, Serialize};

/// Default number of jobs allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Tunables for a `TaskManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on Processing + Paused jobs.
    pub max_concurrent: usize,
    /// Number of progress checkpoints a runner passes before calling the generator.
    pub progress_steps: u32,
    /// Time spent per checkpoint step.
    pub step_interval_ms: u64,
    /// Watchdog for the generator call. `None` disables it.
    pub job_timeout_secs: Option<u64>,
    /// Buffer size of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            progress_steps: 10,
            step_interval_ms: 2_000,
            job_timeout_secs: None,
            event_capacity: 256,
        }
    }
}

impl SchedulerConfig {
    /// Load from an optional TOML file, apply `PIXELFORGE_*` environment
    /// overrides, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => load_toml(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(n) = env_override("PIXELFORGE_MAX_CONCURRENT")? {
            self.max_concurrent = n;
        }
        if let Some(n) = env_override("PIXELFORGE_PROGRESS_STEPS")? {
            self.progress_steps = n;
        }
        if let Some(ms) = env_override("PIXELFORGE_STEP_INTERVAL_MS")? {
            self.step_interval_ms = ms;
        }
        if let Some(secs) = env_override::<u64>("PIXELFORGE_JOB_TIMEOUT_SECS")? {
            // 0 turns the watchdog off.
            self.job_timeout_secs = (secs > 0).then_some(secs);
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::invalid("max_concurrent must be at least 1"));
        }
        if self.progress_steps == 0 || self.progress_steps > 100 {
            return Err(ConfigError::invalid("progress_steps must be between 1 and 100"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::invalid("event_capacity must be at least 1"));
        }
        if self.job_timeout_secs == Some(0) {
            return Err(ConfigError::invalid("job_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }
}
