// crates/server-jobs/src/error.rs
use pixelforge_core::ConfigError;
use thiserror::Error;

/// Errors returned synchronously by the scheduler API.
///
/// Unknown job ids and illegal state transitions are not errors: those
/// operations return `None`/`false` instead.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid scheduler configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Job table is already attached to a scheduler")]
    TableInUse,

    #[error("Scheduler requires a running tokio runtime")]
    NoRuntime,

    #[error("Scheduler is shut down")]
    ShutDown,
}

impl SchedulerError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_error_display() {
        let err = SchedulerError::invalid_request("unknown priority: \"urgent\"");
        assert_eq!(err.to_string(), "Invalid request: unknown priority: \"urgent\"");

        let err = SchedulerError::from(ConfigError::invalid("max_concurrent must be at least 1"));
        assert!(matches!(err, SchedulerError::Config(_)));
        assert!(err.to_string().contains("max_concurrent"));

        assert_eq!(SchedulerError::ShutDown.to_string(), "Scheduler is shut down");
    }
}
