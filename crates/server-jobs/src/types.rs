// crates/server-jobs/src/types.rs
//! Types for the generation job scheduler.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchedulerError;

/// Unique identifier for a job, e.g. `task-3f2a9c...`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub(crate) fn generate() -> Self {
        Self(format!("task-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for JobId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job priority. Lower discriminant is served first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Priority {
    Critical = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(SchedulerError::invalid_request(format!(
                "unknown priority: {other:?}"
            ))),
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = SchedulerError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Critical),
            1 => Ok(Self::High),
            2 => Ok(Self::Normal),
            3 => Ok(Self::Low),
            _ => Err(SchedulerError::invalid_request(format!(
                "priority out of range: {v}"
            ))),
        }
    }
}

/// Lifecycle state of a job.
///
/// ```text
/// Queued ──dispatch──> Processing ──ok──> Completed
///   │                   │    ▲   └──err──> Failed
///   │                pause  resume
///   │                   ▼    │
///   └──cancel──> Cancelled <─┴── Paused (cancel)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed, Failed and Cancelled never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Processing or Paused: the job holds an execution slot.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Processing | Self::Paused)
    }

    /// Status vocabulary for API clients polling a job.
    pub fn surface_status(&self) -> &'static str {
        match self {
            Self::Queued | Self::Processing | Self::Paused => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job ended up Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Payload rejected once the job was running.
    Validation,
    /// The generator returned an error or panicked.
    Generator,
    /// The generator call exceeded the configured job timeout.
    Timeout,
    /// The runner itself was torn down (e.g. runtime shutdown).
    Internal,
}

/// Immutable copy of a job's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    pub priority: Priority,
    pub state: JobState,
    pub progress: u8,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Queue depth and occupancy counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub queued_count: usize,
    pub active_count: usize,
    pub max_concurrent: usize,
    pub total_tracked: usize,
}

/// Progress/state change broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: JobId,
    pub state: JobState,
    pub progress: u8,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Normal);
        assert!(Priority::Normal < Priority::Low);
        assert_eq!(Priority::Critical as u8, 0);
        assert_eq!(Priority::Low as u8, 3);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(Priority::try_from(0).unwrap(), Priority::Critical);

        let err = "urgent".parse::<Priority>().unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRequest(_)));
        assert!(Priority::try_from(4).is_err());
    }

    #[test]
    fn test_job_id_shape() {
        let id = JobId::generate();
        assert!(id.starts_with("task-"));
        assert_eq!(id.len(), "task-".len() + 32);
        assert_ne!(id, JobId::generate());
    }

    #[test]
    fn test_surface_status() {
        assert_eq!(JobState::Queued.surface_status(), "pending");
        assert_eq!(JobState::Processing.surface_status(), "pending");
        assert_eq!(JobState::Paused.surface_status(), "pending");
        assert_eq!(JobState::Completed.surface_status(), "completed");
        assert_eq!(JobState::Failed.surface_status(), "failed");
        assert_eq!(JobState::Cancelled.surface_status(), "cancelled");
    }

    #[test]
    fn test_state_classification() {
        assert!(JobState::Paused.is_active());
        assert!(!JobState::Paused.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Queued.is_active());
    }

    #[test]
    fn test_job_event_serialize() {
        let event = JobEvent {
            job_id: JobId::from("task-1"),
            state: JobState::Processing,
            progress: 40,
            timestamp: "2026-02-05T12:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"jobId\":\"task-1\""));
        assert!(json.contains("\"state\":\"processing\""));
        assert!(json.contains("\"progress\":40"));
    }

    #[test]
    fn test_queue_stats_serialize() {
        let stats = QueueStats {
            queued_count: 2,
            active_count: 3,
            max_concurrent: 3,
            total_tracked: 9,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "queuedCount": 2,
                "activeCount": 3,
                "maxConcurrent": 3,
                "totalTracked": 9,
            })
        );
    }
}
