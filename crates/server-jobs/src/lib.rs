// crates/server-jobs/src/lib.rs
//! Asynchronous job scheduler for long-running generation work.
//!
//! Jobs are submitted with a priority, wait in a priority queue (ties in
//! submission order), and run on a bounded number of execution slots. Each
//! running job can be paused, resumed and cancelled through its
//! `Checkpoint`. All state lives in a `JobTable` owned by one `TaskManager`.
//!
//! ```ignore
//! let manager = TaskManager::new(SchedulerConfig::default(), generator)?;
//! let id = manager.submit(payload, Priority::High)?;
//! let done = manager.wait(&id).await;
//! ```

pub mod config;
pub(crate) mod control;
pub(crate) mod dispatcher;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod queue;
pub(crate) mod runner;
pub mod slots;
pub mod table;
pub mod types;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use manager::TaskManager;
pub use self::metrics::describe_metrics;
pub use queue::PriorityQueue;
pub use slots::{ExecutionSlot, SlotController};
pub use table::JobTable;
pub use types::{FailureKind, JobEvent, JobId, JobSnapshot, JobState, Priority, QueueStats};
