// crates/core/src/generator/provider.rs
//! Generator trait defining the interface for content generation backends.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use super::types::GenerateError;

/// Progress/control handle passed to a running generator.
///
/// Each call reports progress (0-100, never moving backwards), blocks while
/// the job is paused, and returns `GenerateError::Cancelled` once the job has
/// been cancelled. Generators that never call it cannot be paused or
/// cancelled until they return.
#[async_trait]
pub trait Checkpoint: Send + Sync {
    async fn checkpoint(&self, progress: u8) -> Result<(), GenerateError>;

    /// Non-blocking cancellation check.
    fn is_cancelled(&self) -> bool;
}

/// Checkpoint that never pauses or cancels. For calling a generator outside
/// the scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCheckpoint;

#[async_trait]
impl Checkpoint for NoopCheckpoint {
    async fn checkpoint(&self, _progress: u8) -> Result<(), GenerateError> {
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Trait for content generation backends.
///
/// Implementations include:
/// - `MockPrototypeGenerator`: offline skeleton prototype
/// - `FnGenerator`: wraps an async closure
#[async_trait]
pub trait Generator: Send + Sync {
    /// Cheap synchronous payload check, run at submission time.
    fn validate(&self, _payload: &Value) -> Result<(), GenerateError> {
        Ok(())
    }

    /// Produce content for `payload`. May take minutes.
    async fn generate(
        &self,
        payload: Value,
        checkpoint: &dyn Checkpoint,
    ) -> Result<Value, GenerateError>;

    /// Backend name for logging/display (e.g. "mock", "openai").
    fn name(&self) -> &str;
}

/// Adapter turning an async closure into a `Generator`.
pub struct FnGenerator<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnGenerator<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, GenerateError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> Generator for FnGenerator<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, GenerateError>> + Send + 'static,
{
    async fn generate(
        &self,
        payload: Value,
        _checkpoint: &dyn Checkpoint,
    ) -> Result<Value, GenerateError> {
        (self.f)(payload).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
