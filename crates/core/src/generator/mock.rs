// crates/core/src/generator/mock.rs
//! Offline generator that turns a manuscript into a skeleton game prototype.
//!
//! Used when no remote backend is configured. Expected payload:
//!
//! ```json
//! { "manuscript": { "storyTitle": "...", "gameBackground": "...",
//!                   "characters": [{"name": "..."}], "missions": [{"name": "..."}] },
//!   "params": { "style": "pixel_art", "emotion": "neutral" } }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::provider::{Checkpoint, Generator};
use super::types::GenerateError;

/// Number of slices the simulated latency is split into. The generator
/// checkpoints between slices so pause/cancel take effect mid-call.
const DELAY_SLICES: u32 = 4;

pub struct MockPrototypeGenerator {
    model: String,
    delay: Duration,
    timeout: Option<Duration>,
}

impl MockPrototypeGenerator {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            delay: Duration::ZERO,
            timeout: None,
        }
    }

    /// Set the simulated backend latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail with `GenerateError::Timeout` when the simulated latency exceeds
    /// `timeout`. Time spent paused at a checkpoint does not count.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn manuscript(payload: &Value) -> Result<&Map<String, Value>, GenerateError> {
        payload
            .get("manuscript")
            .and_then(Value::as_object)
            .ok_or_else(|| GenerateError::invalid_payload("payload.manuscript must be an object"))
    }

    fn named_items(
        manuscript: &Map<String, Value>,
        field: &str,
    ) -> Result<Vec<String>, GenerateError> {
        let Some(raw) = manuscript.get(field) else {
            return Ok(Vec::new());
        };
        let items = raw.as_array().ok_or_else(|| {
            GenerateError::invalid_payload(format!("manuscript.{field} must be an array"))
        })?;
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{field} {}", i + 1))
            })
            .collect())
    }
}

#[async_trait]
impl Generator for MockPrototypeGenerator {
    fn validate(&self, payload: &Value) -> Result<(), GenerateError> {
        Self::manuscript(payload).map(|_| ())
    }

    async fn generate(
        &self,
        payload: Value,
        checkpoint: &dyn Checkpoint,
    ) -> Result<Value, GenerateError> {
        let manuscript = Self::manuscript(&payload)?;

        // Field-level checks only happen once the job is actually running.
        let title = match manuscript.get("storyTitle") {
            None => "Untitled Game".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(GenerateError::invalid_payload(
                    "manuscript.storyTitle must be a string",
                ))
            }
        };
        let background = manuscript
            .get("gameBackground")
            .and_then(Value::as_str)
            .unwrap_or("mysterious forest");
        let characters = Self::named_items(manuscript, "characters")?;
        let missions = Self::named_items(manuscript, "missions")?;

        let params = payload.get("params");
        let style = params
            .and_then(|p| p.get("style"))
            .and_then(Value::as_str)
            .unwrap_or("pixel_art");
        let emotion = params
            .and_then(|p| p.get("emotion"))
            .and_then(Value::as_str)
            .unwrap_or("neutral");

        tracing::debug!(model = %self.model, title = %title, "mock generator: building prototype");

        let slice = self.delay / DELAY_SLICES;
        let mut waited = Duration::ZERO;
        for _ in 0..DELAY_SLICES {
            if let Some(limit) = self.timeout {
                if waited + slice > limit {
                    tokio::time::sleep(limit.saturating_sub(waited)).await;
                    return Err(GenerateError::Timeout(limit.as_secs()));
                }
            }
            tokio::time::sleep(slice).await;
            waited += slice;
            checkpoint.checkpoint(100).await?;
        }

        let mission_count = missions.len();
        Ok(json!({
            "gameId": format!("game-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]),
            "gameName": title,
            "emotionalTone": emotion,
            "style": style,
            "model": self.model,
            "scenes": [
                { "id": "scene_start", "name": "Start", "background": format!("pixel-art {background}") },
                { "id": "scene_end", "name": "Ending", "background": format!("{background} at dusk") },
            ],
            "characters": characters
                .iter()
                .map(|name| json!({ "name": name, "sprite": "16x16" }))
                .collect::<Vec<_>>(),
            "missions": missions
                .iter()
                .enumerate()
                .map(|(i, name)| json!({
                    "id": format!("mission_{i}"),
                    "name": name,
                    "nextMissionId": (i + 1 < mission_count).then(|| format!("mission_{}", i + 1)),
                }))
                .collect::<Vec<_>>(),
            "createdAt": chrono::Utc::now().to_rfc3339(),
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
