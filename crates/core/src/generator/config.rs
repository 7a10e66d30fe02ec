// crates/core/src/generator/config.rs
//! Generator backend configuration types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::env_override;
use crate::error::ConfigError;

/// Configuration for a generator backend instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub provider: ProviderType,
    pub model: String,
    /// Credentials for remote providers. Unused by the mock backend.
    pub api_key: Option<String>,
    /// Base URL for remote providers. Unused by the mock backend.
    pub endpoint: Option<String>,
    /// Per-request timeout. The mock applies it to its simulated latency.
    pub timeout_secs: u64,
    /// Simulated latency of the mock backend.
    pub mock_delay_ms: u64,
}

/// Supported generator backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Mock,
    OpenAi,
    Wenxin,
    ModelScope,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::OpenAi => "openai",
            Self::Wenxin => "wenxin",
            Self::ModelScope => "modelscope",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "openai" => Ok(Self::OpenAi),
            "wenxin" => Ok(Self::Wenxin),
            "modelscope" => Ok(Self::ModelScope),
            other => Err(ConfigError::invalid(format!(
                "unsupported generator provider: {other}"
            ))),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::Mock,
            model: "qwen-turbo".into(),
            api_key: None,
            endpoint: None,
            timeout_secs: 60,
            mock_delay_ms: 5_000,
        }
    }
}

impl GeneratorConfig {
    /// Apply `AI_*` environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(raw) = env_override::<String>("AI_ADAPTER_TYPE")? {
            self.provider = raw.parse()?;
        }
        if let Some(model) = env_override("AI_MODEL")? {
            self.model = model;
        }
        if let Some(key) = env_override("AI_API_KEY")? {
            self.api_key = Some(key);
        }
        if let Some(endpoint) = env_override("AI_API_BASE")? {
            self.endpoint = Some(endpoint);
        }
        if let Some(secs) = env_override("AI_REQUEST_TIMEOUT")? {
            self.timeout_secs = secs;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("generator timeout_secs must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("generator model must not be empty"));
        }
        Ok(())
    }
}
