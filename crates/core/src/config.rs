// crates/core/src/config.rs
//! Shared helpers for TOML config files and environment overrides.

use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Read and deserialize a TOML config file.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    toml::from_str(&raw).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse the environment variable `key` if it is set.
///
/// Unset or empty variables yield `Ok(None)`; a value that does not parse is
/// an error rather than being silently ignored.
pub fn env_override<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}
