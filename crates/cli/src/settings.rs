// crates/cli/src/settings.rs
//! Application config: one TOML file with a table per component.
//!
//! ```toml
//! [scheduler]
//! max_concurrent = 2
//!
//! [generator]
//! provider = "mock"
//! mock_delay_ms = 1500
//! ```

use std::path::Path;

use pixelforge_core::{load_toml, ConfigError, GeneratorConfig};
use pixelforge_server_jobs::SchedulerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub generator: GeneratorConfig,
}

impl AppConfig {
    /// File (if any), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base: Self = match path {
            Some(path) => load_toml(path)?,
            None => Self::default(),
        };
        let config = Self {
            scheduler: base.scheduler.with_env_overrides()?,
            generator: base.generator.with_env_overrides()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.generator.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelforge_core::ProviderType;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_load_defaults_without_file() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[scheduler]\nmax_concurrent = 5\n\n[generator]\nmodel = \"ernie-bot\"\nmock_delay_ms = 10"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.scheduler.max_concurrent, 5);
        assert_eq!(config.scheduler.progress_steps, 10);
        assert_eq!(config.generator.model, "ernie-bot");
        assert_eq!(config.generator.provider, ProviderType::Mock);
        assert_eq!(config.generator.mock_delay_ms, 10);
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler]\nmax_concurrent = 0").unwrap();
        assert!(matches!(
            AppConfig::load(Some(file.path())),
            Err(ConfigError::Invalid(_))
        ));
    }
}
