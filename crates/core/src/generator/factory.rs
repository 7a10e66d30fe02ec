// crates/core/src/generator/factory.rs
//! Generator factory: creates a Generator from configuration.

use std::sync::Arc;
use std::time::Duration;

use super::config::{GeneratorConfig, ProviderType};
use super::mock::MockPrototypeGenerator;
use super::provider::Generator;
use super::types::GenerateError;

/// Create a generator backend based on the given configuration.
///
/// Only `Mock` is implemented. Remote providers are recognised so configs
/// naming them parse, but return `NotAvailable` until a client exists.
pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn Generator>, GenerateError> {
    tracing::debug!(provider = %config.provider, model = %config.model, "creating generator");
    match config.provider {
        ProviderType::Mock => Ok(Arc::new(
            MockPrototypeGenerator::new(&config.model)
                .with_delay(Duration::from_millis(config.mock_delay_ms))
                .with_timeout(Duration::from_secs(config.timeout_secs)),
        )),
        other => Err(GenerateError::NotAvailable(format!(
            "provider {other} is not implemented; only mock is available"
        ))),
    }
}
