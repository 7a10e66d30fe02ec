// crates/core/src/generator/mod.rs
//! Content generation capability consumed by the job scheduler.
//!
//! Provides the `Generator` trait, the `Checkpoint` handle a generator uses
//! to report progress mid-call, and a factory that picks a backend from
//! `GeneratorConfig`.

pub mod config;
pub mod factory;
pub mod mock;
pub mod provider;
pub mod types;

pub use config::{GeneratorConfig, ProviderType};
pub use factory::create_generator;
pub use mock::MockPrototypeGenerator;
pub use provider::{Checkpoint, FnGenerator, Generator, NoopCheckpoint};
pub use types::GenerateError;
