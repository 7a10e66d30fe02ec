// crates/core/src/lib.rs
pub mod config;
pub mod error;
pub mod generator;

pub use config::{env_override, load_toml};
pub use error::*;
pub use generator::{
    create_generator, Checkpoint, FnGenerator, GenerateError, Generator, GeneratorConfig,
    MockPrototypeGenerator, NoopCheckpoint, ProviderType,
};
