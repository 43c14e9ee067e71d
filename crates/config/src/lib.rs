//! Configuration management for the lead assistant
//!
//! Supports loading configuration from:
//! - TOML/YAML files (`config/default`, then `config/{env}`)
//! - Environment variables (`LEAD_ASSISTANT__` prefix, `__` separator)

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, CompanyConfig, DispatchConfig, EmbeddingConfig, LlmConfig,
    ObservabilityConfig, PersistenceConfig, RagConfig, RuntimeEnvironment, ServerConfig, Settings,
    ToolCallPolicy,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
