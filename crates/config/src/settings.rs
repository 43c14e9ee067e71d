//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{company, endpoints, models, rag, timeouts};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Chat completion provider
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding provider used by retrieval
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    #[serde(default)]
    pub rag: RagConfig,

    /// ScyllaDB persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Tool call dispatch
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Company facts for the system prompt
    #[serde(default)]
    pub company: CompanyConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_llm()?;
        self.validate_rag()?;
        self.validate_persistence()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 The chat widget will be blocked from other origins."
            );
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.model".to_string()));
        }

        if self.llm.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.embeddings.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "embeddings.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.llm.api_key.is_none() {
            if self.environment.is_production() {
                return Err(ConfigError::InvalidValue {
                    field: "llm.api_key".to_string(),
                    message: "API key must be set in production".to_string(),
                });
            }
            tracing::warn!("llm.api_key not configured; chat completions will be rejected by hosted providers");
        }

        Ok(())
    }

    fn validate_rag(&self) -> Result<(), ConfigError> {
        let rag = &self.rag;

        if !(0.0..=1.0).contains(&rag.similarity_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "rag.similarity_threshold".to_string(),
                message: format!(
                    "Must be between 0.0 and 1.0, got {}",
                    rag.similarity_threshold
                ),
            });
        }

        if rag.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rag.top_k".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if rag.enabled && self.embeddings.dimensions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "embeddings.dimensions".to_string(),
                message: "Must be at least 1 when retrieval is enabled".to_string(),
            });
        }

        Ok(())
    }

    fn validate_persistence(&self) -> Result<(), ConfigError> {
        let persistence = &self.persistence;

        if persistence.enabled && persistence.scylla_hosts.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "persistence.scylla_hosts".to_string(),
                message: "At least one host is required when persistence is enabled".to_string(),
            });
        }

        if persistence.replication_factor == 0 {
            return Err(ConfigError::InvalidValue {
                field: "persistence.replication_factor".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.environment.is_strict() && !persistence.enabled {
            tracing::warn!("Persistence disabled outside development; conversations live in memory only");
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_server_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_server_timeout() -> u64 {
    timeouts::SERVER_REQUEST
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_server_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Chat completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Bearer token; falls back to `OPENAI_API_KEY`
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub organization: Option<String>,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

fn default_llm_endpoint() -> String {
    endpoints::OPENAI_API.to_string()
}

fn default_api_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
}

fn default_chat_model() -> String {
    models::CHAT_MODEL.to_string()
}

fn default_llm_timeout() -> u64 {
    timeouts::LLM_REQUEST
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: default_api_key(),
            organization: None,
            model: default_chat_model(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Falls back to `llm.api_key` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector length; must match the knowledge index
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_seconds: u64,
}

fn default_embedding_model() -> String {
    models::EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimensions() -> usize {
    models::EMBEDDING_DIMENSIONS
}

fn default_embedding_timeout() -> u64 {
    timeouts::EMBEDDING_REQUEST
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            timeout_seconds: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    /// Key to use for embedding calls
    pub fn resolved_api_key<'a>(&'a self, llm: &'a LlmConfig) -> Option<&'a str> {
        self.api_key.as_deref().or(llm.api_key.as_deref())
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Qdrant endpoint; when unset an in-memory index is used
    #[serde(default)]
    pub qdrant_endpoint: Option<String>,

    #[serde(default)]
    pub qdrant_api_key: Option<String>,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Minimum cosine similarity
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_collection() -> String {
    rag::COLLECTION.to_string()
}

fn default_similarity_threshold() -> f32 {
    rag::SIMILARITY_THRESHOLD
}

fn default_top_k() -> usize {
    rag::TOP_K
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            qdrant_endpoint: None,
            qdrant_api_key: None,
            collection: default_collection(),
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
        }
    }
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec![endpoints::SCYLLA_DEFAULT.to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "lead_assistant".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Which tool calls from a single model response are dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallPolicy {
    /// Only the first call; the rest are logged and ignored
    #[default]
    FirstOnly,
    /// Every call, in order
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DispatchConfig {
    #[serde(default)]
    pub tool_call_policy: ToolCallPolicy,
}

/// Company facts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    #[serde(default = "default_company_name")]
    pub name: String,

    #[serde(default = "default_services")]
    pub services: Vec<String>,

    /// Publicly quoted range for a basic website; everything else needs a consultation
    #[serde(default = "default_basic_website_price_range")]
    pub basic_website_price_range: String,

    #[serde(default = "default_contact_email")]
    pub contact_email: String,
}

fn default_company_name() -> String {
    company::NAME.to_string()
}

fn default_services() -> Vec<String> {
    company::SERVICES.iter().map(|s| s.to_string()).collect()
}

fn default_basic_website_price_range() -> String {
    company::BASIC_WEBSITE_PRICE_RANGE.to_string()
}

fn default_contact_email() -> String {
    company::CONTACT_EMAIL.to_string()
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: default_company_name(),
            services: default_services(),
            basic_website_price_range: default_basic_website_price_range(),
            contact_email: default_contact_email(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// OTLP endpoint for traces (requires the `telemetry` feature)
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            otlp_endpoint: None,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("LEAD_ASSISTANT")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("server.cors_origins")
            .with_list_parse_key("persistence.scylla_hosts")
            .with_list_parse_key("company.services")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert!(settings.rag.enabled);
        assert_eq!(settings.rag.top_k, rag::TOP_K);
        assert_eq!(settings.dispatch.tool_call_policy, ToolCallPolicy::FirstOnly);
        assert!(!settings.persistence.enabled);
    }

    #[test]
    fn test_default_settings_validate_in_development() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rag_validation_threshold() {
        let mut settings = Settings::default();

        settings.rag.similarity_threshold = 0.5;
        assert!(settings.validate_rag().is_ok());

        settings.rag.similarity_threshold = 1.5;
        assert!(settings.validate_rag().is_err());

        settings.rag.similarity_threshold = -0.1;
        assert!(settings.validate_rag().is_err());
    }

    #[test]
    fn test_rag_validation_top_k() {
        let mut settings = Settings::default();
        settings.rag.top_k = 0;
        assert!(settings.validate_rag().is_err());
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate_server().is_err());

        settings.server.port = 3000;
        settings.server.timeout_seconds = 0;
        assert!(settings.validate_server().is_err());
    }

    #[test]
    fn test_production_requires_api_key() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        settings.llm.api_key = None;
        assert!(settings.validate_llm().is_err());

        settings.llm.api_key = Some("sk-test".to_string());
        assert!(settings.validate_llm().is_ok());
    }

    #[test]
    fn test_embedding_key_falls_back_to_llm_key() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("sk-llm".to_string());
        settings.embeddings.api_key = None;
        assert_eq!(settings.embeddings.resolved_api_key(&settings.llm), Some("sk-llm"));

        settings.embeddings.api_key = Some("sk-embed".to_string());
        assert_eq!(settings.embeddings.resolved_api_key(&settings.llm), Some("sk-embed"));
    }

    #[test]
    fn test_tool_call_policy_parsing() {
        let dispatch: DispatchConfig = serde_json::from_str(r#"{"tool_call_policy":"all"}"#).unwrap();
        assert_eq!(dispatch.tool_call_policy, ToolCallPolicy::All);
    }

    #[test]
    fn test_persistence_requires_hosts_when_enabled() {
        let mut settings = Settings::default();
        settings.persistence.enabled = true;
        settings.persistence.scylla_hosts.clear();
        assert!(settings.validate_persistence().is_err());
    }
}
