//! Query embedding
//!
//! `OpenAIEmbedder` talks to any OpenAI-compatible `/embeddings` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use lead_assistant_config::{EmbeddingConfig, LlmConfig};

use crate::RagError;

/// Turns text into a dense vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Output dimension
    fn dim(&self) -> usize;
}

/// OpenAI embedding configuration
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingConfig {
    /// API base URL (without `/embeddings`)
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimensions: usize,
    pub timeout: Duration,
}

impl OpenAIEmbeddingConfig {
    pub fn from_settings(embeddings: &EmbeddingConfig, llm: &LlmConfig) -> Self {
        Self {
            endpoint: embeddings.endpoint.clone(),
            api_key: embeddings.resolved_api_key(llm).map(str::to_string),
            model: embeddings.model.clone(),
            dimensions: embeddings.dimensions,
            timeout: Duration::from_secs(embeddings.timeout_seconds),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Extract the first embedding from a provider response body
fn parse_embedding(body: &str, expected_dim: usize) -> Result<Vec<f32>, RagError> {
    let mut response: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

    response.data.sort_by_key(|d| d.index);
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| RagError::Embedding("No embedding returned".to_string()))?;

    if expected_dim > 0 && embedding.len() != expected_dim {
        return Err(RagError::Embedding(format!(
            "Expected {} dimensions, got {}",
            expected_dim,
            embedding.len()
        )));
    }

    Ok(embedding)
}

/// Embedder backed by an OpenAI-compatible HTTP API
pub struct OpenAIEmbedder {
    client: Client,
    config: OpenAIEmbeddingConfig,
}

impl OpenAIEmbedder {
    pub fn new(config: OpenAIEmbeddingConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.config.endpoint.trim_end_matches('/'))
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let request = EmbedRequest {
            model: &self.config.model,
            input: text,
        };

        let mut builder = self.client.post(self.embeddings_url()).json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to read embedding response: {}", e)))?;

        if !status.is_success() {
            return Err(RagError::Embedding(format!(
                "Embedding provider returned {}: {}",
                status, body
            )));
        }

        parse_embedding(&body, self.config.dimensions)
    }

    fn dim(&self) -> usize {
        self.config.dimensions
    }
}
