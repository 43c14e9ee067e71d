//! LLM integration for the lead assistant
//!
//! Features:
//! - System prompt composition from settings, company facts and retrieved knowledge
//! - Single-shot chat completion with tool schemas
//! - Model-family parameter normalization (reasoning vs standard models)
//! - OpenAI-compatible HTTP backend

pub mod backend;
pub mod gateway;
pub mod prompt;

pub use backend::{
    ChatCompletionRequest, ChatCompletionResponse, ChatProvider, OpenAIBackend, OpenAIConfig,
    ScriptedProvider,
};
pub use gateway::{Completion, LlmGateway, ModelFamily, LLM_LATENCY_METRIC};
pub use prompt::{PromptComposer, BASE_PROMPT_PLACEHOLDER};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}
