//! Chat turn orchestration
//!
//! One turn: validate the transcript, resolve settings, retrieve knowledge,
//! compose the system prompt, run one completion with the lead-capture
//! tools, dispatch tool calls and persist the conversation.

pub mod pipeline;
pub mod turn;

pub use pipeline::{ChatPipeline, RetrievalParams};
pub use turn::{ChatRequest, TurnOutcome};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    /// Rejected before any side effect
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Provider(#[from] lead_assistant_llm::LlmError),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] lead_assistant_persistence::PersistenceError),
}

impl From<lead_assistant_core::Error> for AgentError {
    fn from(err: lead_assistant_core::Error) -> Self {
        AgentError::Validation(err.to_string())
    }
}

impl From<lead_assistant_tools::ToolArgumentError> for AgentError {
    fn from(err: lead_assistant_tools::ToolArgumentError) -> Self {
        AgentError::Initialization(err.to_string())
    }
}
