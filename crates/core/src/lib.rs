//! Core types for the lead assistant
//!
//! This crate provides the types shared by every other crate:
//! - Chat messages and conversation snapshots
//! - Lead records
//! - Bot settings and their layering
//! - Function-calling types
//! - Error types

pub mod bot_settings;
pub mod conversation;
pub mod error;
pub mod lead;
pub mod llm_types;

pub use bot_settings::{
    BotSettings, BotSettingsPatch, CustomPrompts, Personality, ResponseLength, MAX_TOKENS_RANGE,
    TEMPERATURE_RANGE,
};
pub use conversation::{
    last_user_utterance, validate_transcript, ChatMessage, Conversation, ConversationStatus,
    FunctionCall, LeadStatus, MessageMetadata, MessageRole,
};
pub use error::{Error, Result};
pub use lead::{ContactInfo, Lead, LeadRecordStatus};
pub use llm_types::{FinishReason, TokenUsage, ToolCall, ToolChoice, ToolDefinition};
