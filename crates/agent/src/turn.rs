//! Request and result of one chat turn

use serde::{Deserialize, Serialize};

use lead_assistant_core::{BotSettingsPatch, ChatMessage};
use lead_assistant_persistence::PersistenceReport;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Full transcript so far, oldest first
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Per-request overrides layered over the stored settings
    #[serde(default)]
    pub settings: Option<BotSettingsPatch>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_settings(mut self, settings: BotSettingsPatch) -> Self {
        self.settings = Some(settings);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub message: ChatMessage,
    pub conversation_id: String,
    /// Present only when a write failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceReport>,
}

impl TurnOutcome {
    pub fn is_degraded(&self) -> bool {
        self.persistence.as_ref().is_some_and(|r| r.is_degraded())
    }
}
