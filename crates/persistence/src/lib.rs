//! Persistence layer for the lead assistant
//!
//! Provides storage for:
//! - Conversation snapshots (version-guarded upserts)
//! - Captured leads (append-only)
//! - Operator bot settings
//!
//! ScyllaDB backs production; in-memory stores are used when persistence is
//! disabled and in tests.

pub mod bot_settings;
pub mod client;
pub mod conversations;
pub mod error;
pub mod leads;
pub mod report;
pub mod schema;

use std::sync::Arc;

pub use bot_settings::{
    BotSettingsStore, InMemoryBotSettingsStore, ScyllaBotSettingsStore, DEFAULT_SETTINGS_ID,
};
pub use client::{ScyllaClient, ScyllaConfig};
pub use conversations::{ConversationStore, InMemoryConversationStore, ScyllaConversationStore};
pub use error::PersistenceError;
pub use leads::{InMemoryLeadStore, LeadStore, ScyllaLeadStore};
pub use report::{PersistenceFailure, PersistenceReport, PERSISTENCE_FAILURES_METRIC};

/// Connect to ScyllaDB, ensure the schema and build the stores
pub async fn init(config: ScyllaConfig) -> Result<PersistenceLayer, PersistenceError> {
    let client = ScyllaClient::open(&config).await?;

    Ok(PersistenceLayer {
        conversations: Arc::new(ScyllaConversationStore::new(client.clone())),
        leads: Arc::new(ScyllaLeadStore::new(client.clone())),
        bot_settings: Arc::new(ScyllaBotSettingsStore::new(client)),
        backend: "scylla",
    })
}

/// Combined persistence layer with all stores
#[derive(Clone)]
pub struct PersistenceLayer {
    pub conversations: Arc<dyn ConversationStore>,
    pub leads: Arc<dyn LeadStore>,
    pub bot_settings: Arc<dyn BotSettingsStore>,
    /// `scylla` or `memory`
    pub backend: &'static str,
}

impl PersistenceLayer {
    pub fn in_memory() -> Self {
        Self {
            conversations: Arc::new(InMemoryConversationStore::new()),
            leads: Arc::new(InMemoryLeadStore::new()),
            bot_settings: Arc::new(InMemoryBotSettingsStore::new()),
            backend: "memory",
        }
    }
}
