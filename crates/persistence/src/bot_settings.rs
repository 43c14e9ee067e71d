//! Stored bot settings
//!
//! A single row keyed `default` holds the operator's overrides as a partial
//! settings document. The chat service only reads it; operators write the
//! row out of band. Request-level overrides are layered on top by the caller.

use async_trait::async_trait;
use parking_lot::RwLock;

use lead_assistant_core::BotSettingsPatch;

use crate::{PersistenceError, ScyllaClient};

/// Key of the settings row
pub const DEFAULT_SETTINGS_ID: &str = "default";

#[async_trait]
pub trait BotSettingsStore: Send + Sync {
    /// Stored overrides, `None` when nothing was configured
    async fn get(&self) -> Result<Option<BotSettingsPatch>, PersistenceError>;
}

#[derive(Default)]
pub struct InMemoryBotSettingsStore {
    settings: RwLock<Option<BotSettingsPatch>>,
}

impl InMemoryBotSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: BotSettingsPatch) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
        }
    }
}

#[async_trait]
impl BotSettingsStore for InMemoryBotSettingsStore {
    async fn get(&self) -> Result<Option<BotSettingsPatch>, PersistenceError> {
        Ok(self.settings.read().clone())
    }
}

#[derive(Clone)]
pub struct ScyllaBotSettingsStore {
    client: ScyllaClient,
}

impl ScyllaBotSettingsStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BotSettingsStore for ScyllaBotSettingsStore {
    async fn get(&self) -> Result<Option<BotSettingsPatch>, PersistenceError> {
        let query = format!(
            "SELECT settings_json FROM {}.bot_settings WHERE settings_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (DEFAULT_SETTINGS_ID,))
            .await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let (settings_json,): (Option<String>,) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return match settings_json {
                    Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                    None => Ok(None),
                };
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_assistant_core::Personality;

    #[tokio::test]
    async fn test_in_memory_get() {
        assert!(InMemoryBotSettingsStore::new().get().await.unwrap().is_none());

        let store = InMemoryBotSettingsStore::with_settings(BotSettingsPatch {
            personality: Some(Personality::Friendly),
            ..Default::default()
        });

        let stored = store.get().await.unwrap().unwrap();
        assert_eq!(stored.personality, Some(Personality::Friendly));
        assert!(stored.temperature.is_none());
    }
}
