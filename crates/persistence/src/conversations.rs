//! Conversation snapshot persistence
//!
//! Every save writes the whole transcript. Saves are guarded by the
//! snapshot's `version`: a store accepts a snapshot only if its version
//! matches the stored one (0 for a conversation that does not exist yet),
//! and bumps the version on success.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scylla::frame::response::result::{CqlValue, Row};
use std::collections::HashMap;

use lead_assistant_core::{ChatMessage, Conversation, ConversationStatus, LeadStatus};

use crate::{PersistenceError, ScyllaClient};

/// Conversation store trait
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Conversation>, PersistenceError>;

    /// Upsert the full snapshot
    ///
    /// On success `conversation.version` is advanced to the stored version.
    /// A stale version yields `PersistenceError::Conflict` and leaves the
    /// stored snapshot untouched.
    async fn save(&self, conversation: &mut Conversation) -> Result<(), PersistenceError>;
}

/// In-memory conversation store
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, id: &str) -> Result<Option<Conversation>, PersistenceError> {
        Ok(self.conversations.read().get(id).cloned())
    }

    async fn save(&self, conversation: &mut Conversation) -> Result<(), PersistenceError> {
        let mut conversations = self.conversations.write();

        let stored_version = conversations.get(&conversation.id).map_or(0, |c| c.version);
        if stored_version != conversation.version {
            return Err(PersistenceError::Conflict {
                id: conversation.id.clone(),
                expected: conversation.version,
            });
        }

        conversation.version += 1;
        conversations.insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }
}

/// ScyllaDB implementation of conversation store
#[derive(Clone)]
pub struct ScyllaConversationStore {
    client: ScyllaClient,
}

impl ScyllaConversationStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn row_to_conversation(&self, row: Row) -> Result<Conversation, PersistenceError> {
        let (id, messages_json, lead_status, status, created_at, updated_at, version): (
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            i64,
            i64,
            i64,
        ) = row
            .into_typed()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        let messages: Vec<ChatMessage> = match messages_json {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };

        Ok(Conversation {
            id,
            messages,
            lead_status: LeadStatus::parse(lead_status.as_deref().unwrap_or_default()),
            status: ConversationStatus::parse(status.as_deref().unwrap_or_default()),
            created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_else(Utc::now),
            version: u64::try_from(version)
                .map_err(|_| PersistenceError::InvalidData(format!("negative version {}", version)))?,
        })
    }
}

/// Read the `[applied]` column of a lightweight-transaction result
fn lwt_applied(rows: Option<Vec<Row>>) -> Result<bool, PersistenceError> {
    let row = rows
        .and_then(|rows| rows.into_iter().next())
        .ok_or_else(|| PersistenceError::InvalidData("LWT returned no rows".to_string()))?;

    match row.columns.first() {
        Some(Some(CqlValue::Boolean(applied))) => Ok(*applied),
        other => Err(PersistenceError::InvalidData(format!(
            "Unexpected [applied] column: {:?}",
            other
        ))),
    }
}

#[async_trait]
impl ConversationStore for ScyllaConversationStore {
    async fn get(&self, id: &str) -> Result<Option<Conversation>, PersistenceError> {
        let query = format!(
            "SELECT conversation_id, messages_json, lead_status, status, created_at, updated_at, version
             FROM {}.conversations WHERE conversation_id = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (id,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                return Ok(Some(self.row_to_conversation(row)?));
            }
        }

        Ok(None)
    }

    async fn save(&self, conversation: &mut Conversation) -> Result<(), PersistenceError> {
        let messages_json = serde_json::to_string(&conversation.messages)?;
        let expected = conversation.version;
        let next = expected + 1;
        let next_version = i64::try_from(next)
            .map_err(|_| PersistenceError::InvalidData(format!("version overflow {}", next)))?;
        let expected_version = next_version - 1;

        let result = if expected == 0 {
            let query = format!(
                "INSERT INTO {}.conversations (
                    conversation_id, messages_json, lead_status, status,
                    created_at, updated_at, version
                ) VALUES (?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
                self.client.keyspace()
            );
            self.client
                .session()
                .query_unpaged(
                    query,
                    (
                        &conversation.id,
                        &messages_json,
                        conversation.lead_status.as_str(),
                        conversation.status.as_str(),
                        conversation.created_at.timestamp_millis(),
                        conversation.updated_at.timestamp_millis(),
                        next_version,
                    ),
                )
                .await?
        } else {
            let query = format!(
                "UPDATE {}.conversations
                 SET messages_json = ?, lead_status = ?, status = ?, updated_at = ?, version = ?
                 WHERE conversation_id = ? IF version = ?",
                self.client.keyspace()
            );
            self.client
                .session()
                .query_unpaged(
                    query,
                    (
                        &messages_json,
                        conversation.lead_status.as_str(),
                        conversation.status.as_str(),
                        conversation.updated_at.timestamp_millis(),
                        next_version,
                        &conversation.id,
                        expected_version,
                    ),
                )
                .await?
        };

        if !lwt_applied(result.rows)? {
            return Err(PersistenceError::Conflict {
                id: conversation.id.clone(),
                expected,
            });
        }

        conversation.version = next;

        tracing::debug!(
            conversation_id = %conversation.id,
            messages = conversation.messages.len(),
            version = conversation.version,
            "Conversation saved to ScyllaDB"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_get() {
        let store = InMemoryConversationStore::new();
        let mut conversation = Conversation::new("c1", vec![ChatMessage::user("Hello")]);

        store.save(&mut conversation).await.unwrap();
        assert_eq!(conversation.version, 1);

        let stored = store.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.version, 1);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saving_same_snapshot_twice_keeps_one_record() {
        let store = InMemoryConversationStore::new();
        let mut conversation = Conversation::new("c1", vec![ChatMessage::user("Hello")]);

        store.save(&mut conversation).await.unwrap();
        conversation
            .messages
            .push(ChatMessage::assistant("Hi! How can I help?"));
        store.save(&mut conversation).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_rejected() {
        let store = InMemoryConversationStore::new();
        let mut first = Conversation::new("c1", vec![ChatMessage::user("Hello")]);
        store.save(&mut first).await.unwrap();

        // Two writers read version 1
        let mut writer_a = store.get("c1").await.unwrap().unwrap();
        let mut writer_b = writer_a.clone();

        writer_a.messages.push(ChatMessage::assistant("from A"));
        store.save(&mut writer_a).await.unwrap();

        writer_b.messages.push(ChatMessage::assistant("from B"));
        let err = store.save(&mut writer_b).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(writer_b.version, 1);

        let stored = store.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.messages.last().unwrap().content, "from A");
    }

    #[tokio::test]
    async fn test_new_snapshot_conflicts_with_existing_conversation() {
        let store = InMemoryConversationStore::new();
        store
            .save(&mut Conversation::new("c1", Vec::new()))
            .await
            .unwrap();

        let mut fresh = Conversation::new("c1", vec![ChatMessage::user("again")]);
        assert!(store.save(&mut fresh).await.unwrap_err().is_conflict());
    }

    #[test]
    fn test_lwt_applied_parsing() {
        let applied = Row {
            columns: vec![Some(CqlValue::Boolean(true))],
        };
        let rejected = Row {
            columns: vec![Some(CqlValue::Boolean(false)), Some(CqlValue::BigInt(3))],
        };
        assert!(lwt_applied(Some(vec![applied])).unwrap());
        assert!(!lwt_applied(Some(vec![rejected])).unwrap());
        assert!(lwt_applied(None).is_err());
    }
}
