//! Lead persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scylla::frame::response::result::Row;

use lead_assistant_core::{ContactInfo, Lead, LeadRecordStatus};

use crate::{PersistenceError, ScyllaClient};

/// Lead store trait
///
/// Inserts are append-only: one row per capture, no dedup.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn insert(&self, lead: &Lead) -> Result<(), PersistenceError>;

    async fn list_for_conversation(&self, conversation_id: &str) -> Result<Vec<Lead>, PersistenceError>;
}

#[derive(Default)]
pub struct InMemoryLeadStore {
    leads: RwLock<Vec<Lead>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.leads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.read().is_empty()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn insert(&self, lead: &Lead) -> Result<(), PersistenceError> {
        self.leads.write().push(lead.clone());
        Ok(())
    }

    async fn list_for_conversation(&self, conversation_id: &str) -> Result<Vec<Lead>, PersistenceError> {
        Ok(self
            .leads
            .read()
            .iter()
            .filter(|l| l.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

/// ScyllaDB implementation of lead store
#[derive(Clone)]
pub struct ScyllaLeadStore {
    client: ScyllaClient,
}

impl ScyllaLeadStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn row_to_lead(&self, row: Row) -> Result<Lead, PersistenceError> {
        let (
            conversation_id,
            lead_id,
            name,
            email,
            phone,
            company,
            message,
            project_details_json,
            status,
            created_at,
        ): (
            String,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            i64,
        ) = row
            .into_typed()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        let project_details = match project_details_json {
            Some(json) => serde_json::from_str(&json)?,
            None => serde_json::Value::Object(Default::default()),
        };

        Ok(Lead {
            id: lead_id,
            conversation_id,
            contact_info: ContactInfo {
                name: name.unwrap_or_default(),
                email: email.unwrap_or_default(),
                phone,
                company,
                message,
            },
            project_details,
            status: LeadRecordStatus::parse(status.as_deref().unwrap_or_default()),
            created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl LeadStore for ScyllaLeadStore {
    async fn insert(&self, lead: &Lead) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.leads (
                conversation_id, lead_id, name, email, phone, company, message,
                project_details_json, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        let project_details_json = serde_json::to_string(&lead.project_details)?;
        let contact = &lead.contact_info;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &lead.conversation_id,
                    &lead.id,
                    &contact.name,
                    &contact.email,
                    &contact.phone,
                    &contact.company,
                    &contact.message,
                    &project_details_json,
                    lead.status.as_str(),
                    lead.created_at.timestamp_millis(),
                ),
            )
            .await?;

        tracing::info!(
            lead_id = %lead.id,
            conversation_id = %lead.conversation_id,
            "Lead created in ScyllaDB"
        );

        Ok(())
    }

    async fn list_for_conversation(&self, conversation_id: &str) -> Result<Vec<Lead>, PersistenceError> {
        let query = format!(
            "SELECT conversation_id, lead_id, name, email, phone, company, message,
                    project_details_json, status, created_at
             FROM {}.leads WHERE conversation_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (conversation_id,))
            .await?;

        let mut leads = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                leads.push(self.row_to_lead(row)?);
            }
        }
        leads.sort_by_key(|l| l.created_at);

        Ok(leads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(conversation_id: &str, email: &str) -> Lead {
        Lead::new(
            conversation_id,
            ContactInfo {
                name: "Ada".to_string(),
                email: email.to_string(),
                phone: None,
                company: None,
                message: None,
            },
        )
    }

    #[tokio::test]
    async fn test_insert_is_append_only() {
        let store = InMemoryLeadStore::new();
        store.insert(&lead("c1", "a@b.com")).await.unwrap();
        store.insert(&lead("c1", "a@b.com")).await.unwrap();
        store.insert(&lead("c2", "x@y.com")).await.unwrap();

        assert_eq!(store.len(), 3);
        let c1 = store.list_for_conversation("c1").await.unwrap();
        assert_eq!(c1.len(), 2);
        assert!(c1.iter().all(|l| l.status == LeadRecordStatus::New));
        assert!(store.list_for_conversation("none").await.unwrap().is_empty());
    }
}
