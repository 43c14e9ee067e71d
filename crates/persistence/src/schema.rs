//! ScyllaDB schema creation
//!
//! Timestamps are stored as BIGINT epoch milliseconds.

use crate::error::PersistenceError;
use scylla::Session;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    // One row per conversation; messages hold the full transcript as JSON.
    // `version` is only ever written through lightweight transactions.
    let conversations_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.conversations (
            conversation_id TEXT,
            messages_json TEXT,
            lead_status TEXT,
            status TEXT,
            created_at BIGINT,
            updated_at BIGINT,
            version BIGINT,
            PRIMARY KEY (conversation_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(conversations_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create conversations table: {}", e))
        })?;

    let leads_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.leads (
            conversation_id TEXT,
            lead_id TEXT,
            name TEXT,
            email TEXT,
            phone TEXT,
            company TEXT,
            message TEXT,
            project_details_json TEXT,
            status TEXT,
            created_at BIGINT,
            PRIMARY KEY ((conversation_id), lead_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(leads_table, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create leads table: {}", e)))?;

    let bot_settings_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.bot_settings (
            settings_id TEXT,
            settings_json TEXT,
            updated_at BIGINT,
            PRIMARY KEY (settings_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(bot_settings_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create bot_settings table: {}", e))
        })?;

    Ok(())
}
