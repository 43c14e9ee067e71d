//! ScyllaDB session shared by the stores

use std::sync::Arc;

use lead_assistant_config::PersistenceConfig;
use scylla::{Session, SessionBuilder};

use crate::error::PersistenceError;
use crate::schema;

/// Cluster and keyspace the stores write to
#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub replication_factor: u8,
}

impl From<&PersistenceConfig> for ScyllaConfig {
    fn from(config: &PersistenceConfig) -> Self {
        Self {
            hosts: config.scylla_hosts.clone(),
            keyspace: config.keyspace.clone(),
            replication_factor: config.replication_factor,
        }
    }
}

/// Session plus the keyspace every query is qualified with
#[derive(Clone)]
pub struct ScyllaClient {
    session: Arc<Session>,
    keyspace: Arc<str>,
}

impl ScyllaClient {
    /// Connect and ensure the keyspace and tables exist
    pub async fn open(config: &ScyllaConfig) -> Result<Self, PersistenceError> {
        tracing::info!(hosts = ?config.hosts, keyspace = %config.keyspace, "Connecting to ScyllaDB");

        let session = SessionBuilder::new().known_nodes(&config.hosts).build().await?;

        schema::create_keyspace(&session, &config.keyspace, config.replication_factor).await?;
        schema::create_tables(&session, &config.keyspace).await?;
        tracing::info!(keyspace = %config.keyspace, "Schema ensured");

        Ok(Self {
            session: Arc::new(session),
            keyspace: Arc::from(config.keyspace.as_str()),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }
}
