//! Vector Store using Qdrant
//!
//! Read-only similarity search over the knowledge collection. Population of
//! the collection is done by the ingestion job, not here.

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{point_id::PointIdOptions, value::Kind, PointId, SearchPointsBuilder},
    Qdrant,
};

use lead_assistant_config::{constants::endpoints, EmbeddingConfig, RagConfig};

use crate::chunk::ScoredChunk;
use crate::search::KnowledgeSearch;
use crate::RagError;

/// Vector store configuration
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub endpoint: String,
    pub collection: String,
    pub vector_dim: usize,
    pub api_key: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::QDRANT_DEFAULT.to_string(),
            collection: "knowledge_base".to_string(),
            vector_dim: 1536,
            api_key: None,
        }
    }
}

impl VectorStoreConfig {
    /// `None` when no Qdrant endpoint is configured
    pub fn from_settings(rag: &RagConfig, embeddings: &EmbeddingConfig) -> Option<Self> {
        rag.qdrant_endpoint.as_ref().map(|endpoint| Self {
            endpoint: endpoint.clone(),
            collection: rag.collection.clone(),
            vector_dim: embeddings.dimensions,
            api_key: rag.qdrant_api_key.clone(),
        })
    }
}

/// Vector store client
pub struct VectorStore {
    client: Qdrant,
    config: VectorStoreConfig,
}

impl VectorStore {
    /// Create a new vector store connection
    pub fn new(config: VectorStoreConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&config.endpoint);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }

        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Whether the knowledge collection exists
    pub async fn collection_ready(&self) -> Result<bool, RagError> {
        self.client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }
}

fn point_id_to_string(id: Option<PointId>) -> String {
    id.and_then(|pid| pid.point_id_options)
        .map(|opts| match opts {
            PointIdOptions::Uuid(u) => u,
            PointIdOptions::Num(n) => n.to_string(),
        })
        .unwrap_or_default()
}

#[async_trait]
impl KnowledgeSearch for VectorStore {
    async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if embedding.len() != self.config.vector_dim {
            return Err(RagError::Search(format!(
                "Query has {} dimensions, collection expects {}",
                embedding.len(),
                self.config.vector_dim
            )));
        }

        let request = SearchPointsBuilder::new(
            &self.config.collection,
            embedding.to_vec(),
            top_k as u64,
        )
        .score_threshold(threshold)
        .with_payload(true);

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        let hits = results
            .result
            .into_iter()
            .map(|point| {
                let mut content = String::new();
                let mut category = None;

                for (key, value) in point.payload {
                    // Chunk text is stored under "text" by the ingestion job
                    match (key.as_str(), value.kind) {
                        ("text", Some(Kind::StringValue(s))) | ("content", Some(Kind::StringValue(s))) => {
                            content = s
                        },
                        ("category", Some(Kind::StringValue(s))) => category = Some(s),
                        _ => {},
                    }
                }

                ScoredChunk {
                    id: point_id_to_string(point.id),
                    content,
                    score: point.score,
                    category,
                }
            })
            .filter(|hit| !hit.content.is_empty())
            .collect();

        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "qdrant"
    }
}
