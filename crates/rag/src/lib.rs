//! Knowledge retrieval for the lead assistant
//!
//! Features:
//! - Query embedding via an OpenAI-compatible API
//! - Dense vector search via Qdrant, with score threshold pushed to the server
//! - In-memory cosine index for development and tests
//! - Non-fatal retriever that degrades to empty context

pub mod chunk;
pub mod embeddings;
pub mod retriever;
pub mod search;
pub mod vector_store;

pub use chunk::{cosine_similarity, KnowledgeChunk, ScoredChunk};
pub use embeddings::{Embedder, OpenAIEmbedder, OpenAIEmbeddingConfig};
pub use retriever::{join_context, KnowledgeRetriever, RETRIEVAL_FAILURES_METRIC};
pub use search::{InMemoryKnowledgeIndex, KnowledgeSearch};
pub use vector_store::{VectorStore, VectorStoreConfig};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl RagError {
    /// Metric label for the failing stage
    pub fn stage(&self) -> &'static str {
        match self {
            RagError::Embedding(_) => "embedding",
            RagError::VectorStore(_) | RagError::Search(_) => "search",
            RagError::Connection(_) => "connection",
        }
    }
}
