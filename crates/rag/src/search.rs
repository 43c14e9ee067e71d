//! Similarity search over the knowledge base

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::chunk::{cosine_similarity, KnowledgeChunk, ScoredChunk};
use crate::RagError;

/// Nearest-neighbour search over knowledge chunks
///
/// Implementations return hits with `score >= threshold`, at most `top_k`,
/// best first.
#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError>;

    /// Backend name for health reporting
    fn name(&self) -> &'static str;
}

/// Brute-force cosine index held in memory
///
/// Used when no Qdrant endpoint is configured, and in tests.
#[derive(Default)]
pub struct InMemoryKnowledgeIndex {
    chunks: RwLock<Vec<KnowledgeChunk>>,
}

impl InMemoryKnowledgeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: Vec<KnowledgeChunk>) -> Self {
        Self {
            chunks: RwLock::new(chunks),
        }
    }

    pub fn insert(&self, chunk: KnowledgeChunk) {
        self.chunks.write().push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }
}

#[async_trait]
impl KnowledgeSearch for InMemoryKnowledgeIndex {
    async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let chunks = self.chunks.read();

        let mut hits: Vec<ScoredChunk> = chunks
            .iter()
            .filter(|c| c.embedding.len() == embedding.len())
            .map(|c| ScoredChunk {
                id: c.id.clone(),
                content: c.content.clone(),
                score: cosine_similarity(&c.embedding, embedding),
                category: c.category.clone(),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();

        // Stable: equal scores keep insertion order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);

        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
