//! Knowledge retriever
//!
//! Embeds the latest user utterance and returns the content of the most
//! similar knowledge chunks. Retrieval never fails a chat turn: any error is
//! logged, counted and turned into an empty result.

use std::sync::Arc;
use std::time::Instant;

use crate::chunk::ScoredChunk;
use crate::embeddings::Embedder;
use crate::search::KnowledgeSearch;
use crate::RagError;

/// Counter incremented for each retrieval that degraded to empty context
pub const RETRIEVAL_FAILURES_METRIC: &str = "lead_assistant_retrieval_failures_total";

pub struct KnowledgeRetriever {
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn KnowledgeSearch>,
}

impl KnowledgeRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, search: Arc<dyn KnowledgeSearch>) -> Self {
        Self { embedder, search }
    }

    /// Content strings of the best matches, best first
    ///
    /// Blank queries skip retrieval. Failures yield an empty list.
    pub async fn retrieve(&self, query: &str, threshold: f32, top_k: usize) -> Vec<String> {
        match self.try_retrieve(query, threshold, top_k).await {
            Ok(hits) => hits.into_iter().map(|hit| hit.content).collect(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.search.name(),
                    "Knowledge retrieval failed, continuing without context"
                );
                metrics::counter!(RETRIEVAL_FAILURES_METRIC, "stage" => e.stage()).increment(1);
                Vec::new()
            },
        }
    }

    /// Like `retrieve`, but surfaces errors and scores
    pub async fn try_retrieve(
        &self,
        query: &str,
        threshold: f32,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let query = query.trim();
        if query.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let embedding = self.embedder.embed(query).await?;
        let mut hits = self.search.search(&embedding, threshold, top_k).await?;

        // Backends are trusted for neither filtering nor ordering
        hits.retain(|hit| hit.score >= threshold);
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);

        tracing::debug!(
            hits = hits.len(),
            threshold,
            top_k,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Knowledge retrieval complete"
        );

        Ok(hits)
    }
}

/// Join retrieved chunks into the prompt's knowledge context
pub fn join_context(chunks: &[String]) -> String {
    chunks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::KnowledgeChunk;
    use crate::search::InMemoryKnowledgeIndex;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps a few keywords onto fixed 2-d vectors
    struct KeywordEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("price") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }

        fn dim(&self) -> usize {
            2
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
            Err(RagError::Embedding("connection refused".to_string()))
        }

        fn dim(&self) -> usize {
            2
        }
    }

    struct UnorderedSearch;

    #[async_trait]
    impl KnowledgeSearch for UnorderedSearch {
        async fn search(
            &self,
            _embedding: &[f32],
            _threshold: f32,
            _top_k: usize,
        ) -> Result<Vec<ScoredChunk>, RagError> {
            let hit = |id: &str, score: f32| ScoredChunk {
                id: id.to_string(),
                content: id.to_string(),
                score,
                category: None,
            };
            Ok(vec![hit("low", 0.1), hit("mid", 0.75), hit("high", 0.9), hit("mid2", 0.75)])
        }

        fn name(&self) -> &'static str {
            "unordered"
        }
    }

    fn index() -> Arc<InMemoryKnowledgeIndex> {
        Arc::new(InMemoryKnowledgeIndex::with_chunks(vec![
            KnowledgeChunk::new("p", "A basic website costs a fixed range", vec![1.0, 0.0]),
            KnowledgeChunk::new("t", "Typical timelines are 4-8 weeks", vec![0.0, 1.0]),
        ]))
    }

    #[tokio::test]
    async fn test_retrieve_returns_matching_content() {
        let retriever = KnowledgeRetriever::new(
            Arc::new(KeywordEmbedder { calls: AtomicUsize::new(0) }),
            index(),
        );
        let context = retriever.retrieve("what is the price?", 0.7, 5).await;
        assert_eq!(context, vec!["A basic website costs a fixed range".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_query_skips_embedding() {
        let embedder = Arc::new(KeywordEmbedder { calls: AtomicUsize::new(0) });
        let retriever = KnowledgeRetriever::new(embedder.clone(), index());

        assert!(retriever.retrieve("   ", 0.7, 5).await.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_empty() {
        let retriever = KnowledgeRetriever::new(Arc::new(FailingEmbedder), index());
        assert!(retriever.retrieve("price", 0.7, 5).await.is_empty());
        assert!(retriever.try_retrieve("price", 0.7, 5).await.is_err());
    }

    #[tokio::test]
    async fn test_backend_results_are_filtered_and_sorted_stably() {
        let retriever = KnowledgeRetriever::new(
            Arc::new(KeywordEmbedder { calls: AtomicUsize::new(0) }),
            Arc::new(UnorderedSearch),
        );
        let context = retriever.retrieve("anything", 0.5, 2).await;
        assert_eq!(context, vec!["high".to_string(), "mid".to_string()]);
    }

    #[test]
    fn test_join_context() {
        assert_eq!(join_context(&[]), "");
        assert_eq!(join_context(&["a".to_string(), "b".to_string()]), "a\n\nb");
    }
}
