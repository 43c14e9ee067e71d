//! Application State
//!
//! Shared clients are built once at startup and injected here.

use std::sync::Arc;

use lead_assistant_agent::{ChatPipeline, RetrievalParams};
use lead_assistant_config::Settings;
use lead_assistant_llm::{LlmGateway, OpenAIBackend, OpenAIConfig, PromptComposer};
use lead_assistant_persistence::{PersistenceLayer, ScyllaConfig};
use lead_assistant_rag::{
    KnowledgeRetriever, OpenAIEmbedder, OpenAIEmbeddingConfig, VectorStore, VectorStoreConfig,
};

use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub pipeline: Arc<ChatPipeline>,
}

impl AppState {
    pub fn new(config: Settings, pipeline: ChatPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Wire every collaborator from configuration
    ///
    /// Retrieval and persistence degrade instead of failing startup: an
    /// unreachable ScyllaDB falls back to in-memory stores and a missing
    /// vector store disables retrieval.
    pub async fn from_settings(config: Settings) -> Result<Self, ServerError> {
        let backend = OpenAIBackend::new(OpenAIConfig::from_settings(&config.llm))
            .map_err(|e| ServerError::Initialization(e.to_string()))?;
        let gateway = Arc::new(LlmGateway::new(Arc::new(backend)));

        let persistence = init_persistence(&config).await;

        let mut pipeline = ChatPipeline::new(
            gateway,
            persistence,
            config.dispatch.tool_call_policy,
        )
        .map_err(|e| ServerError::Initialization(e.to_string()))?
        .with_composer(PromptComposer::new(config.company.clone()));

        if let Some(retriever) = init_retriever(&config).await {
            pipeline = pipeline.with_retriever(retriever, RetrievalParams::from(&config.rag));
        }

        tracing::info!(
            model = %pipeline.gateway().model(),
            persistence = pipeline.persistence().backend,
            rag_enabled = pipeline.retrieval_enabled(),
            tool_call_policy = ?config.dispatch.tool_call_policy,
            "Initialized application state"
        );

        Ok(Self::new(config, pipeline))
    }
}

async fn init_persistence(config: &Settings) -> PersistenceLayer {
    if !config.persistence.enabled {
        tracing::info!("Persistence disabled, using in-memory stores");
        return PersistenceLayer::in_memory();
    }

    tracing::info!("Initializing ScyllaDB persistence layer...");
    match lead_assistant_persistence::init(ScyllaConfig::from(&config.persistence)).await {
        Ok(layer) => {
            tracing::info!(
                hosts = ?config.persistence.scylla_hosts,
                keyspace = %config.persistence.keyspace,
                "ScyllaDB persistence initialized"
            );
            layer
        },
        Err(e) => {
            tracing::error!(
                error = %e,
                "Failed to initialize ScyllaDB. Falling back to in-memory."
            );
            PersistenceLayer::in_memory()
        },
    }
}

async fn init_retriever(config: &Settings) -> Option<Arc<KnowledgeRetriever>> {
    if !config.rag.enabled {
        tracing::info!("Retrieval disabled");
        return None;
    }

    let Some(vs_config) = VectorStoreConfig::from_settings(&config.rag, &config.embeddings) else {
        tracing::warn!("No Qdrant endpoint configured, retrieval disabled");
        return None;
    };

    let store = match VectorStore::new(vs_config) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to initialize VectorStore. RAG will be disabled.");
            return None;
        },
    };

    // A missing collection is not fatal: searches fail soft per request
    match store.collection_ready().await {
        Ok(true) => {},
        Ok(false) => tracing::warn!(collection = %store.collection(), "Knowledge collection not found"),
        Err(e) => tracing::warn!(error = %e, "Qdrant unreachable at startup"),
    }

    let embedder = match OpenAIEmbedder::new(OpenAIEmbeddingConfig::from_settings(
        &config.embeddings,
        &config.llm,
    )) {
        Ok(embedder) => embedder,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to initialize embedder. RAG will be disabled.");
            return None;
        },
    };

    tracing::info!(
        collection = %store.collection(),
        model = %embedder.model(),
        "VectorStore initialized for RAG"
    );
    Some(Arc::new(KnowledgeRetriever::new(Arc::new(embedder), Arc::new(store))))
}
