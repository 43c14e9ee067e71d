//! Chat pipeline
//!
//! Steps within a turn are strictly ordered. Retrieval and persistence
//! failures degrade the turn; only validation and provider failures abort it.

use std::sync::Arc;

use lead_assistant_config::{RagConfig, ToolCallPolicy};
use lead_assistant_core::{
    last_user_utterance, validate_transcript, BotSettings, BotSettingsPatch, ChatMessage,
    Conversation, MessageMetadata, ToolChoice, ToolDefinition,
};
use lead_assistant_llm::{LlmGateway, ModelFamily, PromptComposer};
use lead_assistant_persistence::{PersistenceLayer, PersistenceReport};
use lead_assistant_rag::{join_context, KnowledgeRetriever};
use lead_assistant_tools::{lead_tools, ToolDispatcher};

use crate::turn::{ChatRequest, TurnOutcome};
use crate::AgentError;

/// Retrieval cut-offs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalParams {
    pub similarity_threshold: f32,
    pub top_k: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self::from(&RagConfig::default())
    }
}

impl From<&RagConfig> for RetrievalParams {
    fn from(config: &RagConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            top_k: config.top_k,
        }
    }
}

pub struct ChatPipeline {
    retriever: Option<Arc<KnowledgeRetriever>>,
    retrieval: RetrievalParams,
    composer: PromptComposer,
    gateway: Arc<LlmGateway>,
    dispatcher: ToolDispatcher,
    tools: Vec<ToolDefinition>,
    persistence: PersistenceLayer,
}

impl ChatPipeline {
    /// Pipeline without retrieval and with the default company facts
    pub fn new(
        gateway: Arc<LlmGateway>,
        persistence: PersistenceLayer,
        policy: ToolCallPolicy,
    ) -> Result<Self, AgentError> {
        let dispatcher = ToolDispatcher::new(persistence.leads.clone(), policy)?;

        Ok(Self {
            retriever: None,
            retrieval: RetrievalParams::default(),
            composer: PromptComposer::default(),
            gateway,
            dispatcher,
            tools: lead_tools(),
            persistence,
        })
    }

    pub fn with_retriever(mut self, retriever: Arc<KnowledgeRetriever>, params: RetrievalParams) -> Self {
        self.retriever = Some(retriever);
        self.retrieval = params;
        self
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn gateway(&self) -> &LlmGateway {
        &self.gateway
    }

    pub fn persistence(&self) -> &PersistenceLayer {
        &self.persistence
    }

    pub fn retrieval_enabled(&self) -> bool {
        self.retriever.is_some()
    }

    /// Stored conversation snapshot, if any
    pub async fn conversation(&self, id: &str) -> Result<Option<Conversation>, AgentError> {
        Ok(self.persistence.conversations.get(id).await?)
    }

    /// Run one chat turn
    ///
    /// The stored snapshot is read before retrieval and completion, so its
    /// version guards the whole turn: a concurrent turn on the same id that
    /// saves first makes this turn's save fail with a conflict.
    pub async fn handle_turn(&self, request: ChatRequest) -> Result<TurnOutcome, AgentError> {
        validate_transcript(&request.messages)?;
        if let Some(overrides) = &request.settings {
            overrides.validate()?;
        }

        // Resolved up front so side effects and the stored snapshot share it
        let conversation_id = request
            .conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut report = PersistenceReport::new();

        let snapshot = self.load_snapshot(&conversation_id, &mut report).await;
        let stored = self.stored_settings(&conversation_id, &mut report).await;
        let settings = BotSettings::effective(stored.as_ref(), request.settings.as_ref());

        let context = self.knowledge_context(&request.messages).await;
        let system_prompt = self.composer.compose(&settings, &context);

        tracing::debug!(
            conversation_id = %conversation_id,
            messages = request.messages.len(),
            context_chars = context.len(),
            personality = ?settings.personality,
            "Running chat turn"
        );

        let completion = self
            .gateway
            .complete(
                &system_prompt,
                &request.messages,
                &self.tools,
                ToolChoice::Auto,
                settings.temperature,
                settings.max_tokens,
            )
            .await?;

        let outcome = self
            .dispatcher
            .dispatch(&completion.content, &completion.tool_calls, Some(&conversation_id))
            .await;
        let qualifies = outcome.qualifies_lead();
        report.merge(outcome.persistence);

        let temperature = match ModelFamily::detect(&completion.model) {
            ModelFamily::Standard => Some(settings.temperature),
            ModelFamily::Reasoning => None,
        };
        let mut message = ChatMessage::assistant(outcome.content).with_metadata(MessageMetadata {
            tokens: completion.usage.map(|u| u.total_tokens),
            model: Some(completion.model.clone()),
            temperature,
        });
        if let Some(call) = outcome.function_calls.into_iter().next() {
            message = message.with_function_call(call);
        }

        let mut transcript = request.messages;
        transcript.push(message.clone());
        if let Some(conversation) = snapshot {
            self.persist(conversation, transcript, qualifies, &mut report)
                .await;
        }

        tracing::info!(
            conversation_id = %conversation_id,
            dispatch = ?outcome.state,
            qualified = qualifies,
            degraded = report.is_degraded(),
            "Chat turn completed"
        );

        Ok(TurnOutcome {
            message,
            conversation_id,
            persistence: report.is_degraded().then_some(report),
        })
    }

    async fn stored_settings(
        &self,
        conversation_id: &str,
        report: &mut PersistenceReport,
    ) -> Option<BotSettingsPatch> {
        match self.persistence.bot_settings.get().await {
            Ok(Some(stored)) => match stored.validate() {
                Ok(()) => Some(stored),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring out-of-range stored bot settings");
                    None
                },
            },
            Ok(None) => None,
            Err(e) => {
                report.record("load_settings", conversation_id, &e);
                None
            },
        }
    }

    /// Snapshot this turn will be saved against
    ///
    /// `None` when the store could not be read; the turn then skips the save.
    async fn load_snapshot(
        &self,
        conversation_id: &str,
        report: &mut PersistenceReport,
    ) -> Option<Conversation> {
        match self.persistence.conversations.get(conversation_id).await {
            Ok(Some(existing)) => Some(existing),
            Ok(None) => Some(Conversation::new(conversation_id, Vec::new())),
            Err(e) => {
                report.record("load_conversation", conversation_id, &e);
                None
            },
        }
    }

    async fn knowledge_context(&self, messages: &[ChatMessage]) -> String {
        let (Some(retriever), Some(query)) = (&self.retriever, last_user_utterance(messages)) else {
            return String::new();
        };

        let chunks = retriever
            .retrieve(query, self.retrieval.similarity_threshold, self.retrieval.top_k)
            .await;
        join_context(&chunks)
    }

    /// Upsert the snapshot against the version read at turn start
    async fn persist(
        &self,
        mut conversation: Conversation,
        transcript: Vec<ChatMessage>,
        qualifies: bool,
        report: &mut PersistenceReport,
    ) {
        conversation.replace_messages(transcript);
        if qualifies {
            conversation.mark_qualified();
        }

        if let Err(e) = self.persistence.conversations.save(&mut conversation).await {
            report.record("save_conversation", &conversation.id, &e);
        }
    }
}
