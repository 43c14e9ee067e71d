//! LLM gateway
//!
//! Issues exactly one chat completion per turn. Model-family parameter quirks
//! are handled here and nowhere else.

use std::sync::Arc;
use std::time::Instant;

use lead_assistant_core::{
    ChatMessage, FinishReason, TokenUsage, ToolCall, ToolChoice, ToolDefinition,
};

use crate::backend::{
    ChatCompletionRequest, ChatCompletionResponse, ChatProvider, WireFunction, WireMessage,
    WireTool,
};
use crate::LlmError;

/// Histogram of completion latency in seconds
pub const LLM_LATENCY_METRIC: &str = "lead_assistant_llm_latency_seconds";

/// How a model expects its sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// `max_completion_tokens`, provider-default temperature
    Reasoning,
    /// `max_tokens` plus explicit `temperature`
    Standard,
}

impl ModelFamily {
    pub fn detect(model: &str) -> Self {
        let model = model.trim().to_ascii_lowercase();
        // Fine-tuned ids look like "ft:o4-mini:org::id"
        let base = model.strip_prefix("ft:").unwrap_or(model.as_str());
        const REASONING_PREFIXES: [&str; 4] = ["o1", "o3", "o4", "gpt-5"];
        if REASONING_PREFIXES.iter().any(|p| base.starts_with(p)) {
            ModelFamily::Reasoning
        } else {
            ModelFamily::Standard
        }
    }
}

/// Normalized result of one completion
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Text content; empty when the model only called tools
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: FinishReason,
    pub model: String,
}

impl Completion {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

pub struct LlmGateway {
    provider: Arc<dyn ChatProvider>,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    pub fn model(&self) -> &str {
        self.provider.model_name()
    }

    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    /// Build the provider request for one turn
    pub fn build_request(
        &self,
        system_prompt: &str,
        prior: &[ChatMessage],
        tools: &[ToolDefinition],
        tool_choice: ToolChoice,
        temperature: f32,
        max_tokens: u32,
    ) -> ChatCompletionRequest {
        let model = self.provider.model_name().to_string();

        let mut messages = Vec::with_capacity(prior.len() + 1);
        messages.push(WireMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        });
        messages.extend(prior.iter().map(|m| WireMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));

        let (max_tokens, max_completion_tokens, temperature) = match ModelFamily::detect(&model) {
            ModelFamily::Reasoning => (None, Some(max_tokens), None),
            ModelFamily::Standard => (Some(max_tokens), None, Some(temperature)),
        };

        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            let wire_tools = tools
                .iter()
                .map(|t| WireTool {
                    tool_type: "function",
                    function: WireFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect();
            (Some(wire_tools), Some(tool_choice.as_str().to_string()))
        };

        ChatCompletionRequest {
            model,
            messages,
            max_tokens,
            max_completion_tokens,
            temperature,
            tools,
            tool_choice,
        }
    }

    /// One chat completion: system prompt first, then the prior turns
    pub async fn complete(
        &self,
        system_prompt: &str,
        prior: &[ChatMessage],
        tools: &[ToolDefinition],
        tool_choice: ToolChoice,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        let request =
            self.build_request(system_prompt, prior, tools, tool_choice, temperature, max_tokens);

        let start = Instant::now();
        let result = self.provider.chat(&request).await;
        let elapsed = start.elapsed();

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::histogram!(LLM_LATENCY_METRIC, "outcome" => outcome).record(elapsed.as_secs_f64());

        let response = result.map_err(|e| {
            tracing::error!(error = %e, model = %request.model, "Chat completion failed");
            e
        })?;

        let completion = normalize(response, &request.model)?;

        tracing::debug!(
            model = %completion.model,
            tool_calls = completion.tool_calls.len(),
            content_chars = completion.content.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Chat completion received"
        );

        Ok(completion)
    }
}

fn normalize(response: ChatCompletionResponse, requested_model: &str) -> Result<Completion, LlmError> {
    let usage = response
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));
    let model = response
        .model
        .unwrap_or_else(|| requested_model.to_string());

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|c| ToolCall::new(c.id, c.function.name, c.function.arguments))
        .collect();

    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage,
        finish_reason: FinishReason::from_provider(choice.finish_reason.as_deref()),
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedProvider;
    use serde_json::json;

    fn tool() -> ToolDefinition {
        ToolDefinition::new(
            "schedule_consultation",
            "Schedule a consultation",
            json!({"type": "object", "properties": {}, "required": []}),
        )
    }

    #[test]
    fn test_model_family_detection() {
        for model in ["o1-preview", "o3-mini", "o4-mini", "gpt-5", "gpt-5-mini", "ft:o4-mini:acme::x"] {
            assert_eq!(ModelFamily::detect(model), ModelFamily::Reasoning, "{}", model);
        }
        for model in ["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-3.5-turbo", "llama-3"] {
            assert_eq!(ModelFamily::detect(model), ModelFamily::Standard, "{}", model);
        }
    }

    #[test]
    fn test_standard_model_request() {
        let gateway = LlmGateway::new(Arc::new(ScriptedProvider::new("gpt-4o-mini")));
        let prior = vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hello!")];

        let request = gateway.build_request("SYSTEM", &prior, &[tool()], ToolChoice::Auto, 0.4, 300);

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[0].content, "SYSTEM");
        assert_eq!(request.messages[2].role, "assistant");
        assert_eq!(request.max_tokens, Some(300));
        assert_eq!(request.max_completion_tokens, None);
        assert_eq!(request.temperature, Some(0.4));
        assert_eq!(request.tool_choice.as_deref(), Some("auto"));
        assert_eq!(request.tools.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_reasoning_model_request() {
        let gateway = LlmGateway::new(Arc::new(ScriptedProvider::new("o3-mini")));
        let request =
            gateway.build_request("SYSTEM", &[ChatMessage::user("Hi")], &[], ToolChoice::Auto, 0.4, 300);

        assert_eq!(request.max_tokens, None);
        assert_eq!(request.max_completion_tokens, Some(300));
        assert_eq!(request.temperature, None);
        assert!(request.tools.is_none());
        assert!(request.tool_choice.is_none());
    }

    #[tokio::test]
    async fn test_complete_normalizes_tool_calls() {
        let provider = Arc::new(ScriptedProvider::new("gpt-4o-mini"));
        provider.push_response("", vec![("collect_contact_info", r#"{"name":"Ada","email":"a@b.com"}"#)]);
        let gateway = LlmGateway::new(provider.clone());

        let completion = gateway
            .complete("SYSTEM", &[ChatMessage::user("I'm Ada, a@b.com")], &[tool()], ToolChoice::Auto, 0.7, 500)
            .await
            .unwrap();

        assert!(completion.content.is_empty());
        assert!(completion.has_tool_calls());
        assert_eq!(completion.tool_calls[0].name, "collect_contact_info");
        assert_eq!(completion.finish_reason, FinishReason::ToolCalls);
        assert_eq!(completion.usage.map(|u| u.total_tokens), Some(120));
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_propagates_provider_error() {
        let provider = Arc::new(ScriptedProvider::new("gpt-4o-mini"));
        provider.push_error(LlmError::Api("HTTP 500".to_string()));
        let gateway = LlmGateway::new(provider);

        let result = gateway
            .complete("SYSTEM", &[ChatMessage::user("Hi")], &[], ToolChoice::Auto, 0.7, 500)
            .await;
        assert!(matches!(result, Err(LlmError::Api(_))));
    }
}
