//! Chat completion providers
//!
//! `ChatProvider` speaks the OpenAI chat-completions wire format. The
//! production implementation is `OpenAIBackend`; `ScriptedProvider` replays
//! canned responses for development and tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use lead_assistant_config::LlmConfig;

use crate::LlmError;

/// Chat completion request body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Token limit parameter used by reasoning models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Chat completion response body
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<WireChoice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct WireChoice {
    pub message: WireResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct WireResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: String,
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    /// JSON document as a string; may be malformed
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

/// A chat-completion endpoint
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError>;

    /// Check if the provider is reachable
    async fn is_available(&self) -> bool;

    /// Configured model identifier
    fn model_name(&self) -> &str;
}

/// Configuration for OpenAI-compatible backends
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API endpoint (OpenAI: https://api.openai.com/v1)
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    /// Organization ID (OpenAI specific)
    pub organization: Option<String>,
}

impl OpenAIConfig {
    pub fn from_settings(llm: &LlmConfig) -> Self {
        Self {
            endpoint: llm.endpoint.clone(),
            api_key: llm.api_key.clone(),
            model: llm.model.clone(),
            timeout: Duration::from_secs(llm.timeout_seconds),
            organization: llm.organization.clone(),
        }
    }
}

/// OpenAI-compatible backend
///
/// Works with OpenAI, vLLM, and local servers exposing `/chat/completions`.
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        let is_local = config.endpoint.starts_with("http://localhost")
            || config.endpoint.starts_with("http://127.0.0.1");
        if config.api_key.as_deref().map_or(true, str::is_empty) && !is_local {
            return Err(LlmError::Configuration(
                "API key required for remote endpoints".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.endpoint.trim_end_matches('/'))
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        use reqwest::header::HeaderValue;

        let mut headers = reqwest::header::HeaderMap::new();

        if let Some(ref key) = self.config.api_key {
            if let Ok(val) = HeaderValue::from_str(&format!("Bearer {}", key)) {
                headers.insert(reqwest::header::AUTHORIZATION, val);
            }
        }

        if let Some(ref org) = self.config.organization {
            if let Ok(val) = HeaderValue::from_str(org) {
                headers.insert("OpenAI-Organization", val);
            }
        }

        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        headers
    }
}

#[async_trait]
impl ChatProvider for OpenAIBackend {
    async fn chat(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if body.choices.is_empty() {
            return Err(LlmError::InvalidResponse("No choices in response".to_string()));
        }

        Ok(body)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.models_url())
            .headers(self.build_headers())
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Replays queued responses in order and records every request
///
/// Once the queue is empty every call fails with `LlmError::Api`.
pub struct ScriptedProvider {
    model: String,
    responses: Mutex<VecDeque<Result<ChatCompletionResponse, LlmError>>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a plain text reply
    pub fn push_text(&self, content: &str) -> &Self {
        self.push_response(content, Vec::new())
    }

    /// Queue a reply with tool calls given as `(name, arguments)`
    pub fn push_response(&self, content: &str, tool_calls: Vec<(&str, &str)>) -> &Self {
        let tool_calls: Vec<WireToolCall> = tool_calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, arguments))| WireToolCall {
                id: format!("call_{}", i),
                function: WireFunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            })
            .collect();
        let finish_reason = if tool_calls.is_empty() { "stop" } else { "tool_calls" };

        let response = ChatCompletionResponse {
            model: Some(self.model.clone()),
            choices: vec![WireChoice {
                message: WireResponseMessage {
                    content: if content.is_empty() { None } else { Some(content.to_string()) },
                    tool_calls,
                },
                finish_reason: Some(finish_reason.to_string()),
            }],
            usage: Some(WireUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
            }),
        };
        self.responses.lock().push_back(Ok(response));
        self
    }

    /// Queue a failure
    pub fn push_error(&self, error: LlmError) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Api("No scripted response left".to_string())))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>, endpoint: &str) -> OpenAIConfig {
        OpenAIConfig {
            endpoint: endpoint.to_string(),
            api_key: api_key.map(str::to_string),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(5),
            organization: Some("org-123".to_string()),
        }
    }

    #[test]
    fn test_remote_endpoint_requires_key() {
        assert!(OpenAIBackend::new(config(None, "https://api.openai.com/v1")).is_err());
        assert!(OpenAIBackend::new(config(None, "http://localhost:8000/v1")).is_ok());
    }

    #[test]
    fn test_headers_and_url() {
        let backend = OpenAIBackend::new(config(Some("sk-test"), "https://api.openai.com/v1/")).unwrap();
        assert_eq!(backend.chat_url(), "https://api.openai.com/v1/chat/completions");

        let headers = backend.build_headers();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
        assert_eq!(headers.get("openai-organization").unwrap(), "org-123");
    }

    #[test]
    fn test_response_with_tool_calls_deserializes() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "collect_contact_info", "arguments": "{\"name\":\"Ada\",\"email\":\"a@b.com\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 50, "completion_tokens": 10, "total_tokens": 60}
        }"#;

        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let message = &response.choices[0].message;
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls[0].function.name, "collect_contact_info");
        assert!(message.tool_calls[0].function.arguments.contains("a@b.com"));
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let request = ChatCompletionRequest {
            model: "o3-mini".to_string(),
            messages: vec![WireMessage {
                role: "system".to_string(),
                content: "hi".to_string(),
            }],
            max_tokens: None,
            max_completion_tokens: Some(500),
            temperature: None,
            tools: None,
            tool_choice: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("tools").is_none());
        assert_eq!(json["max_completion_tokens"], 500);
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new("gpt-4o-mini");
        provider.push_text("first").push_response("", vec![("schedule_consultation", "{}")]);

        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: Vec::new(),
            max_tokens: Some(10),
            max_completion_tokens: None,
            temperature: Some(0.7),
            tools: None,
            tool_choice: None,
        };

        let first = provider.chat(&request).await.unwrap();
        assert_eq!(first.choices[0].message.content.as_deref(), Some("first"));

        let second = provider.chat(&request).await.unwrap();
        assert!(second.choices[0].message.content.is_none());
        assert_eq!(second.choices[0].message.tool_calls.len(), 1);

        assert!(provider.chat(&request).await.is_err());
        assert_eq!(provider.requests().len(), 3);
    }
}
