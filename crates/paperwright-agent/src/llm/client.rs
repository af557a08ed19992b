//! Multi-provider LLM client.
//!
//! Supports the **Anthropic Messages API** and the **OpenAI Chat Completions
//! API** (including OpenAI-compatible endpoints such as DeepSeek, OpenRouter,
//! and Ollama) in non-streaming mode.  The agent protocol is plain text, so
//! the client only sends a system prompt plus a conversation and returns the
//! generated text.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::llm::types::Message;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default Anthropic API base URL.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Provider enum
// ---------------------------------------------------------------------------

/// Identifies which wire protocol the client should speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI Chat Completions API (also covers OpenAI-compatible endpoints).
    #[serde(alias = "openai-compatible")]
    OpenAI,
}

impl LlmProvider {
    /// Default base URL for this provider.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Anthropic => ANTHROPIC_BASE_URL,
            Self::OpenAI => OPENAI_BASE_URL,
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to a single LLM endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Which provider this configuration targets.
    pub provider: LlmProvider,
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API (e.g. `https://api.anthropic.com`).
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

impl LlmClientConfig {
    /// Create a configuration for the Anthropic Claude API.
    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Anthropic,
            api_key: api_key.into(),
            base_url: ANTHROPIC_BASE_URL.to_owned(),
            model: model.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }

    /// Create a configuration for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_owned(),
            model: model.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }

    /// Create a configuration for any OpenAI-compatible API (e.g. DeepSeek,
    /// OpenRouter, Ollama).
    pub fn openai_compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// An LLM client that communicates with either the Anthropic Messages API or
/// the OpenAI Chat Completions API.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmClientConfig,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: config.provider.to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { config, http })
    }

    /// Returns the provider this client speaks to.
    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    /// Returns the model this client requests.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a system prompt plus conversation and return the generated text.
    pub async fn complete(&self, system: &str, messages: &[Message]) -> Result<String> {
        let (url, headers, body) = match self.config.provider {
            LlmProvider::Anthropic => (
                format!("{}/v1/messages", self.config.base_url.trim_end_matches('/')),
                self.anthropic_headers()?,
                self.build_anthropic_request_body(system, messages),
            ),
            LlmProvider::OpenAI => (
                format!(
                    "{}/chat/completions",
                    self.config.base_url.trim_end_matches('/')
                ),
                self.openai_headers()?,
                self.build_openai_request_body(system, messages),
            ),
        };

        tracing::debug!(
            url = %url,
            model = %self.config.model,
            provider = %self.config.provider,
            message_count = messages.len(),
            "sending LLM request"
        );

        let resp = self
            .http
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(AgentError::LlmRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON response: {e}"),
        })?;

        match self.config.provider {
            LlmProvider::Anthropic => parse_anthropic_response(&v),
            LlmProvider::OpenAI => parse_openai_response(&v),
        }
    }

    // =======================================================================
    // Anthropic
    // =======================================================================

    /// Build the JSON body for the Anthropic Messages API.
    ///
    /// Anthropic expects the system prompt as a top-level field rather than
    /// inside the `messages` array.
    fn build_anthropic_request_body(&self, system: &str, messages: &[Message]) -> Value {
        let wire: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": wire,
        });

        if !system.is_empty() {
            body["system"] = json!(system);
        }

        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }

        body
    }

    fn anthropic_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key).map_err(|e| {
                AgentError::LlmRequestFailed {
                    reason: format!("invalid API key header: {e}"),
                }
            })?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    // =======================================================================
    // OpenAI
    // =======================================================================

    /// Build the JSON body for the OpenAI Chat Completions API.
    ///
    /// In the OpenAI format the system prompt is the first entry of the
    /// `messages` array.
    fn build_openai_request_body(&self, system: &str, messages: &[Message]) -> Value {
        let mut wire: Vec<Value> = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            wire.push(json!({ "role": "system", "content": system }));
        }
        wire.extend(
            messages
                .iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
        );

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": wire,
        });

        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }

        body
    }

    fn openai_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("invalid authorization header: {e}"),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

// ===========================================================================
// Response parsing (free functions)
// ===========================================================================

/// Parse a non-streaming Anthropic Messages API response into its text.
fn parse_anthropic_response(v: &Value) -> Result<String> {
    let content = v["content"]
        .as_array()
        .ok_or_else(|| AgentError::LlmParseFailed {
            reason: "missing `content` array in response".into(),
        })?;

    let text: String = content
        .iter()
        .filter(|block| block["type"].as_str() == Some("text"))
        .filter_map(|block| block["text"].as_str())
        .collect();

    Ok(text)
}

/// Parse a non-streaming OpenAI Chat Completions API response into its text.
fn parse_openai_response(v: &Value) -> Result<String> {
    let message = &v["choices"][0]["message"];

    if message.is_null() {
        return Err(AgentError::LlmParseFailed {
            reason: "missing `choices[0].message` in response".into(),
        });
    }

    Ok(message["content"].as_str().unwrap_or_default().to_owned())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Vec<Message> {
        vec![
            Message::user("Polish this text"),
            Message::assistant("Thought: count it"),
            Message::user("Observation: Word count: 2"),
        ]
    }

    // -- Anthropic -----------------------------------------------------------

    #[test]
    fn build_anthropic_request_body_basic() {
        let config = LlmClientConfig::anthropic("test-key", "claude-sonnet-4-20250514");
        let client = LlmClient::new(config).unwrap();

        let body = client.build_anthropic_request_body("You are an editor.", &conversation());

        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["system"], "You are an editor.");

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[2]["content"], "Observation: Word count: 2");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn anthropic_body_omits_empty_system() {
        let config = LlmClientConfig::anthropic("test-key", "claude-sonnet-4-20250514");
        let client = LlmClient::new(config).unwrap();

        let body = client.build_anthropic_request_body("", &conversation());
        assert!(body.get("system").is_none());
    }

    #[test]
    fn empty_api_key_returns_error() {
        let config = LlmClientConfig::anthropic("", "claude-sonnet-4-20250514");
        let result = LlmClient::new(config);
        assert!(matches!(result, Err(AgentError::MissingApiKey { .. })));
    }

    #[test]
    fn parse_non_streaming_anthropic_text_response() {
        let response_json = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Thought: done\n"},
                {"type": "text", "text": "Final Answer: ok"}
            ],
            "stop_reason": "end_turn"
        });

        let text = parse_anthropic_response(&response_json).unwrap();
        assert_eq!(text, "Thought: done\nFinal Answer: ok");
    }

    #[test]
    fn parse_anthropic_missing_content_is_error() {
        let result = parse_anthropic_response(&json!({"type": "error"}));
        assert!(matches!(result, Err(AgentError::LlmParseFailed { .. })));
    }

    // -- OpenAI --------------------------------------------------------------

    #[test]
    fn openai_config_construction() {
        let config = LlmClientConfig::openai("sk-test-key", "gpt-4o");
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.api_key, "sk-test-key");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn openai_compatible_config_construction() {
        let config = LlmClientConfig::openai_compatible(
            "local-key",
            "deepseek-chat",
            "https://api.deepseek.com/v1",
        );
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.base_url, "https://api.deepseek.com/v1");
    }

    #[test]
    fn build_openai_request_body_puts_system_first() {
        let mut config = LlmClientConfig::openai("sk-test", "gpt-4o");
        config.temperature = Some(0.5);
        config.max_tokens = 2048;
        let client = LlmClient::new(config).unwrap();

        let body = client.build_openai_request_body("You are an editor.", &conversation());

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 2048);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are an editor.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");

        let temp = body["temperature"].as_f64().unwrap();
        assert!((temp - 0.5).abs() < 1e-6);
    }

    #[test]
    fn parse_openai_text_response() {
        let response_json = json!({
            "id": "chatcmpl-abc",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello from OpenAI!"},
                "finish_reason": "stop"
            }]
        });

        let text = parse_openai_response(&response_json).unwrap();
        assert_eq!(text, "Hello from OpenAI!");
    }

    #[test]
    fn parse_openai_missing_choices_is_error() {
        let result = parse_openai_response(&json!({"error": {"message": "bad"}}));
        assert!(matches!(result, Err(AgentError::LlmParseFailed { .. })));
    }

    #[test]
    fn provider_serde_names() {
        let p: LlmProvider = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(p, LlmProvider::Anthropic);
        let p: LlmProvider = serde_json::from_str("\"openai-compatible\"").unwrap();
        assert_eq!(p, LlmProvider::OpenAI);
        assert_eq!(LlmProvider::OpenAI.to_string(), "openai");
    }
}
