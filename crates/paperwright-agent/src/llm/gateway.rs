//! The model gateway seam.
//!
//! Everything above the LLM layer (runtime, LLM-backed tools, task facades)
//! talks to a model exclusively through [`ModelGateway`], which keeps the
//! agent loop testable with scripted in-memory gateways.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::types::{Completion, Message};

/// Turns a system prompt plus a conversation into generated text.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send the full ordered conversation and return the reply.
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<Completion>;

    /// Single-shot convenience: one user message, one reply.
    async fn ask(&self, system: &str, prompt: &str) -> Result<Completion> {
        self.complete(system, &[Message::user(prompt)]).await
    }
}

/// A single text-generation endpoint, as seen by the provider chain.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// The model identifier this backend requests.
    fn model(&self) -> &str;

    /// Generate a reply for the given system prompt and conversation.
    async fn generate(&self, system: &str, messages: &[Message]) -> Result<String>;
}

#[async_trait]
impl TextBackend for crate::llm::client::LlmClient {
    fn model(&self) -> &str {
        crate::llm::client::LlmClient::model(self)
    }

    async fn generate(&self, system: &str, messages: &[Message]) -> Result<String> {
        self.complete(system, messages).await
    }
}
