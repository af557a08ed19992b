//! LLM integration layer.
//!
//! This module provides the interface between the agent runtime and large
//! language model providers.  It is organized into:
//!
//! - [`types`] -- Core data types (messages, completions).
//! - [`gateway`] -- The [`ModelGateway`] seam the runtime depends on.
//! - [`client`] -- HTTP client for Anthropic and OpenAI-compatible APIs.
//! - [`chain`] -- Ordered provider chain with fallback and cooldowns.

pub mod chain;
pub mod client;
pub mod gateway;
pub mod types;

// Re-export the most commonly used types for convenience.
pub use chain::{Backend, ProviderChain};
pub use client::{LlmClient, LlmClientConfig, LlmProvider};
pub use gateway::{ModelGateway, TextBackend};
pub use types::{Completion, Message, Role};
