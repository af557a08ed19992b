//! Agent runtime for Paperwright.
//!
//! This crate turns an editing request on academic text into a bounded
//! reason/act/observe loop over a language model and a small toolbox.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌──────────────┐
//! │   Tasks    │────>│  Runtime   │────>│ ToolRegistry │
//! │ (goal+set) │     │ (loop)     │     │ (dispatch)   │
//! └────────────┘     └─────┬──────┘     └──────────────┘
//!                          │
//!              ┌───────────┴───────────┐
//!              │                       │
//!       ┌──────┴───────┐        ┌──────┴─────┐
//!       │ ModelGateway │        │   Parser   │
//!       │ (chain)      │        │ (protocol) │
//!       └──────────────┘        └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`llm`] -- Model gateway, provider chain, HTTP client and wire types.
//! - [`parser`] -- Decoder for the `Thought:`/`Action:`/`Final Answer:` protocol.
//! - [`tools`] -- Tool trait, builtin tools and the per-run registry.
//! - [`runtime`] -- The agent loop.
//! - [`tasks`] -- One entry point per editing task.
//! - [`analysis`] -- Offline text statistics and stock-phrase detection.
//! - [`config`] -- File configuration and credential resolution.
//! - [`error`] -- Agent error types.

pub mod analysis;
pub mod config;
pub mod error;
pub mod llm;
pub mod parser;
pub mod runtime;
pub mod tasks;
pub mod tools;

// Re-export the most commonly used types at the crate root.
pub use config::{AgentSection, BackendEntry, PaperwrightConfig};
pub use error::{AgentError, Result};
pub use llm::{
    Backend, Completion, LlmClient, LlmClientConfig, LlmProvider, Message, ModelGateway,
    ProviderChain, Role, TextBackend,
};
pub use parser::{ParsedAction, ParsedResponse, parse_response};
pub use runtime::{
    AgentConfig, AgentResult, AgentStep, DEFAULT_MAX_STEPS, StepObserver, Termination,
    build_system_prompt, run_agent, run_agent_with_cancel,
};
pub use tasks::{CaptionKind, MAX_SOURCE_CHARS, Task, TaskKind, TaskRunner, truncate_source};
pub use tools::{FnTool, LlmTool, Tool, ToolRegistry};
