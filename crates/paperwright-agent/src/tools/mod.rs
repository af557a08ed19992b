//! Tools the agent can invoke, and the per-run registry that dispatches them.
//!
//! A [`Tool`] is a named async function from text to text.  Tools are either
//! purely local ([`local`]) or forward their input to the model gateway with
//! a task-specific system prompt ([`llm`]).  A [`ToolRegistry`] is assembled
//! once per run, is immutable afterwards, and resolves action names by exact
//! match.

pub mod llm;
pub mod local;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{AgentError, Result};
use crate::llm::ModelGateway;

pub use llm::LlmTool;
pub use local::{AiPhraseTool, TextStatsTool, WordCountTool};

// ---------------------------------------------------------------------------
// Tool trait
// ---------------------------------------------------------------------------

/// A capability the agent may invoke once per step.
///
/// Tools are stateless with respect to the runtime; any internal state is
/// the tool's own business.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier the model uses in `Action:` lines.
    fn name(&self) -> &str;

    /// Capability summary shown to the model in the system prompt.
    fn description(&self) -> &str;

    /// Run the tool on `input` (empty when the model gave no input).
    async fn execute(&self, input: &str) -> Result<String>;
}

/// Adapter that turns a closure into a [`Tool`].
pub struct FnTool<F> {
    name: String,
    description: String,
    f: F,
}

impl<F> FnTool<F>
where
    F: Fn(String) -> BoxFuture<'static, Result<String>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, description: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(String) -> BoxFuture<'static, Result<String>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, input: &str) -> Result<String> {
        (self.f)(input.to_owned()).await
    }
}

// ---------------------------------------------------------------------------
// Builtin catalog
// ---------------------------------------------------------------------------

/// Names of every builtin tool, in catalog order.
pub const BUILTIN_TOOL_NAMES: &[&str] = &[
    local::WORD_COUNT,
    local::TEXT_STATS,
    local::FIND_AI_PHRASES,
    llm::ANALYZE_ISSUES,
    llm::POLISH_TEXT,
    llm::TRANSLATE_TEXT,
    llm::COMPRESS_TEXT,
    llm::EXPAND_TEXT,
    llm::HUMANIZE_TEXT,
    llm::CHECK_LOGIC,
    llm::DRAFT_CAPTION,
    llm::REVIEW_PAPER,
];

/// Construct a builtin tool by name.  LLM-backed tools share `gateway`.
pub fn builtin_tool(name: &str, gateway: &Arc<dyn ModelGateway>) -> Option<Arc<dyn Tool>> {
    match name {
        local::WORD_COUNT => Some(Arc::new(WordCountTool)),
        local::TEXT_STATS => Some(Arc::new(TextStatsTool)),
        local::FIND_AI_PHRASES => Some(Arc::new(AiPhraseTool)),
        other => LlmTool::builtin(other, Arc::clone(gateway)).map(|t| Arc::new(t) as Arc<dyn Tool>),
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// An immutable, ordered name→tool map for one run.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Build a registry.  Fails if two tools share a name.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tools.len());
        for (i, tool) in tools.iter().enumerate() {
            if index.insert(tool.name().to_owned(), i).is_some() {
                return Err(AgentError::DuplicateTool {
                    tool_name: tool.name().to_owned(),
                });
            }
        }
        Ok(Self { tools, index })
    }

    /// Build a registry of builtin tools selected by name, in the given order.
    pub fn from_builtins(names: &[&str], gateway: &Arc<dyn ModelGateway>) -> Result<Self> {
        let tools = names
            .iter()
            .map(|name| {
                builtin_tool(name, gateway).ok_or_else(|| AgentError::ValidationError {
                    reason: format!("no builtin tool named `{name}`"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(tools)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up a tool by exact name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// One `- name: description` line per tool, for the system prompt.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run `name` on `input` and return the observation text.
    ///
    /// Never fails: an unknown name yields a message listing the valid names
    /// and a tool failure yields a `Tool error:` message.
    pub async fn dispatch(&self, name: &str, input: &str) -> String {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = name, "model requested unknown tool");
            return format!(
                "Unknown tool \"{name}\". Available tools: {}",
                self.names().join(", ")
            );
        };

        tracing::debug!(tool = name, input_chars = input.len(), "executing tool");

        match tool.execute(input).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool execution failed");
                format!("Tool error: {e}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::llm::{Completion, Message};

    struct NullGateway;

    #[async_trait]
    impl ModelGateway for NullGateway {
        async fn complete(&self, _system: &str, _messages: &[Message]) -> Result<Completion> {
            Ok(Completion::new("", "null", "null"))
        }
    }

    fn failing_tool() -> Arc<dyn Tool> {
        Arc::new(FnTool::new("explode", "Always fails", |_input: String| {
            async {
                Err::<String, _>(AgentError::ToolExecutionFailed {
                    tool_name: "explode".into(),
                    reason: "kaboom".into(),
                })
            }
            .boxed()
        }))
    }

    fn echo_tool() -> Arc<dyn Tool> {
        Arc::new(FnTool::new("echo", "Echoes input", |input: String| {
            async move { Ok::<_, AgentError>(format!("echo: {input}")) }.boxed()
        }))
    }

    #[tokio::test]
    async fn dispatches_by_exact_name() {
        let registry = ToolRegistry::new(vec![echo_tool(), Arc::new(WordCountTool)]).unwrap();
        assert_eq!(registry.dispatch("echo", "hi").await, "echo: hi");
        assert_eq!(
            registry.dispatch("word_count", "Hello world.").await,
            "Word count: 2"
        );
    }

    #[tokio::test]
    async fn unknown_tool_lists_available_names() {
        let registry = ToolRegistry::new(vec![echo_tool(), Arc::new(WordCountTool)]).unwrap();
        let obs = registry.dispatch("Echo", "hi").await;
        assert!(obs.contains("Unknown tool"));
        assert!(obs.contains("echo, word_count"));
    }

    #[tokio::test]
    async fn tool_failure_becomes_observation() {
        let registry = ToolRegistry::new(vec![failing_tool()]).unwrap();
        let obs = registry.dispatch("explode", "").await;
        assert!(obs.starts_with("Tool error:"));
        assert!(obs.contains("kaboom"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = ToolRegistry::new(vec![echo_tool(), echo_tool()]);
        assert!(matches!(result, Err(AgentError::DuplicateTool { .. })));
    }

    #[test]
    fn describe_lists_tools_in_order() {
        let registry = ToolRegistry::new(vec![Arc::new(WordCountTool), echo_tool()]).unwrap();
        let text = registry.describe();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("- word_count:"));
        assert_eq!(lines[1], "- echo: Echoes input");
    }

    #[test]
    fn every_builtin_name_resolves() {
        let gateway: Arc<dyn ModelGateway> = Arc::new(NullGateway);
        for name in BUILTIN_TOOL_NAMES {
            let tool = builtin_tool(name, &gateway).expect("builtin tool");
            assert_eq!(tool.name(), *name);
            assert!(!tool.description().is_empty());
        }
        assert!(builtin_tool("rm_rf", &gateway).is_none());
    }

    #[test]
    fn from_builtins_rejects_unknown_name() {
        let gateway: Arc<dyn ModelGateway> = Arc::new(NullGateway);
        let result = ToolRegistry::from_builtins(&["word_count", "nope"], &gateway);
        assert!(matches!(result, Err(AgentError::ValidationError { .. })));
    }
}
