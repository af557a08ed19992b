//! Tools that delegate to the model gateway.
//!
//! Each builtin LLM tool is a fixed system prompt plus a shared gateway: the
//! tool input becomes the single user message and the reply text becomes the
//! observation.  These nested calls go through the same provider chain as
//! the agent loop itself.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::llm::ModelGateway;
use crate::tools::Tool;

pub const ANALYZE_ISSUES: &str = "analyze_issues";
pub const POLISH_TEXT: &str = "polish_text";
pub const TRANSLATE_TEXT: &str = "translate_text";
pub const COMPRESS_TEXT: &str = "compress_text";
pub const EXPAND_TEXT: &str = "expand_text";
pub const HUMANIZE_TEXT: &str = "humanize_text";
pub const CHECK_LOGIC: &str = "check_logic";
pub const DRAFT_CAPTION: &str = "draft_caption";
pub const REVIEW_PAPER: &str = "review_paper";

/// `(name, description, system prompt)` for every builtin LLM tool.
const CATALOG: &[(&str, &str, &str)] = &[
    (
        ANALYZE_ISSUES,
        "List grammar, tone, citation and structure issues in academic text. \
         Input: the text.",
        "You are a meticulous academic copy editor. List every grammar, tone, \
         citation-format and paragraph-structure issue in the user's text as a \
         numbered list. For each issue quote the offending span and suggest a fix. \
         Do not rewrite the whole text.",
    ),
    (
        POLISH_TEXT,
        "Polish academic text for clarity, concision and formal register. \
         Input: the text, optionally preceded by a line `Venue: <name>`.",
        "You are an expert editor of research papers. Rewrite the user's text so \
         it is clear, concise, grammatical and in formal academic register. Keep \
         every claim, number, citation and LaTeX command unchanged. If the input \
         starts with `Venue:`, follow that venue's style. Reply with the polished \
         text only.",
    ),
    (
        TRANSLATE_TEXT,
        "Translate academic text. Input: a first line `From <lang> to <lang>`, \
         then the text.",
        "You are a professional academic translator. The first line of the user's \
         message names the language pair; translate the remaining text faithfully \
         using the target field's standard terminology. Keep citations, equations \
         and LaTeX commands intact. Reply with the translation only.",
    ),
    (
        COMPRESS_TEXT,
        "Shorten academic text while keeping every claim. Input: the text, \
         optionally preceded by a line `Target words: <n>`.",
        "You are an editor who tightens research prose. Shorten the user's text by \
         removing redundancy and wordiness while preserving every claim, result and \
         citation. If the input starts with `Target words:`, aim for that length. \
         Reply with the shortened text only.",
    ),
    (
        EXPAND_TEXT,
        "Elaborate academic text with reasoning and transitions, without \
         inventing results. Input: the text, optionally preceded by a line \
         `Target words: <n>`.",
        "You are an academic writing assistant. Expand the user's text with \
         clearer motivation, reasoning steps and transitions. Never invent data, \
         results or citations. If the input starts with `Target words:`, aim for \
         that length. Reply with the expanded text only.",
    ),
    (
        HUMANIZE_TEXT,
        "Rewrite text so it no longer reads as machine-generated. Input: the text.",
        "You are an experienced human academic author. Rewrite the user's text to \
         remove stock phrases, formulaic transitions and uniform sentence rhythm \
         typical of machine-generated prose. Vary sentence length, prefer concrete \
         wording, keep the meaning and all citations. Reply with the rewritten text \
         only.",
    ),
    (
        CHECK_LOGIC,
        "Check the argument for logical gaps, unsupported claims and \
         contradictions. Input: the text.",
        "You are a rigorous reviewer of scientific arguments. Identify logical \
         gaps, unsupported claims, overgeneralizations and internal contradictions \
         in the user's text. For each, quote the passage, explain the problem and \
         propose a fix. If the argument is sound, say so.",
    ),
    (
        DRAFT_CAPTION,
        "Draft a figure or table caption. Input: a first line `Figure` or \
         `Table`, then a description of the content.",
        "You write captions for research papers. The first line of the user's \
         message says whether this is a figure or a table; the rest describes it. \
         Write one caption: a bold-worthy first sentence stating what is shown, \
         then one or two sentences on how to read it. Reply with the caption only.",
    ),
    (
        REVIEW_PAPER,
        "Write a peer-review style critique. Input: the paper text, optionally \
         preceded by a line `Venue: <name>`.",
        "You are an experienced peer reviewer. Write a structured review of the \
         user's paper text: summary, strengths, weaknesses, questions for the \
         authors, and a recommendation. If the input starts with `Venue:`, judge \
         against that venue's standards.",
    ),
];

/// A tool backed by one gateway call with a fixed system prompt.
pub struct LlmTool {
    name: String,
    description: String,
    system_prompt: String,
    gateway: Arc<dyn ModelGateway>,
}

impl LlmTool {
    /// Create a custom LLM-backed tool.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
        gateway: Arc<dyn ModelGateway>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            gateway,
        }
    }

    /// Look up a builtin LLM tool by name.
    pub fn builtin(name: &str, gateway: Arc<dyn ModelGateway>) -> Option<Self> {
        CATALOG
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(n, description, prompt)| Self::new(*n, *description, *prompt, gateway))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[async_trait]
impl Tool for LlmTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, input: &str) -> Result<String> {
        if input.trim().is_empty() {
            return Err(AgentError::ToolExecutionFailed {
                tool_name: self.name.clone(),
                reason: "empty input".into(),
            });
        }

        let completion = self.gateway.ask(&self.system_prompt, input).await?;
        tracing::debug!(
            tool = %self.name,
            provider = %completion.provider,
            chars = completion.text.len(),
            "llm tool answered"
        );
        Ok(completion.text.trim().to_owned())
    }
}
