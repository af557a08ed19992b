//! One entry point per editing task.
//!
//! A task turns its parameters into a single goal string and picks a fixed
//! subset of builtin tools; everything adaptive happens in the agent loop.
//! Source text is capped at [`MAX_SOURCE_CHARS`] before it is embedded.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::llm::ModelGateway;
use crate::runtime::{AgentConfig, AgentResult, run_agent_with_cancel};
use crate::tools::{ToolRegistry, llm as llm_tools, local};

/// Largest source text, in characters, embedded in a goal.
pub const MAX_SOURCE_CHARS: usize = 12_000;

/// Appended to source text that was cut at [`MAX_SOURCE_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// Cap `text` at [`MAX_SOURCE_CHARS`] characters, marking the cut.
pub fn truncate_source(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_SOURCE_CHARS) {
        None => Cow::Borrowed(text),
        Some((cut, _)) => {
            tracing::debug!(chars = MAX_SOURCE_CHARS, "source text truncated");
            Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..cut]))
        }
    }
}

// ---------------------------------------------------------------------------
// Task kinds
// ---------------------------------------------------------------------------

/// The supported editing tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Polish,
    Translate,
    Compress,
    Expand,
    Deai,
    LogicCheck,
    Caption,
    Review,
    Analyze,
}

impl TaskKind {
    pub const ALL: [TaskKind; 9] = [
        Self::Polish,
        Self::Translate,
        Self::Compress,
        Self::Expand,
        Self::Deai,
        Self::LogicCheck,
        Self::Caption,
        Self::Review,
        Self::Analyze,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polish => "polish",
            Self::Translate => "translate",
            Self::Compress => "compress",
            Self::Expand => "expand",
            Self::Deai => "deai",
            Self::LogicCheck => "logic_check",
            Self::Caption => "caption",
            Self::Review => "review",
            Self::Analyze => "analyze",
        }
    }

    /// Builtin tools available to this task, in prompt order.
    pub fn tools(self) -> &'static [&'static str] {
        match self {
            Self::Polish => &[
                llm_tools::ANALYZE_ISSUES,
                llm_tools::POLISH_TEXT,
                local::WORD_COUNT,
            ],
            Self::Translate => &[llm_tools::TRANSLATE_TEXT, llm_tools::ANALYZE_ISSUES],
            Self::Compress => &[llm_tools::COMPRESS_TEXT, local::WORD_COUNT],
            Self::Expand => &[llm_tools::EXPAND_TEXT, local::WORD_COUNT],
            Self::Deai => &[
                local::FIND_AI_PHRASES,
                llm_tools::HUMANIZE_TEXT,
                local::TEXT_STATS,
            ],
            Self::LogicCheck => &[llm_tools::CHECK_LOGIC, llm_tools::ANALYZE_ISSUES],
            Self::Caption => &[llm_tools::DRAFT_CAPTION, local::WORD_COUNT],
            Self::Review => &[
                llm_tools::REVIEW_PAPER,
                llm_tools::ANALYZE_ISSUES,
                local::TEXT_STATS,
            ],
            Self::Analyze => &[
                llm_tools::ANALYZE_ISSUES,
                llm_tools::CHECK_LOGIC,
                local::FIND_AI_PHRASES,
                local::TEXT_STATS,
            ],
        }
    }

    /// Step budget used when the caller gives none.
    pub fn default_max_steps(self) -> u32 {
        match self {
            Self::Caption => 3,
            _ => 5,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caption describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionKind {
    #[default]
    Figure,
    Table,
}

impl fmt::Display for CaptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Figure => f.write_str("Figure"),
            Self::Table => f.write_str("Table"),
        }
    }
}

impl FromStr for CaptionKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "figure" | "fig" => Ok(Self::Figure),
            "table" | "tab" => Ok(Self::Table),
            other => Err(AgentError::ValidationError {
                reason: format!("unknown caption kind `{other}` (expected figure or table)"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// A fully parameterized task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    Polish { text: String, venue: Option<String> },
    Translate { text: String, from: String, to: String },
    Compress { text: String, target_words: Option<u32> },
    Expand { text: String, target_words: Option<u32> },
    Deai { text: String },
    LogicCheck { text: String },
    Caption { kind: CaptionKind, description: String },
    Review { text: String, venue: Option<String> },
    Analyze { text: String },
}

/// `Target venue: X` line when a non-blank venue is given.
fn venue_line(venue: Option<&str>) -> String {
    match venue.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => format!("Target venue: {v}\n"),
        None => String::new(),
    }
}

fn target_line(target_words: Option<u32>) -> String {
    match target_words {
        Some(n) => format!("Target length: about {n} words\n"),
        None => String::new(),
    }
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Polish { .. } => TaskKind::Polish,
            Self::Translate { .. } => TaskKind::Translate,
            Self::Compress { .. } => TaskKind::Compress,
            Self::Expand { .. } => TaskKind::Expand,
            Self::Deai { .. } => TaskKind::Deai,
            Self::LogicCheck { .. } => TaskKind::LogicCheck,
            Self::Caption { .. } => TaskKind::Caption,
            Self::Review { .. } => TaskKind::Review,
            Self::Analyze { .. } => TaskKind::Analyze,
        }
    }

    /// The goal handed to the agent loop.
    pub fn goal(&self) -> String {
        match self {
            Self::Polish { text, venue } => format!(
                "Polish the following academic text for clarity, concision and formal register.\n\
{venue}\
First use analyze_issues to find problems, then polish_text to rewrite it, and check \
the length with word_count. Give the polished text as your Final Answer.\n\n\
Text:\n{text}",
                venue = venue_line(venue.as_deref()),
                text = truncate_source(text),
            ),
            Self::Translate { text, from, to } => format!(
                "Translate the following academic text from {from} to {to}.\n\
Use translate_text with an input whose first line is `From {from} to {to}` followed by the \
text, then use analyze_issues on the translation and fix anything it finds. Give the final \
translation as your Final Answer.\n\n\
Text:\n{text}",
                text = truncate_source(text),
            ),
            Self::Compress { text, target_words } => format!(
                "Shorten the following academic text while keeping every claim, result and \
citation.\n\
{target}\
Use compress_text, then verify the length with word_count and compress again if needed. \
Give the shortened text as your Final Answer.\n\n\
Text:\n{text}",
                target = target_line(*target_words),
                text = truncate_source(text),
            ),
            Self::Expand { text, target_words } => format!(
                "Expand the following academic text with clearer motivation, reasoning and \
transitions. Do not invent results or citations.\n\
{target}\
Use expand_text, then verify the length with word_count. Give the expanded text as your \
Final Answer.\n\n\
Text:\n{text}",
                target = target_line(*target_words),
                text = truncate_source(text),
            ),
            Self::Deai { text } => format!(
                "Rewrite the following academic text so it no longer reads as machine-generated.\n\
First use find_ai_phrases and text_stats to see what gives it away, then humanize_text to \
rewrite it. Keep the meaning and all citations. Give the rewritten text as your Final \
Answer.\n\n\
Text:\n{text}",
                text = truncate_source(text),
            ),
            Self::LogicCheck { text } => format!(
                "Check the argument in the following academic text for logical gaps, unsupported \
claims and contradictions.\n\
Use check_logic, and analyze_issues for wording that weakens the argument. Give a numbered \
list of problems with suggested fixes as your Final Answer.\n\n\
Text:\n{text}",
                text = truncate_source(text),
            ),
            Self::Caption { kind, description } => format!(
                "Write a caption for a {kind_lower} in a research paper.\n\
Use draft_caption with an input whose first line is `{kind}` followed by the description, \
and check the length with word_count. Give only the caption as your Final Answer.\n\n\
Description:\n{description}",
                kind_lower = kind.to_string().to_lowercase(),
                description = truncate_source(description),
            ),
            Self::Review { text, venue } => format!(
                "Write a peer review of the following paper text.\n\
{venue}\
Use review_paper for the critique, analyze_issues for writing problems and text_stats for \
length and structure. Give the full review as your Final Answer.\n\n\
Text:\n{text}",
                venue = venue_line(venue.as_deref()),
                text = truncate_source(text),
            ),
            Self::Analyze { text } => format!(
                "Give a comprehensive analysis of the following academic text covering language, \
logic and style.\n\
Use analyze_issues, check_logic, find_ai_phrases and text_stats, then combine their findings \
into a structured report as your Final Answer.\n\n\
Text:\n{text}",
                text = truncate_source(text),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs tasks against one gateway.
#[derive(Clone)]
pub struct TaskRunner {
    gateway: Arc<dyn ModelGateway>,
    config: AgentConfig,
    max_steps: Option<u32>,
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("config", &self.config)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl TaskRunner {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            gateway,
            config: AgentConfig::default(),
            max_steps: None,
        }
    }

    /// Use `config` for deadline and step observer.  Its `max_steps` is
    /// ignored in favour of the task default or [`Self::with_max_steps`].
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Override every task's default step budget.
    pub fn with_max_steps(mut self, max_steps: Option<u32>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Registry holding exactly the tools for `kind`.
    pub fn registry_for(&self, kind: TaskKind) -> Result<ToolRegistry> {
        ToolRegistry::from_builtins(kind.tools(), &self.gateway)
    }

    pub async fn run(&self, task: &Task) -> Result<AgentResult> {
        self.run_with_cancel(task, CancellationToken::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        task: &Task,
        cancel: CancellationToken,
    ) -> Result<AgentResult> {
        let kind = task.kind();
        let registry = self.registry_for(kind)?;
        let config = self
            .config
            .clone()
            .with_max_steps(self.max_steps.unwrap_or(kind.default_max_steps()));

        tracing::info!(task = %kind, max_steps = config.max_steps, "running task");
        run_agent_with_cancel(
            self.gateway.as_ref(),
            &registry,
            &task.goal(),
            &config,
            cancel,
        )
        .await
    }

    pub async fn polish(&self, text: &str, venue: Option<&str>) -> Result<AgentResult> {
        self.run(&Task::Polish {
            text: text.to_owned(),
            venue: venue.map(str::to_owned),
        })
        .await
    }

    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Result<AgentResult> {
        self.run(&Task::Translate {
            text: text.to_owned(),
            from: from.to_owned(),
            to: to.to_owned(),
        })
        .await
    }

    pub async fn compress(&self, text: &str, target_words: Option<u32>) -> Result<AgentResult> {
        self.run(&Task::Compress {
            text: text.to_owned(),
            target_words,
        })
        .await
    }

    pub async fn expand(&self, text: &str, target_words: Option<u32>) -> Result<AgentResult> {
        self.run(&Task::Expand {
            text: text.to_owned(),
            target_words,
        })
        .await
    }

    pub async fn deai(&self, text: &str) -> Result<AgentResult> {
        self.run(&Task::Deai {
            text: text.to_owned(),
        })
        .await
    }

    pub async fn logic_check(&self, text: &str) -> Result<AgentResult> {
        self.run(&Task::LogicCheck {
            text: text.to_owned(),
        })
        .await
    }

    pub async fn caption(&self, kind: CaptionKind, description: &str) -> Result<AgentResult> {
        self.run(&Task::Caption {
            kind,
            description: description.to_owned(),
        })
        .await
    }

    pub async fn review(&self, text: &str, venue: Option<&str>) -> Result<AgentResult> {
        self.run(&Task::Review {
            text: text.to_owned(),
            venue: venue.map(str::to_owned),
        })
        .await
    }

    pub async fn analyze(&self, text: &str) -> Result<AgentResult> {
        self.run(&Task::Analyze {
            text: text.to_owned(),
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{Completion, Message};

    struct RecordingGateway {
        goals: Mutex<Vec<String>>,
        systems: Mutex<Vec<String>>,
    }

    impl RecordingGateway {
        fn new() -> Self {
            Self {
                goals: Mutex::new(Vec::new()),
                systems: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelGateway for RecordingGateway {
        async fn complete(&self, system: &str, messages: &[Message]) -> Result<Completion> {
            self.systems.lock().unwrap().push(system.to_owned());
            self.goals.lock().unwrap().push(messages[0].content.clone());
            Ok(Completion::new("Final Answer: done", "rec", "rec-1"))
        }
    }

    #[test]
    fn short_source_is_untouched() {
        assert!(matches!(truncate_source("short"), Cow::Borrowed("short")));
        let exact = "a".repeat(MAX_SOURCE_CHARS);
        assert_eq!(truncate_source(&exact), exact.as_str());
    }

    #[test]
    fn long_source_is_capped_with_marker() {
        let long = "é".repeat(MAX_SOURCE_CHARS + 10);
        let capped = truncate_source(&long);
        assert!(capped.ends_with(TRUNCATION_MARKER));
        let body = capped.strip_suffix(TRUNCATION_MARKER).unwrap();
        assert_eq!(body.chars().count(), MAX_SOURCE_CHARS);
    }

    #[test]
    fn tool_subsets_match_task_table() {
        assert_eq!(
            TaskKind::Polish.tools(),
            ["analyze_issues", "polish_text", "word_count"]
        );
        assert_eq!(
            TaskKind::Analyze.tools(),
            ["analyze_issues", "check_logic", "find_ai_phrases", "text_stats"]
        );
        assert_eq!(TaskKind::Caption.default_max_steps(), 3);
        for kind in TaskKind::ALL {
            if kind != TaskKind::Caption {
                assert_eq!(kind.default_max_steps(), 5, "{kind}");
            }
        }
    }

    #[test]
    fn every_task_registry_builds() {
        let runner = TaskRunner::new(Arc::new(RecordingGateway::new()));
        for kind in TaskKind::ALL {
            let registry = runner.registry_for(kind).unwrap();
            assert_eq!(registry.names(), kind.tools());
        }
    }

    #[test]
    fn goals_fold_in_parameters() {
        let goal = Task::Polish {
            text: "Our method is good.".into(),
            venue: Some("NeurIPS".into()),
        }
        .goal();
        assert!(goal.contains("Target venue: NeurIPS"));
        assert!(goal.ends_with("Text:\nOur method is good."));

        let goal = Task::Polish {
            text: "x".into(),
            venue: Some("  ".into()),
        }
        .goal();
        assert!(!goal.contains("Target venue"));

        let goal = Task::Translate {
            text: "你好".into(),
            from: "Chinese".into(),
            to: "English".into(),
        }
        .goal();
        assert!(goal.contains("from Chinese to English"));
        assert!(goal.contains("`From Chinese to English`"));

        let goal = Task::Compress {
            text: "x".into(),
            target_words: Some(150),
        }
        .goal();
        assert!(goal.contains("about 150 words"));

        let goal = Task::Caption {
            kind: CaptionKind::Table,
            description: "accuracy per dataset".into(),
        }
        .goal();
        assert!(goal.contains("caption for a table"));
        assert!(goal.contains("first line is `Table`"));
    }

    #[test]
    fn goal_embeds_truncated_source() {
        let goal = Task::Analyze {
            text: "w ".repeat(MAX_SOURCE_CHARS),
        }
        .goal();
        assert!(goal.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn caption_kind_parses() {
        assert_eq!("Figure".parse::<CaptionKind>().unwrap(), CaptionKind::Figure);
        assert_eq!(" tab ".parse::<CaptionKind>().unwrap(), CaptionKind::Table);
        assert!("chart".parse::<CaptionKind>().is_err());
    }

    #[tokio::test]
    async fn facade_sends_goal_and_task_tools() {
        let gateway = Arc::new(RecordingGateway::new());
        let runner = TaskRunner::new(gateway.clone());

        let result = runner.deai("We delve into it.").await.unwrap();
        assert_eq!(result.final_answer, "done");

        let goals = gateway.goals.lock().unwrap();
        assert!(goals[0].contains("We delve into it."));
        let systems = gateway.systems.lock().unwrap();
        assert!(systems[0].contains("- find_ai_phrases:"));
        assert!(systems[0].contains("- humanize_text:"));
        assert!(!systems[0].contains("- polish_text:"));
    }
}
