//! The reason/act/observe loop.
//!
//! One call to [`run_agent`] owns one conversation.  Each iteration sends the
//! full conversation to the gateway, decodes the reply with
//! [`parse_response`], and either finishes, dispatches a tool and feeds the
//! observation back, or asks the model to correct its format.  After
//! `max_steps` iterations the model is forced to answer with one last call,
//! so a run makes at most `max_steps + 1` model calls.
//!
//! The only suspension points are the gateway call and the tool call; both
//! are raced against the run's cancellation token and optional deadline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::llm::{Completion, Message, ModelGateway};
use crate::parser::{ParsedAction, parse_response};
use crate::tools::ToolRegistry;

/// Step budget used when the caller does not choose one.
pub const DEFAULT_MAX_STEPS: u32 = 5;

/// Used as the final answer when even the forced reply is blank.
pub const NO_ANSWER_NOTICE: &str =
    "The agent did not produce an answer within its step budget.";

const CORRECTIVE_INSTRUCTION: &str = "Your reply contained neither an Action nor a Final Answer. \
Reply with either:\n\
Thought: <your reasoning>\n\
Action: <one tool name>\n\
Action Input: <the input for the tool>\n\
or:\n\
Thought: <your reasoning>\n\
Final Answer: <the complete result>";

const FORCE_FINAL_INSTRUCTION: &str = "You have used all of your steps. Do not call any more tools. \
Reply now with:\n\
Thought: <your final reasoning>\n\
Final Answer: <your best complete result>";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Callback invoked with every recorded step.
pub type StepObserver = Arc<dyn Fn(&AgentStep) + Send + Sync>;

/// Per-run loop settings.
#[derive(Clone)]
pub struct AgentConfig {
    /// Maximum number of loop iterations.  Zero is treated as one.
    pub max_steps: u32,

    /// Wall-clock limit for the whole run.
    pub deadline: Option<Duration>,

    /// Called after each step is recorded.
    pub on_step: Option<StepObserver>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            deadline: None,
            on_step: None,
        }
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("max_steps", &self.max_steps)
            .field("deadline", &self.deadline)
            .field("on_step", &self.on_step.is_some())
            .finish()
    }
}

impl AgentConfig {
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn on_step(mut self, observer: impl Fn(&AgentStep) + Send + Sync + 'static) -> Self {
        self.on_step = Some(Arc::new(observer));
        self
    }

    /// The iteration budget actually used.
    pub fn effective_max_steps(&self) -> u32 {
        self.max_steps.max(1)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One dispatched tool call and what it returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    pub thought: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model gave a final answer within the budget.
    FinalAnswer,
    /// The budget ran out and the answer came from the forced call.
    StepBudget,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub run_id: Uuid,
    pub steps: Vec<AgentStep>,
    pub final_answer: String,
    /// Always equal to `steps.len()`.
    pub total_steps: usize,
    pub termination: Termination,
    /// Backend that produced the final reply.
    pub provider: String,
    /// Model that produced the final reply.
    pub model: String,
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Build the protocol instructions and tool list sent with every call.
pub fn build_system_prompt(registry: &ToolRegistry) -> String {
    format!(
        "You are an expert academic writing assistant. You complete the user's task \
step by step, using the tools below when they help.\n\
\n\
Available tools:\n\
{tools}\n\
\n\
To use a tool, reply in exactly this format:\n\
\n\
Thought: <your reasoning>\n\
Action: <one tool name from: {names}>\n\
Action Input: <the input for the tool>\n\
\n\
You will then receive:\n\
\n\
Observation: <the tool result>\n\
\n\
When you have everything you need, reply with:\n\
\n\
Thought: <your final reasoning>\n\
Final Answer: <the complete result>\n\
\n\
Rules:\n\
- Give either one Action with its Action Input, or a Final Answer, never both.\n\
- Never write an Observation yourself.\n\
- The Final Answer must contain the full deliverable, not a description of it.",
        tools = registry.describe(),
        names = registry.names().join(", "),
    )
}

fn observation_message(observation: &str) -> String {
    format!(
        "Observation: {observation}\n\n\
Continue. Reply with your next Thought and either an Action or your Final Answer."
    )
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Races every suspension point against cancellation and the deadline.
struct Guard {
    cancel: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl Guard {
    async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            _ = expiry(self.deadline.map(|(at, _)| at)) => Err(AgentError::DeadlineExceeded {
                millis: self.deadline.map_or(0, |(_, d)| {
                    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
                }),
            }),
            out = fut => Ok(out),
        }
    }
}

async fn expiry(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Run the loop to completion.
///
/// # Errors
///
/// Only gateway failures and deadline expiry end a run early.  Tool
/// failures, unknown tools, malformed replies and empty final answers are
/// fed back to the model.
pub async fn run_agent(
    gateway: &dyn ModelGateway,
    registry: &ToolRegistry,
    goal: &str,
    config: &AgentConfig,
) -> Result<AgentResult> {
    run_agent_with_cancel(gateway, registry, goal, config, CancellationToken::new()).await
}

/// [`run_agent`] that stops with [`AgentError::Cancelled`] once `cancel`
/// fires, abandoning any in-flight gateway or tool call.
pub async fn run_agent_with_cancel(
    gateway: &dyn ModelGateway,
    registry: &ToolRegistry,
    goal: &str,
    config: &AgentConfig,
    cancel: CancellationToken,
) -> Result<AgentResult> {
    let run_id = Uuid::now_v7();
    let started_at = Utc::now();
    let max_steps = config.effective_max_steps();
    let guard = Guard {
        cancel,
        deadline: config.deadline.map(|d| (Instant::now() + d, d)),
    };

    tracing::info!(
        run_id = %run_id,
        max_steps,
        tool_count = registry.len(),
        "starting agent loop"
    );

    let system = build_system_prompt(registry);
    let mut messages = vec![Message::user(goal)];
    let mut steps: Vec<AgentStep> = Vec::new();

    let finish = |steps: Vec<AgentStep>,
                  final_answer: String,
                  termination: Termination,
                  completion: Completion| {
        tracing::info!(
            run_id = %run_id,
            steps = steps.len(),
            termination = ?termination,
            provider = %completion.provider,
            "agent loop finished"
        );
        AgentResult {
            run_id,
            total_steps: steps.len(),
            steps,
            final_answer,
            termination,
            provider: completion.provider,
            model: completion.model,
            started_at,
        }
    };

    for iteration in 0..max_steps {
        tracing::debug!(run_id = %run_id, iteration, "awaiting model");

        let completion = guard.run(gateway.complete(&system, &messages)).await??;
        messages.push(Message::assistant(completion.text.as_str()));

        let parsed = parse_response(&completion.text);
        match parsed.action() {
            ParsedAction::Finish { answer } if !answer.is_empty() => {
                if let Some(dropped) = &parsed.superseded_action {
                    tracing::warn!(
                        run_id = %run_id,
                        action = %dropped,
                        "reply held both an action and a final answer; using the answer"
                    );
                }
                return Ok(finish(steps, answer, Termination::FinalAnswer, completion));
            }
            ParsedAction::Act { tool, input } => {
                let observation = guard.run(registry.dispatch(&tool, &input)).await?;
                tracing::debug!(
                    run_id = %run_id,
                    tool = %tool,
                    observation_chars = observation.len(),
                    "tool dispatched"
                );

                messages.push(Message::user(observation_message(&observation)));
                let step = AgentStep {
                    thought: parsed.thought,
                    action: tool,
                    action_input: input,
                    observation,
                };
                if let Some(observer) = &config.on_step {
                    observer(&step);
                }
                steps.push(step);
            }
            ParsedAction::Finish { .. } => {
                tracing::warn!(run_id = %run_id, iteration, "reply had an empty final answer");
                messages.push(Message::user(CORRECTIVE_INSTRUCTION));
            }
            ParsedAction::Unparsed => {
                tracing::warn!(
                    run_id = %run_id,
                    iteration,
                    "reply had neither an action nor a final answer"
                );
                messages.push(Message::user(CORRECTIVE_INSTRUCTION));
            }
        }
    }

    tracing::warn!(
        run_id = %run_id,
        max_steps,
        steps = steps.len(),
        "step budget exhausted; forcing a final answer"
    );
    messages.push(Message::user(FORCE_FINAL_INSTRUCTION));

    let completion = guard.run(gateway.complete(&system, &messages)).await??;
    let final_answer = forced_answer(&completion.text);
    Ok(finish(steps, final_answer, Termination::StepBudget, completion))
}

/// Final answer from the forced reply: the parsed answer, else the raw
/// reply, else [`NO_ANSWER_NOTICE`].
fn forced_answer(reply: &str) -> String {
    let parsed = parse_response(reply);
    if let Some(answer) = parsed.final_answer.filter(|a| !a.is_empty()) {
        return answer;
    }
    let raw = reply.trim();
    if raw.is_empty() {
        NO_ANSWER_NOTICE.to_owned()
    } else {
        raw.to_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
