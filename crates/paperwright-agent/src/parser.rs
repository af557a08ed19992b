//! Decoder for the textual agent protocol.
//!
//! The model is instructed to answer in one of two shapes:
//!
//! ```text
//! Thought: <reasoning>
//! Action: <tool name>
//! Action Input: <tool input, may span multiple lines>
//! ```
//!
//! or
//!
//! ```text
//! Thought: <final reasoning>
//! Final Answer: <output, unbounded length>
//! ```
//!
//! [`parse_response`] never fails.  Malformed replies decode to empty or
//! partial fields and the runtime decides how to react.  Downstream code
//! should branch on [`ParsedResponse::action`] rather than on raw text.

use serde::{Deserialize, Serialize};

const THOUGHT: &str = "Thought:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const OBSERVATION: &str = "Observation:";
const FINAL_ANSWER: &str = "Final Answer:";

/// A protocol marker found at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Thought,
    Action,
    ActionInput,
    Observation,
    FinalAnswer,
}

/// Classify a line by its leading marker, returning the text after it.
///
/// `Action Input:` is checked before `Action:` so the two never collide.
fn line_marker(line: &str) -> Option<(Marker, &str)> {
    let line = line.trim_start();
    [
        (Marker::ActionInput, ACTION_INPUT),
        (Marker::Action, ACTION),
        (Marker::Thought, THOUGHT),
        (Marker::Observation, OBSERVATION),
        (Marker::FinalAnswer, FINAL_ANSWER),
    ]
    .into_iter()
    .find_map(|(marker, prefix)| line.strip_prefix(prefix).map(|rest| (marker, rest)))
}

/// Field-level decoding of one model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    /// Reasoning text after the first `Thought:` marker (may be empty).
    pub thought: String,

    /// Tool name from the first `Action:` line.  Always `None` when a final
    /// answer is present.
    pub action: Option<String>,

    /// Tool input from the first `Action Input:` marker.  Always `None` when
    /// a final answer is present.
    pub action_input: Option<String>,

    /// Everything after the first `Final Answer:` marker.
    pub final_answer: Option<String>,

    /// Tool name of an `Action:` line that preceded the final answer and was
    /// therefore dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_action: Option<String>,
}

/// What the runtime should do with a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAction {
    /// Invoke `tool` with `input`.
    Act { tool: String, input: String },
    /// Stop with `answer`.
    Finish { answer: String },
    /// Neither an action nor a final answer was found.
    Unparsed,
}

impl ParsedResponse {
    /// The tagged view of this reply.
    pub fn action(&self) -> ParsedAction {
        if let Some(answer) = &self.final_answer {
            return ParsedAction::Finish {
                answer: answer.clone(),
            };
        }
        match &self.action {
            Some(tool) => ParsedAction::Act {
                tool: tool.clone(),
                input: self.action_input.clone().unwrap_or_default(),
            },
            None => ParsedAction::Unparsed,
        }
    }
}

/// Decode one model reply.
pub fn parse_response(text: &str) -> ParsedResponse {
    if let Some(pos) = text.find(FINAL_ANSWER) {
        let head: Vec<&str> = text[..pos].lines().collect();
        let answer = text[pos + FINAL_ANSWER.len()..].trim().to_owned();
        return ParsedResponse {
            thought: thought_block(&head),
            action: None,
            action_input: None,
            final_answer: Some(answer),
            superseded_action: first_action(head.iter().copied()),
        };
    }

    let lines: Vec<&str> = text.lines().collect();
    let thought = thought_block(&lines);

    let action = first_action(lines.iter().copied());

    let action_input = lines
        .iter()
        .position(|l| matches!(line_marker(l), Some((Marker::ActionInput, _))))
        .map(|start| capture_block(&lines, start));

    ParsedResponse {
        thought,
        action,
        action_input,
        final_answer: None,
        superseded_action: None,
    }
}

/// Text of the first `Thought:` block, or empty.
fn thought_block(lines: &[&str]) -> String {
    lines
        .iter()
        .position(|l| matches!(line_marker(l), Some((Marker::Thought, _))))
        .map(|start| capture_block(lines, start))
        .unwrap_or_default()
}

/// Tool name from the first non-empty `Action:` line.
fn first_action<'a>(lines: impl Iterator<Item = &'a str>) -> Option<String> {
    lines.into_iter().find_map(|l| match line_marker(l) {
        Some((Marker::Action, rest)) => {
            let name = rest.trim();
            (!name.is_empty()).then(|| name.to_owned())
        }
        _ => None,
    })
}

/// Capture the text after the marker on `lines[start]` plus every following
/// line up to (not including) the next line that begins with a marker.
fn capture_block(lines: &[&str], start: usize) -> String {
    let first = line_marker(lines[start]).map_or("", |(_, rest)| rest);

    let mut block = String::from(first);
    for line in &lines[start + 1..] {
        if line_marker(line).is_some() {
            break;
        }
        block.push('\n');
        block.push_str(line);
    }

    block.trim().to_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action_reply() {
        let parsed =
            parse_response("Thought: count it\nAction: word_count\nAction Input: Hello world.");
        assert_eq!(parsed.thought, "count it");
        assert_eq!(parsed.action.as_deref(), Some("word_count"));
        assert_eq!(parsed.action_input.as_deref(), Some("Hello world."));
        assert_eq!(parsed.final_answer, None);
        assert_eq!(
            parsed.action(),
            ParsedAction::Act {
                tool: "word_count".into(),
                input: "Hello world.".into()
            }
        );
    }

    #[test]
    fn parses_final_answer() {
        let parsed = parse_response("Thought: done\nFinal Answer: Hello world. (2 words)");
        assert_eq!(parsed.thought, "done");
        assert_eq!(parsed.final_answer.as_deref(), Some("Hello world. (2 words)"));
        assert_eq!(
            parsed.action(),
            ParsedAction::Finish {
                answer: "Hello world. (2 words)".into()
            }
        );
    }

    #[test]
    fn final_answer_wins_over_earlier_action() {
        let reply = "Thought: x\nAction: word_count\nAction Input: abc\nFinal Answer: the end";
        let parsed = parse_response(reply);
        assert_eq!(parsed.final_answer.as_deref(), Some("the end"));
        assert_eq!(parsed.action, None);
        assert_eq!(parsed.action_input, None);
        assert_eq!(parsed.superseded_action.as_deref(), Some("word_count"));
    }

    #[test]
    fn thought_stops_at_inline_final_answer() {
        let parsed = parse_response("Thought: done. Final Answer: 42");
        assert_eq!(parsed.thought, "done.");
        assert_eq!(parsed.final_answer.as_deref(), Some("42"));
    }

    #[test]
    fn final_answer_is_not_line_bounded() {
        let parsed = parse_response("I think we're done. Final Answer: line one\n\nline two\nAction: nope");
        assert_eq!(
            parsed.final_answer.as_deref(),
            Some("line one\n\nline two\nAction: nope")
        );
    }

    #[test]
    fn multi_line_action_input_stops_at_observation() {
        let reply = "Thought: polish\nAction: polish_text\nAction Input: First paragraph.\n\nSecond paragraph.\n  indented line  \nObservation: hallucinated";
        let parsed = parse_response(reply);
        assert_eq!(
            parsed.action_input.as_deref(),
            Some("First paragraph.\n\nSecond paragraph.\n  indented line")
        );
    }

    #[test]
    fn action_input_on_following_line() {
        let reply = "Action: polish_text\nAction Input:\n  The text.\nThought: next";
        let parsed = parse_response(reply);
        assert_eq!(parsed.action_input.as_deref(), Some("The text."));
    }

    #[test]
    fn action_is_not_confused_with_action_input() {
        let reply = "Action Input: first\nAction: word_count";
        let parsed = parse_response(reply);
        assert_eq!(parsed.action.as_deref(), Some("word_count"));
        assert_eq!(parsed.action_input.as_deref(), Some("first"));
    }

    #[test]
    fn action_without_input_dispatches_empty_string() {
        let parsed = parse_response("Thought: t\nAction: text_stats");
        assert_eq!(parsed.action_input, None);
        assert_eq!(
            parsed.action(),
            ParsedAction::Act {
                tool: "text_stats".into(),
                input: String::new()
            }
        );
    }

    #[test]
    fn thought_only_is_unparsed() {
        let parsed = parse_response("Thought: I am still thinking\nabout this problem");
        assert_eq!(parsed.thought, "I am still thinking\nabout this problem");
        assert_eq!(parsed.action(), ParsedAction::Unparsed);
    }

    #[test]
    fn empty_action_name_is_ignored() {
        let parsed = parse_response("Action:   \nAction Input: x");
        assert_eq!(parsed.action, None);
        assert_eq!(parsed.action(), ParsedAction::Unparsed);
    }

    #[test]
    fn garbage_never_fails() {
        for reply in ["", "   ", "no markers at all", "Thought:", "Final Answer:"] {
            let parsed = parse_response(reply);
            assert!(parsed.action.is_none());
        }
        assert_eq!(
            parse_response("Final Answer:").final_answer.as_deref(),
            Some("")
        );
    }

    #[test]
    fn leading_whitespace_before_markers_is_tolerated() {
        let parsed = parse_response("  Thought: t\n  Action: word_count\n  Action Input: a b");
        assert_eq!(parsed.action.as_deref(), Some("word_count"));
        assert_eq!(parsed.action_input.as_deref(), Some("a b"));
    }
}
