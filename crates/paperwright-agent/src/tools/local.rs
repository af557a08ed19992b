//! Tools that run entirely offline.

use async_trait::async_trait;

use crate::analysis::{self, TextStats};
use crate::error::Result;
use crate::tools::Tool;

pub const WORD_COUNT: &str = "word_count";
pub const TEXT_STATS: &str = "text_stats";
pub const FIND_AI_PHRASES: &str = "find_ai_phrases";

/// Counts whitespace-separated words.
pub struct WordCountTool;

#[async_trait]
impl Tool for WordCountTool {
    fn name(&self) -> &str {
        WORD_COUNT
    }

    fn description(&self) -> &str {
        "Count the words in the given text. Input: the text."
    }

    async fn execute(&self, input: &str) -> Result<String> {
        Ok(format!("Word count: {}", analysis::word_count(input)))
    }
}

/// Word, sentence and paragraph statistics.
pub struct TextStatsTool;

#[async_trait]
impl Tool for TextStatsTool {
    fn name(&self) -> &str {
        TEXT_STATS
    }

    fn description(&self) -> &str {
        "Report word, sentence and paragraph counts and sentence-length \
         statistics. Input: the text."
    }

    async fn execute(&self, input: &str) -> Result<String> {
        Ok(TextStats::of(input).to_string())
    }
}

/// Scans for stock phrases typical of machine-written prose.
pub struct AiPhraseTool;

#[async_trait]
impl Tool for AiPhraseTool {
    fn name(&self) -> &str {
        FIND_AI_PHRASES
    }

    fn description(&self) -> &str {
        "Find stock phrases that make academic prose sound machine-generated, \
         with occurrence counts. Input: the text."
    }

    async fn execute(&self, input: &str) -> Result<String> {
        let hits = analysis::find_ai_phrases(input);
        if hits.is_empty() {
            return Ok("No stock AI-sounding phrases found.".to_owned());
        }

        let lines: Vec<String> = hits
            .iter()
            .map(|h| format!("- \"{}\" x{}", h.phrase, h.count))
            .collect();
        Ok(format!(
            "Found {} stock phrase(s):\n{}",
            hits.len(),
            lines.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn word_count_format() {
        assert_eq!(
            WordCountTool.execute("Hello world.").await.unwrap(),
            "Word count: 2"
        );
        assert_eq!(WordCountTool.execute("").await.unwrap(), "Word count: 0");
    }

    #[tokio::test]
    async fn phrase_tool_reports_hits() {
        let out = AiPhraseTool
            .execute("We delve into results. Moreover, we delve into causes.")
            .await
            .unwrap();
        assert!(out.starts_with("Found 2 stock phrase(s):"));
        assert!(out.contains("- \"delve into\" x2"));
    }

    #[tokio::test]
    async fn phrase_tool_reports_clean_text() {
        let out = AiPhraseTool.execute("Plain text.").await.unwrap();
        assert_eq!(out, "No stock AI-sounding phrases found.");
    }

    #[tokio::test]
    async fn stats_tool_renders_table() {
        let out = TextStatsTool.execute("A b c. D e.").await.unwrap();
        assert!(out.contains("Words: 5"));
        assert!(out.contains("Sentences: 2"));
    }
}
