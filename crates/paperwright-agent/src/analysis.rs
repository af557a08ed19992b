//! Offline text analysis used by the local tools.
//!
//! Everything here is deterministic and cheap: word and sentence counting
//! and a scan for stock phrases that make prose read as machine-generated.
//! Phrase matching uses a case-insensitive [`aho_corasick`] automaton;
//! sentence splitting uses a compiled [`regex`].

use std::fmt;
use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Phrases that are over-represented in LLM-written academic prose.
pub const AI_PHRASES: &[&str] = &[
    "delve into",
    "delves into",
    "it is worth noting that",
    "it is important to note that",
    "in the realm of",
    "a testament to",
    "plays a crucial role",
    "plays a pivotal role",
    "a myriad of",
    "in today's fast-paced",
    "ever-evolving landscape",
    "navigate the complexities",
    "shed light on",
    "sheds light on",
    "paving the way for",
    "underscores the importance",
    "a nuanced understanding",
    "multifaceted",
    "seamlessly",
    "in conclusion,",
    "furthermore,",
    "moreover,",
    "harness the power of",
    "groundbreaking",
];

static AI_PHRASE_MATCHER: LazyLock<Option<AhoCorasick>> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(AI_PHRASES)
        .map_err(|e| tracing::error!(error = %e, "failed to build phrase automaton"))
        .ok()
});

/// Sentence terminator: one or more of `.!?`, optionally followed by closing
/// quotes or brackets, then whitespace or end of text.
static SENTENCE_END: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"[.!?]+["')\]]*(?:\s+|$)"#)
        .map_err(|e| tracing::error!(error = %e, "failed to compile sentence regex"))
        .ok()
});

// ---------------------------------------------------------------------------
// Counting
// ---------------------------------------------------------------------------

/// Number of whitespace-separated tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into sentences.  Blank fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let Some(re) = SENTENCE_END.as_ref() else {
        return vec![text.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
    };

    let mut sentences = Vec::new();
    let mut start = 0;
    for m in re.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Summary statistics for a passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    pub words: usize,
    pub sentences: usize,
    pub paragraphs: usize,
    pub avg_sentence_words: f64,
    pub longest_sentence_words: usize,
}

impl TextStats {
    /// Compute statistics for `text`.
    pub fn of(text: &str) -> Self {
        let sentences = split_sentences(text);
        let lengths: Vec<usize> = sentences.iter().map(|s| word_count(s)).collect();
        let words = word_count(text);
        let paragraphs = text
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count();

        let avg_sentence_words = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
        };

        Self {
            words,
            sentences: sentences.len(),
            paragraphs,
            avg_sentence_words,
            longest_sentence_words: lengths.into_iter().max().unwrap_or(0),
        }
    }
}

impl fmt::Display for TextStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Words: {}", self.words)?;
        writeln!(f, "Sentences: {}", self.sentences)?;
        writeln!(f, "Paragraphs: {}", self.paragraphs)?;
        writeln!(
            f,
            "Average sentence length: {:.1} words",
            self.avg_sentence_words
        )?;
        write!(
            f,
            "Longest sentence: {} words",
            self.longest_sentence_words
        )
    }
}

// ---------------------------------------------------------------------------
// Phrase scan
// ---------------------------------------------------------------------------

/// One stock phrase found in a passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseHit {
    /// The phrase as listed in [`AI_PHRASES`].
    pub phrase: String,
    /// Number of non-overlapping occurrences.
    pub count: usize,
}

/// Find stock AI-sounding phrases, most frequent first (ties keep list
/// order).
pub fn find_ai_phrases(text: &str) -> Vec<PhraseHit> {
    let Some(ac) = AI_PHRASE_MATCHER.as_ref() else {
        return Vec::new();
    };

    let mut counts = vec![0usize; AI_PHRASES.len()];
    for mat in ac.find_iter(text) {
        counts[mat.pattern().as_usize()] += 1;
    }

    let mut hits: Vec<PhraseHit> = counts
        .into_iter()
        .enumerate()
        .filter(|&(_, count)| count > 0)
        .map(|(idx, count)| PhraseHit {
            phrase: AI_PHRASES[idx].to_owned(),
            count,
        })
        .collect();
    hits.sort_by(|a, b| b.count.cmp(&a.count));
    hits
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words() {
        assert_eq!(word_count("Hello world."), 2);
        assert_eq!(word_count("  spaced\n\tout  words "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn splits_sentences() {
        let s = split_sentences("First one. Second one! Is this third? Trailing fragment");
        assert_eq!(
            s,
            vec![
                "First one.",
                "Second one!",
                "Is this third?",
                "Trailing fragment"
            ]
        );
    }

    #[test]
    fn closing_quote_stays_with_sentence() {
        let s = split_sentences("He said \"stop.\" Then left.");
        assert_eq!(s, vec!["He said \"stop.\"", "Then left."]);
    }

    #[test]
    fn stats_for_short_passage() {
        let stats = TextStats::of("One two three. Four five.\n\nSix.");
        assert_eq!(stats.words, 6);
        assert_eq!(stats.sentences, 3);
        assert_eq!(stats.paragraphs, 2);
        assert_eq!(stats.longest_sentence_words, 3);
        assert!((stats.avg_sentence_words - 2.0).abs() < 1e-9);
        assert!(stats.to_string().contains("Sentences: 3"));
    }

    #[test]
    fn stats_for_empty_text() {
        let stats = TextStats::of("");
        assert_eq!(stats.words, 0);
        assert_eq!(stats.sentences, 0);
        assert_eq!(stats.avg_sentence_words, 0.0);
    }

    #[test]
    fn finds_phrases_case_insensitively() {
        let text = "We Delve Into the data. Moreover, results delve into causes. \
                    It is worth noting that this is multifaceted.";
        let hits = find_ai_phrases(text);
        assert_eq!(hits[0].phrase, "delve into");
        assert_eq!(hits[0].count, 2);
        assert!(hits.iter().any(|h| h.phrase == "moreover,"));
        assert!(hits.iter().any(|h| h.phrase == "it is worth noting that"));
        assert!(hits.iter().any(|h| h.phrase == "multifaceted"));
    }

    #[test]
    fn clean_text_has_no_hits() {
        assert!(find_ai_phrases("We measured the latency of three systems.").is_empty());
    }
}
