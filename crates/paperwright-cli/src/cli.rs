//! CLI argument definitions for Paperwright.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use paperwright_agent::CaptionKind;

/// Paperwright -- an agent for editing academic papers.
#[derive(Parser)]
#[command(
    name = "paperwright",
    version,
    about = "Paperwright -- agent for polishing and reviewing academic papers",
    long_about = "Runs a language model in a reason/act/observe loop with a small set of \
                  editing tools to polish, translate, shorten, expand, de-AI, logic-check, \
                  caption, review or analyze academic text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML, or JSON when the extension is `.json`).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Override the task's step budget.
    #[arg(long, global = true)]
    pub max_steps: Option<u32>,

    /// Print the full result as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log at info level and print each step to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Where the text to work on comes from.  With neither argument, stdin is
/// read.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// The text itself.
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// Read the text from a file.
    #[arg(long, short)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Polish text for clarity and formal register.
    Polish {
        #[command(flatten)]
        input: InputArgs,

        /// Target venue whose style to follow (e.g. "ACL", "Nature").
        #[arg(long)]
        venue: Option<String>,
    },

    /// Translate academic text.
    Translate {
        #[command(flatten)]
        input: InputArgs,

        /// Source language.
        #[arg(long, default_value = "Chinese")]
        from: String,

        /// Target language.
        #[arg(long, default_value = "English")]
        to: String,
    },

    /// Shorten text while keeping every claim.
    Compress {
        #[command(flatten)]
        input: InputArgs,

        /// Desired length in words.
        #[arg(long)]
        target_words: Option<u32>,
    },

    /// Elaborate text without inventing results.
    Expand {
        #[command(flatten)]
        input: InputArgs,

        /// Desired length in words.
        #[arg(long)]
        target_words: Option<u32>,
    },

    /// Rewrite text so it no longer reads as machine-generated.
    Deai {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Check the argument for gaps and contradictions.
    Logic {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Draft a figure or table caption from a description.
    Caption {
        #[command(flatten)]
        input: InputArgs,

        /// `figure` or `table`.
        #[arg(long, default_value = "figure")]
        kind: CaptionKind,
    },

    /// Write a peer-review style critique.
    Review {
        #[command(flatten)]
        input: InputArgs,

        /// Venue whose standards to review against.
        #[arg(long)]
        venue: Option<String>,
    },

    /// Comprehensive language, logic and style analysis.
    Analyze {
        #[command(flatten)]
        input: InputArgs,
    },

    /// List configured model backends and whether their keys are present.
    Backends,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "paperwright",
            "polish",
            "--venue",
            "ACL",
            "--max-steps",
            "3",
            "--json",
            "Some text.",
        ])
        .unwrap();
        assert_eq!(cli.max_steps, Some(3));
        assert!(cli.json);
        match cli.command {
            Commands::Polish { input, venue } => {
                assert_eq!(input.text.as_deref(), Some("Some text."));
                assert_eq!(venue.as_deref(), Some("ACL"));
            }
            _ => panic!("expected polish"),
        }
    }

    #[test]
    fn caption_kind_parses_from_flag() {
        let cli =
            Cli::try_parse_from(["paperwright", "caption", "--kind", "table", "accuracy"]).unwrap();
        match cli.command {
            Commands::Caption { kind, .. } => assert_eq!(kind, CaptionKind::Table),
            _ => panic!("expected caption"),
        }
    }

    #[test]
    fn text_and_file_conflict() {
        let result = Cli::try_parse_from(["paperwright", "deai", "--file", "a.txt", "inline"]);
        assert!(result.is_err());
    }
}
