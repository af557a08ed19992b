//! Shared helpers for the CLI: logging setup, input reading and output
//! formatting.

use std::io::{IsTerminal, Read};

use anyhow::{Context, Result, bail};
use paperwright_agent::{AgentResult, AgentStep, Backend};
use tracing_subscriber::EnvFilter;

use crate::cli::InputArgs;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the global tracing subscriber on stderr.  `RUST_LOG` overrides
/// `default_level`.
pub fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Resolve the input text from `--file`, the positional argument, or stdin.
pub fn read_input(args: &InputArgs) -> Result<String> {
    let text = if let Some(path) = &args.file {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    } else if let Some(text) = &args.text {
        text.clone()
    } else {
        let stdin = std::io::stdin();
        if stdin.is_terminal() {
            bail!("no input: pass the text as an argument, use --file, or pipe it on stdin");
        }
        let mut buf = String::new();
        stdin
            .lock()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    };

    if text.trim().is_empty() {
        bail!("input text is empty");
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Print one step to stderr as it happens.
pub fn print_step(step: &AgentStep) {
    eprintln!("  [{}] {}", step.action, first_line(&step.thought));
    eprintln!("    -> {}", first_line(&step.observation));
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// Print the final answer, or the whole result as JSON.
pub fn print_result(result: &AgentResult, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(result).context("failed to encode result")?;
        println!("{out}");
    } else {
        println!("{}", result.final_answer);
        tracing::info!(
            steps = result.total_steps,
            provider = %result.provider,
            model = %result.model,
            "done"
        );
    }
    Ok(())
}

/// Print the resolved backend list without revealing keys.
pub fn print_backends(backends: &[Backend], json: bool) -> Result<()> {
    if json {
        let rows: Vec<serde_json::Value> = backends
            .iter()
            .map(|b| {
                serde_json::json!({
                    "name": b.name,
                    "provider": b.client.provider.to_string(),
                    "model": b.client.model,
                    "base_url": b.client.base_url,
                    "configured": b.is_configured(),
                    "credential": b.credential_source,
                })
            })
            .collect();
        let out = serde_json::to_string_pretty(&rows).context("failed to encode backends")?;
        println!("{out}");
        return Ok(());
    }

    if backends.is_empty() {
        println!("No backends configured.");
        return Ok(());
    }

    for (i, b) in backends.iter().enumerate() {
        let status = if b.is_configured() {
            "ready".to_owned()
        } else {
            format!("missing {}", b.credential_source)
        };
        println!(
            "{}. {:<12} {:<10} {:<28} {}",
            i + 1,
            b.name,
            b.client.provider,
            b.client.model,
            status
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_positional_text() {
        let args = InputArgs {
            text: Some("Hello world.".into()),
            file: None,
        };
        assert_eq!(read_input(&args).unwrap(), "Hello world.");
    }

    #[test]
    fn reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "From a file.").unwrap();
        let args = InputArgs {
            text: None,
            file: Some(file.path().to_path_buf()),
        };
        assert_eq!(read_input(&args).unwrap(), "From a file.");
    }

    #[test]
    fn blank_input_is_rejected() {
        let args = InputArgs {
            text: Some("   \n".into()),
            file: None,
        };
        assert!(read_input(&args).is_err());
    }

    #[test]
    fn missing_file_has_context() {
        let args = InputArgs {
            text: None,
            file: Some("/nonexistent/paper.txt".into()),
        };
        let err = read_input(&args).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/paper.txt"));
    }
}
