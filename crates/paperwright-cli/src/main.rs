//! CLI entry point for Paperwright.
//!
//! This binary provides the `paperwright` command with one subcommand per
//! editing task plus `backends` for inspecting the provider chain.

mod cli;
mod helpers;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use paperwright_agent::{PaperwrightConfig, ProviderChain, Task, TaskRunner};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    helpers::init_tracing(if cli.verbose { "info" } else { "warn" }, cli.log_json);

    let config = PaperwrightConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    let backends = config.resolve_from_env();

    let task = match cli.command {
        Commands::Backends => return helpers::print_backends(&backends, cli.json),
        command => build_task(command)?,
    };

    let chain = ProviderChain::new(backends).context("failed to build provider chain")?;
    info!(backends = ?chain.backend_names(), task = %task.kind(), "starting");

    let mut agent_config = config.agent_config();
    if cli.verbose {
        agent_config = agent_config.on_step(helpers::print_step);
    }
    let runner = TaskRunner::new(Arc::new(chain))
        .with_config(agent_config)
        .with_max_steps(cli.max_steps.or(config.agent.max_steps));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling run");
            on_signal.cancel();
        }
    });

    let result = runner
        .run_with_cancel(&task, cancel)
        .await
        .with_context(|| format!("{} failed", task.kind()))?;

    helpers::print_result(&result, cli.json)
}

/// Read the input text and turn a task subcommand into a [`Task`].
fn build_task(command: Commands) -> Result<Task> {
    let task = match command {
        Commands::Polish { input, venue } => Task::Polish {
            text: helpers::read_input(&input)?,
            venue,
        },
        Commands::Translate { input, from, to } => Task::Translate {
            text: helpers::read_input(&input)?,
            from,
            to,
        },
        Commands::Compress {
            input,
            target_words,
        } => Task::Compress {
            text: helpers::read_input(&input)?,
            target_words,
        },
        Commands::Expand {
            input,
            target_words,
        } => Task::Expand {
            text: helpers::read_input(&input)?,
            target_words,
        },
        Commands::Deai { input } => Task::Deai {
            text: helpers::read_input(&input)?,
        },
        Commands::Logic { input } => Task::LogicCheck {
            text: helpers::read_input(&input)?,
        },
        Commands::Caption { input, kind } => Task::Caption {
            kind,
            description: helpers::read_input(&input)?,
        },
        Commands::Review { input, venue } => Task::Review {
            text: helpers::read_input(&input)?,
            venue,
        },
        Commands::Analyze { input } => Task::Analyze {
            text: helpers::read_input(&input)?,
        },
        Commands::Backends => anyhow::bail!("`backends` is not a task"),
    };
    Ok(task)
}
