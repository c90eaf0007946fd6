// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pj: command-line client for the pipeline job daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod exit_error;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pj_core::JobStatus;

use crate::client::{ClientError, DaemonClient};
use crate::commands::daemon::DaemonCommand;
use crate::commands::job::TriggerArgs;
use crate::exit_error::{ExitError, EXIT_FAILURE};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pj", version, about = "Trigger and inspect pipeline jobs")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a pipeline job
    Trigger(TriggerArgs),
    /// Show one job
    Status {
        /// Job id
        id: String,
    },
    /// List jobs, newest first
    List {
        /// Only jobs in this status (queued, running, completed, failed)
        #[arg(long)]
        status: Option<JobStatus>,
    },
    /// Remove a completed or failed job
    Delete {
        /// Job id
        id: String,
    },
    /// Check that the daemon answers
    Ping,
    /// Daemon management
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{e:#}");
            if !message.is_empty() {
                eprintln!("Error: {message}");
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = DaemonClient::connect()?;
    let format = cli.output;
    match cli.command {
        Commands::Trigger(args) => commands::job::trigger(&client, args, format).await,
        Commands::Status { id } => commands::job::status(&client, &id, format).await,
        Commands::List { status } => commands::job::list(&client, status, format).await,
        Commands::Delete { id } => commands::job::delete(&client, &id, format).await,
        Commands::Ping => commands::ping(&client, format).await,
        Commands::Daemon { command } => commands::daemon::daemon(&client, command, format).await,
    }
}

/// Process exit status for a failed command.
fn exit_code(e: &anyhow::Error) -> u8 {
    let code = if let Some(exit) = e.downcast_ref::<ExitError>() {
        exit.code
    } else if let Some(client) = e.downcast_ref::<ClientError>() {
        client.exit_code()
    } else {
        EXIT_FAILURE
    };
    u8::try_from(code).unwrap_or(1)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
