// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pj daemon` - Daemon management commands

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::client::DaemonClient;
use crate::exit_error::{ExitError, EXIT_NOT_RUNNING};
use crate::output::{format_or_json, OutputFormat};

/// How long `pj daemon start` waits for the daemon to report READY.
const START_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon, letting a running job drain
    Stop,
    /// Check daemon status
    Status,
}

pub async fn daemon(client: &DaemonClient, command: DaemonCommand, format: OutputFormat) -> Result<()> {
    match command {
        DaemonCommand::Start { foreground } => start(client, foreground).await,
        DaemonCommand::Stop => stop(client).await,
        DaemonCommand::Status => status(client, format).await,
    }
}

async fn start(client: &DaemonClient, foreground: bool) -> Result<()> {
    let pjd = find_pjd_binary();

    if foreground {
        let status = Command::new(&pjd).arg("--foreground").status().await?;
        if !status.success() {
            return Err(anyhow!("Daemon exited with status: {}", status));
        }
        return Ok(());
    }

    if let Ok(status) = client.status().await {
        println!("Daemon already running (uptime: {})", format_uptime(status.uptime_secs));
        return Ok(());
    }

    let mut child = Command::new(&pjd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()
        .map_err(|e| anyhow!("failed to launch {}: {}", pjd.display(), e))?;

    let stdout = child.stdout.take().ok_or_else(|| anyhow!("daemon stdout unavailable"))?;
    let mut lines = BufReader::new(stdout).lines();
    let ready = tokio::time::timeout(START_TIMEOUT, lines.next_line()).await;
    match ready {
        Ok(Ok(Some(line))) if line.trim() == "READY" => {
            println!("Daemon started");
            Ok(())
        }
        Ok(_) => {
            // Exited before becoming ready; its reason is in the daemon log
            let status = child.wait().await?;
            Err(anyhow!("Daemon failed to start ({status}); see logs under the state directory"))
        }
        Err(_) => Err(anyhow!("Daemon did not become ready within {}s", START_TIMEOUT.as_secs())),
    }
}

async fn stop(client: &DaemonClient) -> Result<()> {
    if client.shutdown().await? {
        println!("Daemon stopping");
    } else {
        println!("Daemon not running");
    }
    Ok(())
}

async fn status(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let status = match client.status().await {
        Ok(status) => status,
        Err(e) if e.is_not_running() => {
            let obj = serde_json::json!({ "status": "not_running" });
            format_or_json(format, &obj, || println!("Daemon not running"))?;
            return Err(ExitError::new(EXIT_NOT_RUNNING, "").into());
        }
        Err(e) => return Err(e.into()),
    };

    format_or_json(format, &status, || {
        println!("Status: running");
        println!("Version: {}", status.version);
        println!("Uptime: {}", format_uptime(status.uptime_secs));
        match &status.running_job {
            Some(id) => println!("Pipeline: busy ({id})"),
            None => println!("Pipeline: idle"),
        }
        let c = status.counts;
        println!(
            "Jobs: {} queued, {} running, {} completed, {} failed",
            c.queued, c.running, c.completed, c.failed
        );
    })
}

pub(crate) fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// `pjd` next to the running `pj`, else from PATH.
fn find_pjd_binary() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("pjd")))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("pjd"))
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
