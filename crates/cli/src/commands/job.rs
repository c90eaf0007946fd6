// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pj trigger`, `pj status`, `pj list`, `pj delete`

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use pj_core::{InputParams, JobStatus};

use crate::client::DaemonClient;
use crate::exit_error::{ExitError, EXIT_FAILURE};
use crate::output::{format_or_json, handle_list, render_job_detail, render_job_table, OutputFormat};

#[derive(Args, Debug)]
pub struct TriggerArgs {
    /// Job id; generated from the pipeline name and time when omitted
    #[arg(long)]
    pub id: Option<String>,

    /// Input parameter passed to the pipeline (repeatable)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Wait for the job to finish; exits non-zero if it fails
    #[arg(long)]
    pub wait: bool,

    /// Poll interval for --wait, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub poll_ms: u64,
}

/// Parse `key=value`. The value may be empty or contain `=`.
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Later occurrences of a key win.
pub fn collect_params(pairs: Vec<(String, String)>) -> InputParams {
    pairs.into_iter().collect()
}

pub async fn trigger(client: &DaemonClient, args: TriggerArgs, format: OutputFormat) -> Result<()> {
    let triggered = client.trigger(args.id, collect_params(args.params)).await?;

    if !args.wait {
        return format_or_json(format, &triggered, || {
            println!("{}", triggered.message);
        });
    }

    if format == OutputFormat::Text {
        println!("Job {} queued, waiting...", triggered.job_id);
    }
    let detail = client
        .wait_for_job(&triggered.job_id, Duration::from_millis(args.poll_ms.max(50)))
        .await?;
    format_or_json(format, &detail, || render_job_detail(&detail, &mut std::io::stdout()))?;

    if detail.job.status == JobStatus::Failed {
        let reason = detail
            .job
            .error
            .as_ref()
            .map(|e| format!("{}: {}", e.kind, e.message))
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(ExitError::new(EXIT_FAILURE, format!("job {} failed: {reason}", detail.job.id)).into());
    }
    Ok(())
}

pub async fn status(client: &DaemonClient, id: &str, format: OutputFormat) -> Result<()> {
    let detail = client.get_job(id).await?;
    format_or_json(format, &detail, || render_job_detail(&detail, &mut std::io::stdout()))
}

pub async fn list(client: &DaemonClient, status: Option<JobStatus>, format: OutputFormat) -> Result<()> {
    let jobs = client.list_jobs(status).await?;
    let empty = match status {
        Some(s) => format!("No {s} jobs"),
        None => "No jobs".to_string(),
    };
    handle_list(format, &jobs, &empty, render_job_table)
}

pub async fn delete(client: &DaemonClient, id: &str, format: OutputFormat) -> Result<()> {
    let deleted = client.delete_job(id).await?;
    let obj = serde_json::json!({ "deleted": deleted });
    format_or_json(format, &obj, || println!("Deleted job {deleted}"))
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
