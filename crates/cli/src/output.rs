// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use clap::ValueEnum;
use pj_wire::{JobDetail, JobSummary};
use serde::Serialize;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format a timestamp as relative time (e.g., "5s", "2m", "1h", "3d")
pub fn format_time_ago(epoch_ms: u64) -> String {
    if epoch_ms == 0 {
        return "-".to_string();
    }
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let elapsed_secs = now_ms.saturating_sub(epoch_ms) / 1000;
    pj_core::format_elapsed(elapsed_secs)
}

pub fn handle_list<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    empty_msg: &str,
    render_text: impl FnOnce(&[T], &mut dyn Write),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", empty_msg);
            } else {
                render_text(items, &mut std::io::stdout());
            }
        }
    }
    Ok(())
}

pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Text => {
            text_fn();
        }
    }
    Ok(())
}

/// One row per job, newest first as the daemon returns them.
pub fn render_job_table(jobs: &[JobSummary], out: &mut dyn Write) {
    let id_width = jobs.iter().map(|j| j.id.len()).max().unwrap_or(2).max(2);
    let _ = writeln!(
        out,
        "{:<id_width$}  {:<9}  {:>7}  {:>8}  {:<7}  PROGRESS",
        "ID", "STATUS", "AGE", "ELAPSED", "FILES"
    );
    for job in jobs {
        let elapsed = job
            .execution_time_seconds
            .map(|s| format!("{s:.1}s"))
            .unwrap_or_else(|| "-".to_string());
        let mut progress = job.progress.clone().unwrap_or_default();
        if let Some(kind) = job.error_kind {
            progress = format!("{kind}: {progress}");
        }
        if job.warnings > 0 {
            progress.push_str(&format!(" ({} warning(s))", job.warnings));
        }
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<9}  {:>7}  {:>8}  {:<7}  {}",
            job.id,
            job.status.to_string(),
            format_time_ago(job.created_at_ms),
            elapsed,
            job.output_files_count.as_deref().unwrap_or("-"),
            progress.trim(),
        );
    }
}

/// Full record of one job.
pub fn render_job_detail(detail: &JobDetail, out: &mut dyn Write) {
    let job = &detail.job;
    let _ = writeln!(out, "Job: {}", job.id);
    let _ = writeln!(out, "Pipeline: {}", job.name);
    let _ = writeln!(out, "Status: {}", job.status);
    if let Some(progress) = &job.progress {
        let _ = writeln!(out, "Progress: {}", progress);
    }
    let _ = writeln!(out, "Created: {} ago", format_time_ago(job.created_at_ms));
    if let Some(secs) = job.execution_time_seconds {
        let _ = writeln!(out, "Execution time: {secs:.2}s");
    }
    if !job.input_params.is_empty() {
        let _ = writeln!(out, "Params:");
        for (key, value) in &job.input_params {
            let _ = writeln!(out, "  {key} = {value}");
        }
    }
    if !job.output_manifest.is_empty() {
        let files = detail.output_files_count.as_deref().unwrap_or("-");
        let _ = writeln!(out, "Output files: {files}");
        for (path, present) in &job.output_manifest {
            let mark = if *present { "ok" } else { "missing" };
            let _ = writeln!(out, "  {path}: {mark}");
        }
    }
    if let Some(saved) = job.model_saved {
        let _ = writeln!(out, "Model saved: {}", if saved { "yes" } else { "no" });
    }
    if let Some(secondary) = job.secondary_stage_status {
        let _ = writeln!(out, "Secondary stage: {secondary}");
    }
    if let Some(error) = &job.secondary_error {
        let _ = writeln!(out, "Secondary error: {}: {}", error.kind, error.message);
    }
    if let Some(record_id) = &job.record_id {
        let _ = writeln!(out, "Result record: {record_id}");
    }
    for warning in &job.warnings {
        let _ = writeln!(out, "Warning: {}: {}", warning.kind, warning.message);
    }
    if let Some(error) = &job.error {
        let _ = writeln!(out, "Error: {}: {}", error.kind, error.message);
        if !error.stderr_excerpt.is_empty() {
            let _ = writeln!(out, "stderr:");
            write_indented(out, &error.stderr_excerpt);
        }
    }
    if let Some(stdout) = job.stdout_excerpt.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "stdout:");
        write_indented(out, stdout);
    }
}

fn write_indented(out: &mut dyn Write, text: &str) {
    for line in text.lines() {
        let _ = writeln!(out, "  {line}");
    }
}
