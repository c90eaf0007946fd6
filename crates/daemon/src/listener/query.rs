// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only request handlers.

use pj_core::JobStatus;
use pj_engine::StatusCounts;
use pj_wire::{JobCounts, JobDetail, JobSummary, Response};

use super::mutations::error_response;
use super::ListenCtx;
use crate::env::PROTOCOL_VERSION;

pub(super) fn handle_status(ctx: &ListenCtx) -> Response {
    let health = ctx.orchestrator.health();
    Response::Status {
        version: PROTOCOL_VERSION.to_string(),
        uptime_secs: ctx.start_time.elapsed().as_secs(),
        busy: health.busy,
        running_job: health.running_job,
        counts: job_counts(health.counts),
    }
}

pub(super) fn handle_get_job(ctx: &ListenCtx, id: &str) -> Response {
    match ctx.orchestrator.status(id) {
        Ok(job) => Response::Job { job: Box::new(JobDetail::from(job)) },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_list_jobs(ctx: &ListenCtx, status: Option<JobStatus>) -> Response {
    let jobs = ctx.orchestrator.list(status).iter().map(JobSummary::from).collect();
    Response::Jobs { jobs }
}

fn job_counts(counts: StatusCounts) -> JobCounts {
    JobCounts {
        queued: counts.queued,
        running: counts.running,
        completed: counts.completed,
        failed: counts.failed,
    }
}
