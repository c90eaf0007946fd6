// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pj_core::{JobId, JobStatus};
use serde::{Deserialize, Serialize};

use super::{JobCounts, JobDetail, JobSummary};

/// Category of a rejected request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Another job holds the pipeline
    Conflict,
    /// The requested job id is already in use
    AlreadyExists,
    NotFound,
    /// The job is not in a state that allows the operation
    InvalidState,
    InvalidJobId,
    BadRequest,
    Internal,
}

pj_core::simple_display! {
    ErrorCode {
        Conflict => "Conflict",
        AlreadyExists => "AlreadyExists",
        NotFound => "NotFound",
        InvalidState => "InvalidState",
        InvalidJobId => "InvalidJobId",
        BadRequest => "BadRequest",
        Internal => "Internal",
    }
}

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Health check response
    Pong,

    /// Service health
    Status {
        version: String,
        uptime_secs: u64,
        /// A job currently holds the gate
        busy: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        running_job: Option<JobId>,
        #[serde(default)]
        counts: JobCounts,
    },

    /// Job accepted and started in the background
    Triggered { job_id: JobId, status: JobStatus, message: String, started_at_ms: u64 },

    /// Single job details
    Job { job: Box<JobDetail> },

    /// List of jobs
    Jobs { jobs: Vec<JobSummary> },

    /// Job removed from the registry
    Deleted { id: JobId },

    /// Daemon is shutting down
    ShuttingDown,

    /// Error response
    Error { kind: ErrorCode, message: String },
}

impl Response {
    pub fn error(kind: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error { kind, message: message.into() }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
