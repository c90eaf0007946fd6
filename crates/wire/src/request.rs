// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pj_core::{InputParams, JobStatus};
use serde::{Deserialize, Serialize};

/// Request from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Service health: uptime, gate, counts
    Status,

    /// Start a pipeline job
    Trigger {
        /// Caller-chosen id; generated when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
        #[serde(default)]
        input_params: InputParams,
    },

    /// Full record of one job
    GetJob { id: String },

    /// Job summaries, newest first
    ListJobs {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<JobStatus>,
    },

    /// Remove a completed or failed job
    DeleteJob { id: String },

    /// Request daemon shutdown
    Shutdown,
}

impl Request {
    /// Read-only requests, logged at debug level.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Request::Ping | Request::Status | Request::GetJob { .. } | Request::ListJobs { .. }
        )
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
