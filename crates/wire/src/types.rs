// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTO structs for the IPC protocol.

use pj_core::{ErrorKind, Job, JobStatus, SecondaryStageStatus};
use serde::{Deserialize, Serialize};

/// Summary of a job for listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub id: String,
    pub name: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_files_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_stage_status: Option<SecondaryStageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub warnings: usize,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        JobSummary {
            id: job.id.to_string(),
            name: job.name.clone(),
            status: job.status,
            progress: job.progress.clone(),
            created_at_ms: job.created_at_ms,
            completed_at_ms: job.completed_at_ms,
            execution_time_seconds: job.execution_time_seconds,
            output_files_count: job.output_files_count(),
            secondary_stage_status: job.secondary_stage_status,
            error_kind: job.error.as_ref().map(|e| e.kind),
            warnings: job.warnings.len(),
        }
    }
}

/// Detailed job information: the full record plus derived fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDetail {
    pub job: Job,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_files_count: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_artifacts: Vec<String>,
}

impl From<Job> for JobDetail {
    fn from(job: Job) -> Self {
        let output_files_count = job.output_files_count();
        let missing_artifacts = job.missing_artifacts().into_iter().map(str::to_string).collect();
        JobDetail { job, output_files_count, missing_artifacts }
    }
}

/// Number of jobs per status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCounts {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
