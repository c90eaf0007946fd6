// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Completion, ErrorKind, Job, JobError, JobStatus};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for the job state machine.
pub mod strategies {
    use crate::job::JobStatus;
    use proptest::prelude::*;

    /// A lifecycle operation applied to a job record.
    #[derive(Debug, Clone)]
    pub enum LifecycleOp {
        Start,
        Progress(String),
        Complete,
        Fail,
    }

    pub fn arb_job_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Queued),
            Just(JobStatus::Running),
            Just(JobStatus::Completed),
            Just(JobStatus::Failed),
        ]
    }

    pub fn arb_lifecycle_op() -> impl Strategy<Value = LifecycleOp> {
        prop_oneof![
            Just(LifecycleOp::Start),
            "[a-z ]{0,12}".prop_map(LifecycleOp::Progress),
            Just(LifecycleOp::Complete),
            Just(LifecycleOp::Fail),
        ]
    }
}

// ── Job factory functions ───────────────────────────────────────────────

pub fn queued_job(id: &str) -> Job {
    Job::builder().id(id).progress("Queued").build()
}

pub fn running_job(id: &str) -> Job {
    Job::builder()
        .id(id)
        .status(JobStatus::Running)
        .started_at_ms(Some(1_000_100))
        .progress("Executing primary stage")
        .build()
}

pub fn completed_job(id: &str) -> Job {
    let mut job = running_job(id);
    let _ = job.complete(Completion { execution_time_seconds: 1.0, ..Completion::default() }, 1_002_000);
    job
}

pub fn failed_job(id: &str) -> Job {
    let mut job = running_job(id);
    let _ = job.fail(JobError::new(ErrorKind::ExecutionError, "exit 1"), Some(1.0), 1_002_000);
    job
}
