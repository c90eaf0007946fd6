// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pj-core: job data model shared by the pipeline orchestrator crates

pub mod macros;

pub mod clock;
pub mod id;
pub mod job;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{InvalidJobId, JobId, RecordId};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{
    Completion, ErrorKind, InputParams, Job, JobConfig, JobConfigBuilder, JobError, JobStatus,
    JobWarning, OutputManifest, ParseStatusError, SecondaryStageStatus, TransitionError,
    WarningKind,
};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
