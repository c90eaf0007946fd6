// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and lifecycle state machine.
//!
//! A job moves strictly forward through `Queued -> Running -> {Completed, Failed}`.
//! Once terminal, a record never changes again; [`Job::check_update`] is the
//! single place that decides whether a proposed new version of a record is a
//! legal successor of the current one.

use crate::clock::Clock;
use crate::id::{JobId, RecordId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Caller-supplied parameters, recorded verbatim.
pub type InputParams = BTreeMap<String, String>;

/// Expected artifact path -> presence, in configured order.
pub type OutputManifest = IndexMap<String, bool>;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Whether `next` is a forward move from `self`.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        next.rank() > self.rank()
    }
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status {0:?} (expected queued, running, completed or failed)")]
pub struct ParseStatusError(pub String);

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Outcome of the optional chained stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryStageStatus {
    NotRun,
    Succeeded,
    Failed,
}

crate::simple_display! {
    SecondaryStageStatus {
        NotRun => "not_run",
        Succeeded => "succeeded",
        Failed => "failed",
    }
}

/// Asynchronous failure kinds recorded on a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Non-zero exit, or the command could not be launched
    ExecutionError,
    /// Wall-clock deadline exceeded; the process group was killed
    Timeout,
    /// The execution task itself panicked
    InternalError,
}

crate::simple_display! {
    ErrorKind {
        ExecutionError => "ExecutionError",
        Timeout => "Timeout",
        InternalError => "InternalError",
    }
}

/// Structured failure record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default)]
    pub stderr_excerpt: String,
    #[serde(default)]
    pub stdout_excerpt: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stderr_excerpt: String::new(),
            stdout_excerpt: String::new(),
        }
    }

    pub fn with_excerpts(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.stdout_excerpt = stdout.into();
        self.stderr_excerpt = stderr.into();
        self
    }
}

/// Non-fatal conditions attached to a completed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    MissingArtifacts,
    PersistenceWarning,
}

crate::simple_display! {
    WarningKind {
        MissingArtifacts => "MissingArtifacts",
        PersistenceWarning => "PersistenceWarning",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl JobWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// Everything recorded on the `Running -> Completed` transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub output_manifest: OutputManifest,
    pub execution_time_seconds: f64,
    pub model_saved: Option<bool>,
    pub stdout_excerpt: String,
    pub secondary_stage_status: Option<SecondaryStageStatus>,
    pub secondary_error: Option<JobError>,
    pub warnings: Vec<JobWarning>,
    pub record_id: Option<RecordId>,
}

/// Rejected state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job {id} cannot move from {from} to {to}")]
    Invalid { id: JobId, from: JobStatus, to: JobStatus },
    #[error("job {id} is {status} and can no longer be modified")]
    Terminal { id: JobId, status: JobStatus },
    #[error("job {id}: field `{field}` cannot be changed once set")]
    Immutable { id: JobId, field: &'static str },
    #[error("job {id}: `{field}` precedes the previous lifecycle timestamp")]
    OutOfOrder { id: JobId, field: &'static str },
}

/// Configuration for creating a new job
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub id: JobId,
    pub name: String,
    pub input_params: InputParams,
    /// A secondary stage is configured, so the record tracks its status
    pub secondary_configured: bool,
}

impl JobConfig {
    pub fn builder(id: impl Into<JobId>, name: impl Into<String>) -> JobConfigBuilder {
        JobConfigBuilder {
            id: id.into(),
            name: name.into(),
            input_params: InputParams::new(),
            secondary_configured: false,
        }
    }
}

pub struct JobConfigBuilder {
    id: JobId,
    name: String,
    input_params: InputParams,
    secondary_configured: bool,
}

impl JobConfigBuilder {
    crate::setters! {
        set {
            input_params: InputParams,
            secondary_configured: bool,
        }
    }

    pub fn build(self) -> JobConfig {
        JobConfig {
            id: self.id,
            name: self.name,
            input_params: self.input_params,
            secondary_configured: self.secondary_configured,
        }
    }
}

/// A pipeline job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Pipeline name from configuration
    pub name: String,
    pub status: JobStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default)]
    pub input_params: InputParams,
    /// Human-readable phase description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default)]
    pub output_manifest: OutputManifest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_seconds: Option<f64>,
    /// Presence of the configured model artifact (completed jobs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_saved: Option<bool>,
    /// Tail of primary stage stdout (completed jobs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_stage_status: Option<SecondaryStageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_error: Option<JobError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<JobWarning>,
    /// Persisted result record, when persistence succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
}

impl Job {
    /// Create a new queued job
    pub fn new(config: JobConfig, clock: &impl Clock) -> Self {
        Self::new_with_epoch_ms(config, clock.epoch_ms())
    }

    pub fn new_with_epoch_ms(config: JobConfig, epoch_ms: u64) -> Self {
        Self {
            id: config.id,
            name: config.name,
            status: JobStatus::Queued,
            created_at_ms: epoch_ms,
            started_at_ms: None,
            completed_at_ms: None,
            input_params: config.input_params,
            progress: Some("Queued".to_string()),
            output_manifest: OutputManifest::new(),
            execution_time_seconds: None,
            model_saved: None,
            stdout_excerpt: None,
            secondary_stage_status: config.secondary_configured.then_some(SecondaryStageStatus::NotRun),
            secondary_error: None,
            error: None,
            warnings: Vec::new(),
            record_id: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `Queued -> Running`
    ///
    /// Timestamps passed to the lifecycle methods are clamped so that
    /// `created <= started <= completed` holds even if the wall clock steps back.
    pub fn start(&mut self, epoch_ms: u64) -> Result<(), TransitionError> {
        self.advance(JobStatus::Running)?;
        self.started_at_ms = Some(epoch_ms.max(self.created_at_ms));
        Ok(())
    }

    /// Update the phase description of a non-terminal job.
    pub fn set_progress(&mut self, progress: impl Into<String>) -> Result<(), TransitionError> {
        self.ensure_mutable()?;
        self.progress = Some(progress.into());
        Ok(())
    }

    /// `Running -> Completed`
    pub fn complete(&mut self, completion: Completion, epoch_ms: u64) -> Result<(), TransitionError> {
        if self.status != JobStatus::Running {
            return Err(self.refuse(JobStatus::Completed));
        }
        self.advance(JobStatus::Completed)?;
        self.completed_at_ms = Some(self.not_before_last(epoch_ms));
        self.output_manifest = completion.output_manifest;
        self.execution_time_seconds = Some(completion.execution_time_seconds);
        self.model_saved = completion.model_saved;
        self.stdout_excerpt = Some(completion.stdout_excerpt);
        self.secondary_stage_status =
            completion.secondary_stage_status.or(self.secondary_stage_status);
        self.secondary_error = completion.secondary_error;
        self.warnings.extend(completion.warnings);
        self.record_id = completion.record_id;
        self.progress = Some("Pipeline completed successfully".to_string());
        Ok(())
    }

    /// `Queued | Running -> Failed`
    ///
    /// The secondary stage status, if tracked, is left as `NotRun`.
    pub fn fail(
        &mut self,
        error: JobError,
        execution_time_seconds: Option<f64>,
        epoch_ms: u64,
    ) -> Result<(), TransitionError> {
        self.advance(JobStatus::Failed)?;
        self.completed_at_ms = Some(self.not_before_last(epoch_ms));
        if execution_time_seconds.is_some() {
            self.execution_time_seconds = execution_time_seconds;
        }
        self.progress = Some(format!("Pipeline failed ({})", error.kind));
        self.error = Some(error);
        Ok(())
    }

    /// `"present/expected"` once a manifest has been recorded.
    pub fn output_files_count(&self) -> Option<String> {
        if self.output_manifest.is_empty() {
            return None;
        }
        let present = self.output_manifest.values().filter(|present| **present).count();
        Some(format!("{}/{}", present, self.output_manifest.len()))
    }

    /// Expected artifacts that were not produced.
    pub fn missing_artifacts(&self) -> Vec<&str> {
        self.output_manifest
            .iter()
            .filter(|(_, present)| !**present)
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// Decide whether `next` is a legal successor of this record.
    ///
    /// Terminal records are frozen, status never regresses, and identity,
    /// inputs, and already-set timestamps never change.
    pub fn check_update(&self, next: &Job) -> Result<(), TransitionError> {
        if self.is_terminal() {
            if self == next {
                return Ok(());
            }
            return Err(TransitionError::Terminal { id: self.id.clone(), status: self.status });
        }
        if next.status != self.status && !self.status.can_advance_to(next.status) {
            return Err(TransitionError::Invalid {
                id: self.id.clone(),
                from: self.status,
                to: next.status,
            });
        }
        let immutable = |field| Err(TransitionError::Immutable { id: self.id.clone(), field });
        if next.id != self.id {
            return immutable("id");
        }
        if next.name != self.name {
            return immutable("name");
        }
        if next.created_at_ms != self.created_at_ms {
            return immutable("created_at");
        }
        if next.input_params != self.input_params {
            return immutable("input_params");
        }
        if self.started_at_ms.is_some() && next.started_at_ms != self.started_at_ms {
            return immutable("started_at");
        }
        let out_of_order = |field| Err(TransitionError::OutOfOrder { id: self.id.clone(), field });
        if next.started_at_ms.is_some_and(|started| started < next.created_at_ms) {
            return out_of_order("started_at");
        }
        if next.completed_at_ms.is_some_and(|done| done < next.last_lifecycle_ms()) {
            return out_of_order("completed_at");
        }
        Ok(())
    }

    /// Latest of `created_at_ms` and `started_at_ms`.
    fn last_lifecycle_ms(&self) -> u64 {
        self.started_at_ms.unwrap_or(self.created_at_ms).max(self.created_at_ms)
    }

    fn not_before_last(&self, epoch_ms: u64) -> u64 {
        epoch_ms.max(self.last_lifecycle_ms())
    }

    fn ensure_mutable(&self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal { id: self.id.clone(), status: self.status });
        }
        Ok(())
    }

    fn refuse(&self, to: JobStatus) -> TransitionError {
        if self.is_terminal() {
            TransitionError::Terminal { id: self.id.clone(), status: self.status }
        } else {
            TransitionError::Invalid { id: self.id.clone(), from: self.status, to }
        }
    }

    fn advance(&mut self, to: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_advance_to(to) {
            return Err(self.refuse(to));
        }
        self.status = to;
        Ok(())
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = "job-1",
            name: String = "retention",
        }
        set {
            status: JobStatus = JobStatus::Queued,
            created_at_ms: u64 = 1_000_000,
            started_at_ms: Option<u64> = None,
            completed_at_ms: Option<u64> = None,
            input_params: InputParams = InputParams::new(),
            output_manifest: OutputManifest = OutputManifest::new(),
            execution_time_seconds: Option<f64> = None,
            model_saved: Option<bool> = None,
            secondary_stage_status: Option<SecondaryStageStatus> = None,
            warnings: Vec<JobWarning> = Vec::new(),
        }
        option {
            progress: String = None,
            stdout_excerpt: String = None,
            secondary_error: JobError = None,
            error: JobError = None,
            record_id: RecordId = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
