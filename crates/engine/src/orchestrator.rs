// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job orchestrator
//!
//! `trigger` validates the request, takes the gate, records a `Queued` job and
//! returns immediately. Execution happens on a background task:
//!
//! ```text
//! supervising task (owns GatePermit)
//!   └── execution task: Running -> stage chain -> validate -> persist -> Completed | Failed
//! ```
//!
//! The supervising task awaits the execution task. If execution panics, is
//! aborted, or returns without recording a terminal state, the job is marked
//! `Failed` with `InternalError`; in every case the permit is dropped when the
//! supervising task ends.

use crate::chain::{ChainOutcome, PrimaryReport, SecondaryOutcome, StageChain};
use crate::config::PipelineConfig;
use crate::gate::{ConcurrencyGate, GatePermit};
use crate::persist::ResultPersister;
use crate::registry::{JobRegistry, RegistryError, StatusCounts};
use crate::supervisor::ProcessSupervisor;
use parking_lot::Mutex;
use pj_core::{
    Clock, Completion, ErrorKind, InputParams, InvalidJobId, Job, JobConfig, JobError, JobId,
    JobStatus, JobWarning, SystemClock, WarningKind,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{AbortHandle, JoinError, JoinHandle};

/// Environment variable carrying the job id into every stage.
pub const JOB_ID_ENV: &str = "PJ_JOB_ID";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("a pipeline job is already running{}", running_suffix(.running))]
    Conflict { running: Option<JobId> },
    #[error("job {0} already exists")]
    AlreadyExists(JobId),
    #[error("job {0} not found")]
    NotFound(String),
    #[error("job {id} is {status}; only completed or failed jobs can be deleted")]
    InvalidState { id: JobId, status: JobStatus },
    #[error("invalid job id: {0}")]
    InvalidJobId(#[from] InvalidJobId),
    #[error("internal error: {0}")]
    Internal(String),
}

fn running_suffix(running: &Option<JobId>) -> String {
    running.as_ref().map(|id| format!(" ({id})")).unwrap_or_default()
}

impl From<RegistryError> for OrchestratorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyExists(id) => OrchestratorError::AlreadyExists(id),
            RegistryError::NotFound(id) => OrchestratorError::NotFound(id),
            RegistryError::InvalidState { id, status } => {
                OrchestratorError::InvalidState { id, status }
            }
            RegistryError::Transition(e) => OrchestratorError::Internal(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub input_params: InputParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAccepted {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
    pub started_at_ms: u64,
}

/// Service health snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub busy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_job: Option<JobId>,
    pub counts: StatusCounts,
}

pub struct Orchestrator<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for Orchestrator<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct Inner<C: Clock> {
    config: PipelineConfig,
    registry: JobRegistry,
    gate: ConcurrencyGate,
    supervisor: ProcessSupervisor,
    persister: ResultPersister,
    clock: C,
    active: Mutex<Option<JoinHandle<()>>>,
    worker: Mutex<Option<AbortHandle>>,
}

impl Orchestrator<SystemClock> {
    pub fn new(config: PipelineConfig, persister: ResultPersister) -> Self {
        Self::with_clock(config, persister, SystemClock)
    }
}

impl<C: Clock> Orchestrator<C> {
    pub fn with_clock(config: PipelineConfig, persister: ResultPersister, clock: C) -> Self {
        let supervisor = ProcessSupervisor::new(config.capture.limit_bytes);
        Self {
            inner: Arc::new(Inner {
                config,
                registry: JobRegistry::new(),
                gate: ConcurrencyGate::new(),
                supervisor,
                persister,
                clock,
                active: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.inner.registry
    }

    /// Admit a new job and start it in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self, request: TriggerRequest) -> Result<TriggerAccepted, OrchestratorError> {
        let inner = &self.inner;
        let job_id = match request.job_id {
            Some(raw) => JobId::parse(&raw)?,
            None => inner.generate_id(),
        };
        if inner.registry.contains(&job_id) {
            return Err(OrchestratorError::AlreadyExists(job_id));
        }
        let Some(permit) = inner.gate.try_acquire() else {
            let running = inner.registry.active();
            tracing::info!(job_id = %job_id, running = ?running, "trigger rejected, pipeline busy");
            return Err(OrchestratorError::Conflict { running });
        };

        let config = JobConfig::builder(job_id.clone(), inner.config.name.clone())
            .input_params(request.input_params)
            .secondary_configured(inner.config.secondary.is_some())
            .build();
        let job = Job::new(config, &inner.clock);
        let created_at_ms = job.created_at_ms;
        // On error the permit drops here and the gate is free again
        inner.registry.create(job)?;
        tracing::info!(job_id = %job_id, "pipeline job queued");

        self.spawn_execution(job_id.clone(), permit);

        Ok(TriggerAccepted {
            message: format!("Pipeline triggered. Query job {job_id} for progress."),
            job_id,
            status: JobStatus::Queued,
            started_at_ms: created_at_ms,
        })
    }

    /// Snapshot of one job.
    pub fn status(&self, id: &str) -> Result<Job, OrchestratorError> {
        Ok(self.inner.registry.get(id)?)
    }

    /// Snapshots, newest first.
    pub fn list(&self, status: Option<JobStatus>) -> Vec<Job> {
        self.inner.registry.list(status)
    }

    /// Remove a terminal job. Persisted results are not touched.
    pub fn delete(&self, id: &str) -> Result<Job, OrchestratorError> {
        let job = self.inner.registry.delete(id)?;
        tracing::info!(job_id = %job.id, status = %job.status, "job deleted");
        Ok(job)
    }

    pub fn health(&self) -> Health {
        Health {
            busy: self.inner.gate.is_held(),
            running_job: self.inner.registry.active(),
            counts: self.inner.registry.counts(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inner.gate.is_held()
    }

    /// Wait for the most recently triggered job to finish.
    pub async fn wait_idle(&self) {
        let handle = self.inner.active.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "supervising task ended abnormally");
            }
        }
    }

    /// Abort the running job, if any, and wait for it to be recorded.
    ///
    /// The stage's process group is killed and the job ends `Failed` with
    /// `InternalError`.
    pub async fn abort_running(&self) {
        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            worker.abort();
        }
        self.wait_idle().await;
    }

    fn spawn_execution(&self, job_id: JobId, permit: GatePermit) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let _permit = permit;
            let worker = tokio::spawn({
                let inner = Arc::clone(&inner);
                let job_id = job_id.clone();
                async move { inner.execute(&job_id).await }
            });
            *inner.worker.lock() = Some(worker.abort_handle());
            let joined = worker.await;
            inner.worker.lock().take();
            inner.settle(&job_id, joined);
            tracing::debug!(job_id = %job_id, "pipeline gate released");
        });
        *self.inner.active.lock() = Some(handle);
    }
}

impl<C: Clock> Inner<C> {
    fn generate_id(&self) -> JobId {
        let now = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.clock.epoch_ms() as i64)
            .unwrap_or_default();
        let timestamp = now.format("%Y%m%dT%H%M%S%3fZ").to_string();
        let mut id = JobId::generate(&self.config.name, &self.config.primary.name, &timestamp);
        // Two triggers within the same millisecond
        let mut n = 1;
        while self.registry.contains(&id) {
            n += 1;
            id = JobId::generate(
                &self.config.name,
                &self.config.primary.name,
                &format!("{timestamp}-{n}"),
            );
        }
        id
    }

    async fn execute(&self, job_id: &JobId) {
        let now = self.clock.epoch_ms();
        let job = match self.registry.update(job_id, |job| {
            job.start(now)?;
            Ok(job.clone())
        }) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "failed to start job");
                return;
            }
        };
        tracing::info!(job_id = %job_id, "pipeline job started");

        let mut env = self.config.params.env_for(&job.input_params);
        env.insert(JOB_ID_ENV.to_string(), job_id.to_string());

        let progress = |message: &str| self.set_progress(job_id, message);
        let outcome = StageChain::new(&self.config, &self.supervisor).run(&env, &progress).await;
        let ChainOutcome { primary, primary_elapsed, secondary } = outcome;
        let execution_time_seconds = round_secs(primary_elapsed.as_secs_f64());

        match primary {
            Ok(report) => {
                self.finish_completed(job_id, report, secondary, execution_time_seconds).await
            }
            Err(error) => self.finish_failed(job_id, error, Some(execution_time_seconds)),
        }
    }

    async fn finish_completed(
        &self,
        job_id: &JobId,
        primary: PrimaryReport,
        secondary: SecondaryOutcome,
        execution_time_seconds: f64,
    ) {
        let mut warnings = Vec::new();
        let missing: Vec<&str> = primary
            .manifest
            .iter()
            .filter(|(_, present)| !**present)
            .map(|(path, _)| path.as_str())
            .collect();
        if !missing.is_empty() {
            tracing::warn!(job_id = %job_id, missing = ?missing, "expected artifacts missing");
            warnings.push(JobWarning::new(
                WarningKind::MissingArtifacts,
                format!(
                    "{}/{} expected artifacts present; missing: {}",
                    primary.manifest.len() - missing.len(),
                    primary.manifest.len(),
                    missing.join(", ")
                ),
            ));
        }

        let mut completion = Completion {
            execution_time_seconds,
            model_saved: primary.model_saved,
            stdout_excerpt: primary.report.stdout_excerpt,
            secondary_stage_status: secondary.status(),
            secondary_error: secondary.error().cloned(),
            warnings,
            output_manifest: primary.manifest,
            record_id: None,
        };

        if self.persister.is_enabled() {
            self.set_progress(job_id, "Persisting results");
        }
        let completed_at_ms = self.clock.epoch_ms();
        match self.preview_completion(job_id, &completion, completed_at_ms) {
            Ok(preview) => {
                let result = self.persister.persist(&preview).await;
                if result.ok {
                    completion.record_id = result.record_id;
                } else if let Some(error) = result.error {
                    completion.warnings.push(JobWarning::new(WarningKind::PersistenceWarning, error));
                }
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "cannot complete job");
                return;
            }
        }

        match self.registry.update(job_id, |job| job.complete(completion, completed_at_ms)) {
            Ok(()) => tracing::info!(
                job_id = %job_id,
                execution_time_seconds,
                "pipeline job completed"
            ),
            Err(e) => tracing::error!(job_id = %job_id, error = %e, "failed to record completion"),
        }
    }

    /// The record as it will look once completed, for persistence.
    fn preview_completion(
        &self,
        job_id: &JobId,
        completion: &Completion,
        completed_at_ms: u64,
    ) -> Result<Job, RegistryError> {
        let mut job = self.registry.get(job_id)?;
        job.complete(completion.clone(), completed_at_ms)?;
        Ok(job)
    }

    fn finish_failed(&self, job_id: &JobId, error: JobError, execution_time_seconds: Option<f64>) {
        tracing::warn!(
            job_id = %job_id,
            kind = %error.kind,
            "pipeline job failed: {}",
            error.message
        );
        let now = self.clock.epoch_ms();
        if let Err(e) = self.registry.update(job_id, |job| job.fail(error, execution_time_seconds, now)) {
            tracing::error!(job_id = %job_id, error = %e, "failed to record failure");
        }
    }

    /// Make sure the job ended in a terminal state once its execution task
    /// is gone, however that task ended.
    fn settle(&self, job_id: &JobId, joined: Result<(), JoinError>) {
        let terminal = self.registry.get(job_id).map(|job| job.is_terminal()).unwrap_or(true);
        if terminal {
            return;
        }
        let message = match joined {
            Ok(()) => "execution ended without recording a result".to_string(),
            Err(err) if err.is_panic() => {
                let payload = err.into_panic();
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                format!("execution task panicked: {detail}")
            }
            Err(_) => "execution task was cancelled".to_string(),
        };
        tracing::error!(job_id = %job_id, "{}", message);
        self.finish_failed(job_id, JobError::new(ErrorKind::InternalError, message), None);
    }

    fn set_progress(&self, job_id: &JobId, message: &str) {
        if let Err(e) = self.registry.update(job_id, |job| job.set_progress(message)) {
            tracing::debug!(job_id = %job_id, error = %e, "progress not recorded");
        }
    }
}

/// Seconds rounded to two decimals.
fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "orchestrator_tests/mod.rs"]
mod tests;
