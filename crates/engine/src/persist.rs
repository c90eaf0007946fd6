// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result persistence
//!
//! Completed jobs write one record per job id to a [`ResultStore`]. Upserts
//! are keyed by job id: persisting the same payload twice leaves exactly one
//! record, and a changed payload replaces it while keeping its record id.
//! Persistence failures never fail a job; they come back as an error message
//! the orchestrator attaches as a warning.

mod file;
#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use file::FileResultStore;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryResultStore;

use crate::config::PipelineConfig;
use async_trait::async_trait;
use pj_core::{Job, JobId, RecordId, SecondaryStageStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("result store unavailable: {0}")]
    Unavailable(String),
}

/// Payload handed to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub job_id: JobId,
    pub created_at_ms: u64,
    pub primary_results: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_results: Option<Value>,
}

impl ResultRecord {
    /// Content digest of the payload, independent of timestamps.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.primary_results.to_string().as_bytes());
        if let Some(secondary) = &self.secondary_results {
            hasher.update(b"\0");
            hasher.update(secondary.to_string().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// A record as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record_id: RecordId,
    pub job_id: JobId,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_ms: Option<u64>,
    pub primary_results: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_results: Option<Value>,
    pub digest: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

pj_core::simple_display! {
    UpsertOutcome {
        Inserted => "inserted",
        Updated => "updated",
        Unchanged => "unchanged",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub record_id: RecordId,
    pub outcome: UpsertOutcome,
}

/// Merge `record` into the existing stored version, if any.
pub(crate) fn merge(existing: Option<StoredRecord>, record: ResultRecord) -> (StoredRecord, Upserted) {
    let digest = record.digest();
    match existing {
        Some(stored) if stored.digest == digest => {
            let upserted =
                Upserted { record_id: stored.record_id.clone(), outcome: UpsertOutcome::Unchanged };
            (stored, upserted)
        }
        Some(stored) => {
            let updated = StoredRecord {
                record_id: stored.record_id.clone(),
                job_id: stored.job_id,
                created_at_ms: stored.created_at_ms,
                updated_at_ms: Some(record.created_at_ms),
                primary_results: record.primary_results,
                secondary_results: record.secondary_results,
                digest,
            };
            (updated, Upserted { record_id: stored.record_id, outcome: UpsertOutcome::Updated })
        }
        None => {
            let record_id = RecordId::from_string(uuid::Uuid::new_v4().to_string());
            let inserted = StoredRecord {
                record_id: record_id.clone(),
                job_id: record.job_id,
                created_at_ms: record.created_at_ms,
                updated_at_ms: None,
                primary_results: record.primary_results,
                secondary_results: record.secondary_results,
                digest,
            };
            (inserted, Upserted { record_id, outcome: UpsertOutcome::Inserted })
        }
    }
}

/// Durable store for job results, keyed by job id.
#[async_trait]
pub trait ResultStore: Send + Sync + 'static {
    /// Insert or replace the record for `record.job_id`.
    async fn upsert(&self, record: ResultRecord) -> Result<Upserted, StoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<StoredRecord>, StoreError>;
}

/// Outcome of persisting one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistResult {
    pub ok: bool,
    pub record_id: Option<RecordId>,
    pub error: Option<String>,
}

impl PersistResult {
    fn stored(upserted: Upserted) -> Self {
        Self { ok: true, record_id: Some(upserted.record_id), error: None }
    }

    fn skipped() -> Self {
        Self { ok: true, record_id: None, error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self { ok: false, record_id: None, error: Some(error.into()) }
    }
}

/// Builds result records from completed jobs and writes them to a store.
#[derive(Clone)]
pub struct ResultPersister {
    store: Option<Arc<dyn ResultStore>>,
    artifact_root: PathBuf,
    primary_results: Option<String>,
    secondary_results: Option<String>,
}

impl std::fmt::Debug for ResultPersister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultPersister")
            .field("enabled", &self.store.is_some())
            .field("primary_results", &self.primary_results)
            .field("secondary_results", &self.secondary_results)
            .finish()
    }
}

impl ResultPersister {
    pub fn new(store: Arc<dyn ResultStore>, config: &PipelineConfig) -> Self {
        Self {
            store: Some(store),
            artifact_root: config.artifact_root.clone(),
            primary_results: config.persistence.primary_results.clone(),
            secondary_results: config.persistence.secondary_results.clone(),
        }
    }

    /// A persister that stores nothing.
    pub fn disabled() -> Self {
        Self {
            store: None,
            artifact_root: PathBuf::new(),
            primary_results: None,
            secondary_results: None,
        }
    }

    /// File-backed persister when `persistence.results_dir` is set.
    pub fn from_config(config: &PipelineConfig) -> Self {
        match &config.persistence.results_dir {
            Some(dir) => Self::new(Arc::new(FileResultStore::new(dir.clone())), config),
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Persist a completed job. Never panics and never returns `Err`; any
    /// failure is described in the result.
    pub async fn persist(&self, job: &Job) -> PersistResult {
        let Some(store) = &self.store else {
            tracing::debug!(job_id = %job.id, "persistence disabled");
            return PersistResult::skipped();
        };

        let primary_results = match &self.primary_results {
            Some(path) => match self.load_payload(path).await {
                Ok(value) => value,
                Err(reason) => {
                    return PersistResult::failed(format!(
                        "results not saved: primary payload {path} {reason}"
                    ));
                }
            },
            None => summary_payload(job),
        };

        let secondary_results = match (&self.secondary_results, job.secondary_stage_status) {
            (Some(path), Some(SecondaryStageStatus::Succeeded)) => {
                match self.load_payload(path).await {
                    Ok(value) => Some(value),
                    Err(reason) => {
                        tracing::warn!(job_id = %job.id, payload = %path, "secondary payload {reason}");
                        None
                    }
                }
            }
            _ => None,
        };

        let record = ResultRecord {
            job_id: job.id.clone(),
            created_at_ms: job.completed_at_ms.unwrap_or(job.created_at_ms),
            primary_results,
            secondary_results,
        };
        match store.upsert(record).await {
            Ok(upserted) => {
                tracing::info!(
                    job_id = %job.id,
                    record_id = %upserted.record_id,
                    outcome = %upserted.outcome,
                    "results persisted"
                );
                PersistResult::stored(upserted)
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "failed to persist results");
                PersistResult::failed(format!("results not saved: {e}"))
            }
        }
    }

    async fn load_payload(&self, path: &str) -> Result<Value, String> {
        let full = self.artifact_root.join(path);
        let bytes = match tokio::fs::read(&full).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err("is missing".into()),
            Err(e) => return Err(format!("could not be read: {e}")),
        };
        serde_json::from_slice(&bytes).map_err(|e| format!("is not valid JSON: {e}"))
    }
}

/// Payload recorded when no results artifact is configured.
fn summary_payload(job: &Job) -> Value {
    serde_json::json!({
        "job_id": job.id,
        "name": job.name,
        "input_params": job.input_params,
        "output_manifest": job.output_manifest,
        "output_files_count": job.output_files_count(),
        "model_saved": job.model_saved,
        "execution_time_seconds": job.execution_time_seconds,
    })
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
