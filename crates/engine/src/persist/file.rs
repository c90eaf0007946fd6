// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed result store: one JSON document per job id.

use super::{merge, ResultRecord, ResultStore, StoreError, StoredRecord, UpsertOutcome, Upserted};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Stores `{dir}/{job_id}.json`, each replaced atomically.
#[derive(Debug)]
pub struct FileResultStore {
    dir: PathBuf,
    // Serializes read-merge-write so concurrent upserts of one id cannot race
    write_lock: tokio::sync::Mutex<()>,
}

impl FileResultStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, write_lock: tokio::sync::Mutex::new(()) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }

    async fn read(&self, job_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        match tokio::fs::read(self.record_path(job_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn upsert(&self, record: ResultRecord) -> Result<Upserted, StoreError> {
        let _guard = self.write_lock.lock().await;
        let existing = self.read(&record.job_id).await?;
        let path = self.record_path(&record.job_id);
        let (stored, upserted) = merge(existing, record);
        if upserted.outcome == UpsertOutcome::Unchanged {
            return Ok(upserted);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(&stored)?;
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(upserted)
    }

    async fn get(&self, job_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        self.read(job_id).await
    }
}
