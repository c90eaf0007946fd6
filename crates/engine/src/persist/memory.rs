// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory result store for tests, with failure injection.

use super::{merge, ResultRecord, ResultStore, StoreError, StoredRecord, Upserted};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use pj_core::JobId;

#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: Mutex<IndexMap<JobId, StoredRecord>>,
    failure: Mutex<Option<String>>,
    calls: Mutex<usize>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upsert fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    pub fn record(&self, job_id: &str) -> Option<StoredRecord> {
        self.records.lock().get(job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Number of upsert calls, including failed ones.
    pub fn upsert_calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn upsert(&self, record: ResultRecord) -> Result<Upserted, StoreError> {
        *self.calls.lock() += 1;
        if let Some(message) = self.failure.lock().clone() {
            return Err(StoreError::Unavailable(message));
        }
        let mut records = self.records.lock();
        let existing = records.get(record.job_id.as_str()).cloned();
        let (stored, upserted) = merge(existing, record);
        records.insert(stored.job_id.clone(), stored);
        Ok(upserted)
    }

    async fn get(&self, job_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.record(job_id))
    }
}
