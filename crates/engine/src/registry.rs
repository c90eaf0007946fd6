// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job registry.
//!
//! The single source of truth for job status. Reads return snapshots; every
//! write goes through [`JobRegistry::update`], which applies a mutation to a
//! copy and commits it only if [`Job::check_update`] accepts the result. A
//! reader therefore never sees a half-applied transition, and a terminal
//! record can only be removed, never changed.

use indexmap::IndexMap;
use parking_lot::RwLock;
use pj_core::{Job, JobId, JobStatus, TransitionError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("job {0} already exists")]
    AlreadyExists(JobId),
    #[error("job {0} not found")]
    NotFound(String),
    #[error("job {id} is {status}")]
    InvalidState { id: JobId, status: JobStatus },
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.queued + self.running + self.completed + self.failed
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<IndexMap<JobId, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job. Ids are never reused while a record exists.
    pub fn create(&self, job: Job) -> Result<(), RegistryError> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(RegistryError::AlreadyExists(job.id));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Job, RegistryError> {
        self.jobs.read().get(id).cloned().ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.read().contains_key(id)
    }

    /// Apply `mutate` to a copy of the record and commit it atomically.
    ///
    /// Nothing is written if `mutate` fails or produces an illegal successor.
    pub fn update<T>(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Job) -> Result<T, TransitionError>,
    ) -> Result<T, RegistryError> {
        let mut jobs = self.jobs.write();
        let current = jobs.get_mut(id).ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let mut next = current.clone();
        let value = mutate(&mut next)?;
        current.check_update(&next)?;
        *current = next;
        Ok(value)
    }

    /// Snapshots, newest first, optionally filtered by status.
    pub fn list(&self, status: Option<JobStatus>) -> Vec<Job> {
        let jobs = self.jobs.read();
        let mut listed: Vec<Job> = jobs
            .values()
            .rev()
            .filter(|job| match status {
                Some(s) => job.status == s,
                None => true,
            })
            .cloned()
            .collect();
        // Stable: equal timestamps keep newest-inserted first
        listed.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        listed
    }

    /// Remove a terminal job and return its final record.
    pub fn delete(&self, id: &str) -> Result<Job, RegistryError> {
        let mut jobs = self.jobs.write();
        let job = jobs.get(id).ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if !job.is_terminal() {
            return Err(RegistryError::InvalidState { id: job.id.clone(), status: job.status });
        }
        jobs.shift_remove(id).ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// The job currently queued or running, if any.
    pub fn active(&self) -> Option<JobId> {
        self.jobs.read().values().rev().find(|job| !job.is_terminal()).map(|job| job.id.clone())
    }

    pub fn counts(&self) -> StatusCounts {
        let jobs = self.jobs.read();
        let mut counts = StatusCounts::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
