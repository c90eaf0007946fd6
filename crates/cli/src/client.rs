// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client: one socket connection per request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pj_core::{InputParams, JobId, JobStatus};
use pj_daemon::{Config, LifecycleError};
use pj_wire::{ErrorCode, JobCounts, JobDetail, JobSummary, ProtocolError, Request, Response};
use serde::Serialize;
use thiserror::Error;
use tokio::net::UnixStream;

use crate::exit_error::{EXIT_BUSY, EXIT_FAILURE, EXIT_NOT_RUNNING};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running (no socket at {})", .0.display())]
    NotRunning(PathBuf),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The daemon answered with an error response
    #[error("{message}")]
    Rejected { kind: ErrorCode, message: String },

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning(_))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::NotRunning(_) => EXIT_NOT_RUNNING,
            ClientError::Rejected { kind: ErrorCode::Conflict, .. } => EXIT_BUSY,
            _ => EXIT_FAILURE,
        }
    }
}

/// Daemon health as reported by `Request::Status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaemonStatus {
    pub version: String,
    pub uptime_secs: u64,
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_job: Option<JobId>,
    pub counts: JobCounts,
}

/// Accepted trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Triggered {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
    pub started_at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    /// Client for the user-level daemon's socket.
    pub fn connect() -> Result<Self, ClientError> {
        let config = Config::load()?;
        Ok(Self::for_socket(config.socket_path))
    }

    pub fn for_socket(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into(), timeout: pj_daemon::env::ipc_timeout() }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one request. Error responses become `ClientError::Rejected`.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                    ClientError::NotRunning(self.socket_path.clone())
                }
                _ => ClientError::Protocol(e.into()),
            }
        })?;
        let (mut reader, mut writer) = stream.into_split();
        pj_wire::write_request(&mut writer, request, self.timeout).await?;
        match pj_wire::read_response(&mut reader, self.timeout).await? {
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            response => Ok(response),
        }
    }

    fn reject<T>(response: Response) -> Result<T, ClientError> {
        Err(ClientError::Unexpected(format!("{response:?}")))
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status { version, uptime_secs, busy, running_job, counts } => {
                Ok(DaemonStatus { version, uptime_secs, busy, running_job, counts })
            }
            other => Self::reject(other),
        }
    }

    pub async fn trigger(
        &self,
        job_id: Option<String>,
        input_params: InputParams,
    ) -> Result<Triggered, ClientError> {
        match self.send(&Request::Trigger { job_id, input_params }).await? {
            Response::Triggered { job_id, status, message, started_at_ms } => {
                Ok(Triggered { job_id, status, message, started_at_ms })
            }
            other => Self::reject(other),
        }
    }

    pub async fn get_job(&self, id: &str) -> Result<JobDetail, ClientError> {
        match self.send(&Request::GetJob { id: id.to_string() }).await? {
            Response::Job { job } => Ok(*job),
            other => Self::reject(other),
        }
    }

    pub async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<JobSummary>, ClientError> {
        match self.send(&Request::ListJobs { status }).await? {
            Response::Jobs { jobs } => Ok(jobs),
            other => Self::reject(other),
        }
    }

    pub async fn delete_job(&self, id: &str) -> Result<JobId, ClientError> {
        match self.send(&Request::DeleteJob { id: id.to_string() }).await? {
            Response::Deleted { id } => Ok(id),
            other => Self::reject(other),
        }
    }

    /// Ask the daemon to stop. Returns false when it was not running.
    pub async fn shutdown(&self) -> Result<bool, ClientError> {
        match self.send(&Request::Shutdown).await {
            Ok(Response::ShuttingDown) => Ok(true),
            Ok(other) => Self::reject(other),
            Err(e) if e.is_not_running() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Poll a job until it reaches a terminal state.
    pub async fn wait_for_job(&self, id: &str, interval: Duration) -> Result<JobDetail, ClientError> {
        loop {
            let detail = self.get_job(id).await?;
            if detail.job.is_terminal() {
                return Ok(detail);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
