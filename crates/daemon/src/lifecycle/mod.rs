// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use pj_engine::{ConfigError, Orchestrator};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::env;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/pj)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Directory for rotated daemon logs
    pub log_dir: PathBuf,
    /// Pipeline definition (TOML)
    pub pipeline_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let pipeline_path = env::config_path(&state_dir);
        Ok(Self::with_state_dir(state_dir, pipeline_path))
    }

    /// Lay out all daemon paths under `state_dir`.
    pub fn with_state_dir(state_dir: PathBuf, pipeline_path: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            log_dir: state_dir.join("logs"),
            pipeline_path,
            state_dir,
        }
    }
}

/// Daemon state during operation.
///
/// The listener is returned separately from startup to be spawned as a Listener task.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub orchestrator: Orchestrator,
    pub start_time: Instant,
}

/// Result of daemon startup - includes both the daemon state and the listener.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// A running job gets up to `drain` to finish; after that it is aborted,
    /// its stage's process group is killed, and it is recorded as failed.
    pub async fn shutdown(&mut self, drain: Duration) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        if self.orchestrator.is_busy() {
            let running = self.orchestrator.health().running_job;
            info!(job_id = ?running, drain_ms = drain.as_millis() as u64, "waiting for running job");
            if tokio::time::timeout(drain, self.orchestrator.wait_idle()).await.is_err() {
                warn!(job_id = ?running, "drain timeout elapsed, aborting job");
                self.orchestrator.abort_running().await;
            }
        }

        // Listener task stops with the runtime; the flock is released when
        // lock_file drops.
        remove_runtime_file(&self.config.socket_path, "socket");
        remove_runtime_file(&self.config.lock_path, "pid");

        info!("daemon shutdown complete");
        Ok(())
    }
}

fn remove_runtime_file(path: &std::path::Path, what: &str) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "failed to remove {what} file: {e}"),
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Pipeline config: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
