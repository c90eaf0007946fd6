// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log filter when `PJ_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Resolve state directory: PJ_STATE_DIR > XDG_STATE_HOME/pj > ~/.local/state/pj
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("PJ_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("pj"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/pj"))
}

/// Pipeline config file: PJ_CONFIG > `<state_dir>/pipeline.toml`
pub fn config_path(state_dir: &Path) -> PathBuf {
    match std::env::var("PJ_CONFIG") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => state_dir.join("pipeline.toml"),
    }
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    duration_ms("PJ_IPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// How long shutdown waits for a running job (default 5s, `PJ_DRAIN_TIMEOUT_MS`).
pub fn drain_timeout() -> Duration {
    duration_ms("PJ_DRAIN_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Tracing filter directive
pub fn log_filter() -> String {
    std::env::var("PJ_LOG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
