// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon tracing setup: daily-rotated log file, plus stderr in the foreground.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::env::{log_filter, DEFAULT_LOG_FILTER};

/// Base name of the rotated log files (`daemon.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "daemon.log";

/// Flushes the file writer when dropped; keep alive for the daemon's lifetime.
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Install the global subscriber.
pub fn init(log_dir: &Path, foreground: bool) -> std::io::Result<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);
    let stderr_layer = foreground.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter(&log_filter()))
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(std::io::Error::other)?;

    Ok(LogGuard { _file: guard })
}

/// Parse a filter directive, falling back to the default on bad input.
pub fn filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("pjd: ignoring invalid PJ_LOG {directive:?}: {e}");
        EnvFilter::new(DEFAULT_LOG_FILTER)
    })
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
