// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pjd: pipeline job daemon
//!
//! Usage: `pjd [--foreground]`. Prints `READY` once the socket accepts
//! connections.

use std::process::ExitCode;
use std::sync::Arc;

use pj_daemon::{env, logging, startup, Config, LifecycleError, ListenCtx, Listener, StartupResult};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let foreground = std::env::args().skip(1).any(|arg| arg == "--foreground" || arg == "-f");
    match run(foreground).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("daemon failed: {}", e);
            eprintln!("pjd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(foreground: bool) -> Result<(), LifecycleError> {
    let config = Config::load()?;
    let _log_guard = logging::init(&config.log_dir, foreground)?;
    info!(
        version = env::PROTOCOL_VERSION,
        state_dir = %config.state_dir.display(),
        "starting pjd"
    );

    let StartupResult { mut daemon, listener } = startup(&config).await?;

    let ctx = Arc::new(ListenCtx::new(daemon.orchestrator.clone(), daemon.start_time));
    let shutdown = ctx.shutdown.clone();
    tokio::spawn(Listener::new(listener, ctx).run());

    println!("READY");

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = shutdown.cancelled() => info!("shutdown requested by client"),
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        _ = terminate.recv() => info!("terminate signal received"),
    }
    shutdown.cancel();

    daemon.shutdown(env::drain_timeout()).await
}
