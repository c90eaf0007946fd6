// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and answering
//! one request per connection against the shared orchestrator.

mod mutations;
mod query;

use std::sync::Arc;
use std::time::Instant;

use pj_engine::Orchestrator;
use pj_wire::{ErrorCode, ProtocolError, Request, Response};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::env::ipc_timeout;

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub orchestrator: Orchestrator,
    pub start_time: Instant,
    /// Cancelled when a client requests shutdown
    pub shutdown: CancellationToken,
}

impl ListenCtx {
    pub fn new(orchestrator: Orchestrator, start_time: Instant) -> Self {
        Self { orchestrator, start_time, shutdown: CancellationToken::new() }
    }
}

/// Listener task for accepting socket connections.
pub struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Run the listener loop until shutdown, spawning tasks for each connection.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => {
                    debug!("listener stopped");
                    return;
                }
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Unix accept error: {}", e),
                },
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected")
        }
        ConnectionError::Protocol(ProtocolError::Timeout) => {
            warn!("Connection timeout")
        }
        _ => error!("Connection error: {}", e),
    }
}

/// Handle a single client connection: one request, one response.
async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let response = match pj_wire::read_request(&mut reader, ipc_timeout()).await {
        Ok(request) => {
            // Log queries at debug level (frequent polling), other requests at info
            if request.is_query() {
                debug!(request = ?request, "received query");
            } else {
                info!(request = ?request, "received request");
            }
            handle_request(request, ctx)
        }
        Err(ProtocolError::Json(e)) => {
            warn!(error = %e, "malformed request");
            Response::error(ErrorCode::BadRequest, format!("malformed request: {e}"))
        }
        Err(e) => return Err(e.into()),
    };

    debug!("Sending response: {:?}", response);

    pj_wire::write_response(&mut writer, &response, ipc_timeout()).await?;

    Ok(())
}

/// Handle a single request and return a response.
fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Status => query::handle_status(ctx),

        Request::Trigger { job_id, input_params } => {
            mutations::handle_trigger(ctx, job_id, input_params)
        }

        Request::GetJob { id } => query::handle_get_job(ctx, &id),

        Request::ListJobs { status } => query::handle_list_jobs(ctx, status),

        Request::DeleteJob { id } => mutations::handle_delete(ctx, &id),

        Request::Shutdown => {
            ctx.shutdown.cancel();
            Response::ShuttingDown
        }
    }
}

#[cfg(test)]
pub(crate) fn test_ctx(orchestrator: Orchestrator) -> ListenCtx {
    ListenCtx::new(orchestrator, Instant::now())
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
