// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers that change the job table.

use pj_core::InputParams;
use pj_engine::{OrchestratorError, TriggerRequest};
use pj_wire::{ErrorCode, Response};
use tracing::{info, warn};

use super::ListenCtx;

pub(super) fn handle_trigger(
    ctx: &ListenCtx,
    job_id: Option<String>,
    input_params: InputParams,
) -> Response {
    match ctx.orchestrator.trigger(TriggerRequest { job_id, input_params }) {
        Ok(accepted) => Response::Triggered {
            job_id: accepted.job_id,
            status: accepted.status,
            message: accepted.message,
            started_at_ms: accepted.started_at_ms,
        },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_delete(ctx: &ListenCtx, id: &str) -> Response {
    match ctx.orchestrator.delete(id) {
        Ok(job) => {
            info!(job_id = %job.id, "deleted via request");
            Response::Deleted { id: job.id }
        }
        Err(e) => error_response(e),
    }
}

/// Map an orchestrator rejection onto the wire error taxonomy.
pub(super) fn error_response(e: OrchestratorError) -> Response {
    let kind = match &e {
        OrchestratorError::Conflict { .. } => ErrorCode::Conflict,
        OrchestratorError::AlreadyExists(_) => ErrorCode::AlreadyExists,
        OrchestratorError::NotFound(_) => ErrorCode::NotFound,
        OrchestratorError::InvalidState { .. } => ErrorCode::InvalidState,
        OrchestratorError::InvalidJobId(_) => ErrorCode::InvalidJobId,
        OrchestratorError::Internal(_) => {
            warn!(error = %e, "internal error handling request");
            ErrorCode::Internal
        }
    };
    Response::error(kind, e.to_string())
}
