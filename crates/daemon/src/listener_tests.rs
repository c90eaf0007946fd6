// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pj_core::{ErrorKind, InputParams, JobStatus, SecondaryStageStatus};
use pj_engine::{PipelineConfig, ResultPersister, StageConfig};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

fn shell_stage(name: &str, script: &str, timeout_secs: u64) -> StageConfig {
    StageConfig {
        args: vec!["-c".to_string(), script.to_string()],
        timeout_secs,
        ..StageConfig::new(name, "sh")
    }
}

fn pipeline(root: &Path, script: &str, timeout_secs: u64) -> PipelineConfig {
    let mut config = PipelineConfig::new("retention", shell_stage("train", script, timeout_secs));
    config.artifact_root = root.to_path_buf();
    config.artifacts.expected = vec!["out/model.pkl".to_string()];
    config
}

fn setup(script: &str) -> (Arc<ListenCtx>, TempDir) {
    setup_with(script, 10, |_| {})
}

fn setup_with(
    script: &str,
    timeout_secs: u64,
    adjust: impl FnOnce(&mut PipelineConfig),
) -> (Arc<ListenCtx>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = pipeline(dir.path(), script, timeout_secs);
    adjust(&mut config);
    let orchestrator = Orchestrator::new(config, ResultPersister::disabled());
    (Arc::new(test_ctx(orchestrator)), dir)
}

/// Send one request through `handle_connection` over an in-memory pipe.
async fn roundtrip(ctx: &ListenCtx, request: Request) -> Response {
    let (client, server) = tokio::io::duplex(256 * 1024);
    let (mut client_r, mut client_w) = tokio::io::split(client);
    let (server_r, server_w) = tokio::io::split(server);

    let ask = async {
        pj_wire::write_request(&mut client_w, &request, IO_TIMEOUT).await.unwrap();
        pj_wire::read_response(&mut client_r, IO_TIMEOUT).await.unwrap()
    };
    let (served, response) = tokio::join!(handle_connection(server_r, server_w, ctx), ask);
    served.unwrap();
    response
}

fn trigger(id: &str) -> Request {
    Request::Trigger { job_id: Some(id.to_string()), input_params: InputParams::new() }
}

fn error_kind(response: &Response) -> ErrorCode {
    match response {
        Response::Error { kind, .. } => *kind,
        other => panic!("expected error response, got {other:?}"),
    }
}

#[tokio::test]
async fn ping_returns_pong() {
    let (ctx, _dir) = setup("true");
    assert_eq!(roundtrip(&ctx, Request::Ping).await, Response::Pong);
}

#[tokio::test]
async fn trigger_runs_job_to_completion() {
    let (ctx, _dir) = setup("mkdir -p out && echo m > out/model.pkl");

    let mut params = InputParams::new();
    params.insert("partition".to_string(), "2025-09-05".to_string());
    let response = roundtrip(
        &ctx,
        Request::Trigger { job_id: Some("t1".to_string()), input_params: params },
    )
    .await;
    match response {
        Response::Triggered { job_id, status, message, .. } => {
            assert_eq!(job_id, "t1");
            assert_eq!(status, JobStatus::Queued);
            assert!(message.contains("t1"));
        }
        other => panic!("expected Triggered, got {other:?}"),
    }

    ctx.orchestrator.wait_idle().await;

    match roundtrip(&ctx, Request::GetJob { id: "t1".to_string() }).await {
        Response::Job { job } => {
            assert_eq!(job.job.status, JobStatus::Completed);
            assert_eq!(job.output_files_count.as_deref(), Some("1/1"));
            assert!(job.missing_artifacts.is_empty());
            assert_eq!(
                job.job.input_params.get("partition").map(String::as_str),
                Some("2025-09-05")
            );
        }
        other => panic!("expected Job, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_stage_surfaces_in_job_detail() {
    let (ctx, _dir) = setup("echo broken >&2; exit 1");
    roundtrip(&ctx, trigger("t3")).await;
    ctx.orchestrator.wait_idle().await;

    let Response::Job { job } = roundtrip(&ctx, Request::GetJob { id: "t3".into() }).await else {
        panic!("expected Job response");
    };
    assert_eq!(job.job.status, JobStatus::Failed);
    let error = job.job.error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::ExecutionError);
    assert!(error.stderr_excerpt.contains("broken"));
}

#[tokio::test]
async fn trigger_while_running_is_a_conflict() {
    let (ctx, _dir) = setup_with("sleep 30", 1, |_| {});
    assert!(matches!(roundtrip(&ctx, trigger("t1")).await, Response::Triggered { .. }));

    let response = roundtrip(&ctx, trigger("t2")).await;
    assert_eq!(error_kind(&response), ErrorCode::Conflict);

    ctx.orchestrator.wait_idle().await;
    let Response::Jobs { jobs } = roundtrip(&ctx, Request::ListJobs { status: None }).await else {
        panic!("expected Jobs response");
    };
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "t1");
    assert_eq!(jobs[0].error_kind, Some(ErrorKind::Timeout));
}

#[tokio::test]
async fn malformed_job_id_is_rejected() {
    let (ctx, _dir) = setup("true");
    for id in ["", "a/b", ".hidden"] {
        let response = roundtrip(&ctx, trigger(id)).await;
        assert_eq!(error_kind(&response), ErrorCode::InvalidJobId, "id {id:?}");
    }
    assert!(ctx.orchestrator.list(None).is_empty());
    assert!(!ctx.orchestrator.is_busy());
}

#[tokio::test]
async fn duplicate_id_is_already_exists() {
    let (ctx, _dir) = setup("true");
    roundtrip(&ctx, trigger("t1")).await;
    ctx.orchestrator.wait_idle().await;

    let response = roundtrip(&ctx, trigger("t1")).await;
    assert_eq!(error_kind(&response), ErrorCode::AlreadyExists);
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (ctx, _dir) = setup("true");
    let get = roundtrip(&ctx, Request::GetJob { id: "nope".into() }).await;
    assert_eq!(error_kind(&get), ErrorCode::NotFound);
    let delete = roundtrip(&ctx, Request::DeleteJob { id: "nope".into() }).await;
    assert_eq!(error_kind(&delete), ErrorCode::NotFound);
}

#[tokio::test]
async fn delete_requires_terminal_job() {
    let (ctx, _dir) = setup("sleep 0.5");
    roundtrip(&ctx, trigger("t1")).await;

    let running = roundtrip(&ctx, Request::DeleteJob { id: "t1".into() }).await;
    assert_eq!(error_kind(&running), ErrorCode::InvalidState);

    ctx.orchestrator.wait_idle().await;
    let deleted = roundtrip(&ctx, Request::DeleteJob { id: "t1".into() }).await;
    assert_eq!(deleted, Response::Deleted { id: "t1".into() });

    let Response::Jobs { jobs } = roundtrip(&ctx, Request::ListJobs { status: None }).await else {
        panic!("expected Jobs response");
    };
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn list_filters_by_status() {
    let (ctx, _dir) = setup("test \"$PIPELINE_OUTCOME\" = ok");
    for (id, outcome) in [("a", "ok"), ("b", "bad"), ("c", "ok")] {
        let mut params = InputParams::new();
        params.insert("outcome".to_string(), outcome.to_string());
        roundtrip(&ctx, Request::Trigger { job_id: Some(id.into()), input_params: params }).await;
        ctx.orchestrator.wait_idle().await;
    }

    let Response::Jobs { jobs } =
        roundtrip(&ctx, Request::ListJobs { status: Some(JobStatus::Completed) }).await
    else {
        panic!("expected Jobs response");
    };
    let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a"]);
}

#[tokio::test]
async fn status_reports_health_and_counts() {
    let (ctx, _dir) = setup_with("sleep 30", 1, |_| {});
    roundtrip(&ctx, trigger("t1")).await;

    match roundtrip(&ctx, Request::Status).await {
        Response::Status { version, busy, running_job, counts, .. } => {
            assert_eq!(version, crate::env::PROTOCOL_VERSION);
            assert!(busy);
            assert_eq!(running_job.as_deref(), Some("t1"));
            assert_eq!(counts.queued + counts.running, 1);
        }
        other => panic!("expected Status, got {other:?}"),
    }

    ctx.orchestrator.wait_idle().await;
    let Response::Status { busy, counts, .. } = roundtrip(&ctx, Request::Status).await else {
        panic!("expected Status response");
    };
    assert!(!busy);
    assert_eq!(counts.failed, 1);
}

#[tokio::test]
async fn secondary_failure_is_reported_on_completed_job() {
    let (ctx, _dir) = setup_with("mkdir -p out && echo m > out/model.pkl", 10, |config| {
        config.secondary = Some(shell_stage("score", "exit 3", 10));
    });
    roundtrip(&ctx, trigger("t4")).await;
    ctx.orchestrator.wait_idle().await;

    let Response::Job { job } = roundtrip(&ctx, Request::GetJob { id: "t4".into() }).await else {
        panic!("expected Job response");
    };
    assert_eq!(job.job.status, JobStatus::Completed);
    assert_eq!(job.job.secondary_stage_status, Some(SecondaryStageStatus::Failed));
}

#[tokio::test]
async fn shutdown_cancels_token() {
    let (ctx, _dir) = setup("true");
    assert_eq!(roundtrip(&ctx, Request::Shutdown).await, Response::ShuttingDown);
    assert!(ctx.shutdown.is_cancelled());
}

#[tokio::test]
async fn malformed_request_gets_bad_request() {
    let (ctx, _dir) = setup("true");
    let (client, server) = tokio::io::duplex(4096);
    let (mut client_r, mut client_w) = tokio::io::split(client);
    let (server_r, server_w) = tokio::io::split(server);

    let ask = async {
        pj_wire::write_message(&mut client_w, br#"{"type":"Launch"}"#).await.unwrap();
        pj_wire::read_response(&mut client_r, IO_TIMEOUT).await.unwrap()
    };
    let (served, response) = tokio::join!(handle_connection(server_r, server_w, &ctx), ask);
    served.unwrap();
    assert_eq!(error_kind(&response), ErrorCode::BadRequest);
}

#[tokio::test]
async fn client_hangup_before_request_is_connection_closed() {
    let (ctx, _dir) = setup("true");
    let (client, server) = tokio::io::duplex(64);
    let (server_r, server_w) = tokio::io::split(server);
    let (_client_r, mut client_w) = tokio::io::split(client);
    client_w.shutdown().await.unwrap();

    let err = handle_connection(server_r, server_w, &ctx).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Protocol(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn listener_serves_unix_socket_until_shutdown() {
    let (ctx, dir) = setup("true");
    let socket = dir.path().join("daemon.sock");
    let unix = UnixListener::bind(&socket).unwrap();
    let server = tokio::spawn(Listener::new(unix, Arc::clone(&ctx)).run());

    let ask = |request: Request| {
        let socket = socket.clone();
        async move {
            let stream = tokio::net::UnixStream::connect(&socket).await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            pj_wire::write_request(&mut writer, &request, IO_TIMEOUT).await.unwrap();
            pj_wire::read_response(&mut reader, IO_TIMEOUT).await.unwrap()
        }
    };

    assert_eq!(ask(Request::Ping).await, Response::Pong);
    assert_eq!(ask(Request::Shutdown).await, Response::ShuttingDown);

    tokio::time::timeout(IO_TIMEOUT, server).await.unwrap().unwrap();
}
