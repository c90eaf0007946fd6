// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::test_helpers::*;
use pj_engine::TriggerRequest;

#[test]
fn config_lays_out_paths_under_state_dir() {
    let config = Config::with_state_dir("/s".into(), "/etc/pipeline.toml".into());
    assert_eq!(config.socket_path, Path::new("/s/daemon.sock"));
    assert_eq!(config.lock_path, Path::new("/s/daemon.pid"));
    assert_eq!(config.log_dir, Path::new("/s/logs"));
    assert_eq!(config.pipeline_path, Path::new("/etc/pipeline.toml"));
}

#[tokio::test]
async fn shutdown_removes_socket_and_pid_file() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let mut result = startup(&config).await.unwrap();

    result.daemon.shutdown(Duration::from_secs(1)).await.unwrap();

    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn shutdown_drains_running_job() {
    let dir = tempdir().unwrap();
    let config = test_config_with(dir.path(), "sleep 0.3");
    let mut result = startup(&config).await.unwrap();
    let orchestrator = result.daemon.orchestrator.clone();
    orchestrator
        .trigger(TriggerRequest { job_id: Some("drain".into()), ..TriggerRequest::default() })
        .unwrap();

    result.daemon.shutdown(Duration::from_secs(10)).await.unwrap();

    let job = orchestrator.status("drain").unwrap();
    assert_eq!(job.status, pj_core::JobStatus::Completed);
    assert!(!orchestrator.is_busy());
}

#[tokio::test]
async fn shutdown_gives_up_after_drain_timeout() {
    let dir = tempdir().unwrap();
    let config = test_config_with(dir.path(), "sleep 5");
    let mut result = startup(&config).await.unwrap();
    result
        .daemon
        .orchestrator
        .trigger(TriggerRequest { job_id: Some("slow".into()), ..TriggerRequest::default() })
        .unwrap();

    let started = std::time::Instant::now();
    result.daemon.shutdown(Duration::from_millis(200)).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(!config.socket_path.exists());
    let job = result.daemon.orchestrator.status("slow").unwrap();
    assert_eq!(job.status, pj_core::JobStatus::Failed);
    assert_eq!(job.error.map(|e| e.kind), Some(pj_core::ErrorKind::InternalError));
    assert!(!result.daemon.orchestrator.is_busy());
}
