// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::super::test_helpers::*;
use fs2::FileExt;

#[tokio::test]
async fn startup_binds_socket_and_records_pid() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let result = startup(&config).await.unwrap();

    assert!(config.socket_path.exists());
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert_eq!(result.daemon.orchestrator.config().name, "retention");
    assert!(!result.daemon.orchestrator.is_busy());
}

#[tokio::test]
async fn second_startup_fails_while_first_holds_lock() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let _first = startup(&config).await.unwrap();

    match startup(&config).await {
        Err(LifecycleError::LockFailed(_)) => {}
        Err(e) => panic!("expected LockFailed, got: {e}"),
        Ok(_) => panic!("expected LockFailed, but startup succeeded"),
    }
    assert!(config.socket_path.exists(), "running daemon's socket must survive");
}

#[tokio::test]
async fn startup_lock_failed_does_not_remove_existing_files() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.state_dir).unwrap();

    // Files a running daemon would have
    std::fs::write(&config.socket_path, b"").unwrap();
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)
        .unwrap();
    lock_file.lock_exclusive().unwrap();
    std::fs::write(&config.lock_path, b"12345").unwrap();

    assert!(matches!(startup(&config).await, Err(LifecycleError::LockFailed(_))));

    assert!(config.socket_path.exists(), "socket file must not be deleted on LockFailed");
    assert_eq!(std::fs::read_to_string(&config.lock_path).unwrap(), "12345");
}

#[tokio::test]
async fn missing_pipeline_config_fails_and_cleans_up() {
    let dir = tempdir().unwrap();
    let config = Config::with_state_dir(dir.path().join("state"), dir.path().join("absent.toml"));

    match startup(&config).await {
        Err(LifecycleError::Config(e)) => assert!(e.to_string().contains("absent.toml")),
        Err(e) => panic!("expected Config error, got: {e}"),
        Ok(_) => panic!("startup must fail without a pipeline config"),
    }
    assert!(!config.lock_path.exists());
    assert!(!config.socket_path.exists());
}

#[tokio::test]
async fn invalid_pipeline_config_is_rejected() {
    let dir = tempdir().unwrap();
    let pipeline_path = dir.path().join("pipeline.toml");
    std::fs::write(&pipeline_path, "name = \"retention\"\n[primary]\nname = \"train\"\nprogram = \"\"\n")
        .unwrap();
    let config = Config::with_state_dir(dir.path().join("state"), pipeline_path);

    assert!(matches!(startup(&config).await, Err(LifecycleError::Config(_))));
}

#[tokio::test]
async fn stale_socket_is_replaced() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.state_dir).unwrap();
    std::fs::write(&config.socket_path, b"stale").unwrap();

    let _result = startup(&config).await.unwrap();

    let meta = std::fs::symlink_metadata(&config.socket_path).unwrap();
    use std::os::unix::fs::FileTypeExt;
    assert!(meta.file_type().is_socket());
}
