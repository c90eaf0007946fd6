// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn supervisor() -> ProcessSupervisor {
    ProcessSupervisor::new(64 * 1024)
}

/// Whether `pid` no longer exists (or is only a zombie awaiting reaping).
fn is_gone(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat.rsplit_once(')').is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

#[tokio::test]
async fn successful_command_reports_exit_zero_and_output() {
    let cmd = PipelineCommand::shell("train", "echo hello; echo warn >&2");
    let outcome = supervisor().run(&cmd, Duration::from_secs(10)).await.unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.exit_code, Some(0));
    assert!(!outcome.timed_out);
    assert_eq!(outcome.stdout, "hello\n");
    assert_eq!(outcome.stderr, "warn\n");
}

#[tokio::test]
async fn non_zero_exit_is_reported_not_raised() {
    let cmd = PipelineCommand::shell("train", "echo broken >&2; exit 3");
    let outcome = supervisor().run(&cmd, Duration::from_secs(10)).await.unwrap();

    assert!(!outcome.success());
    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.describe_exit(), "exit code 3");
    assert!(outcome.stderr.contains("broken"));
}

#[tokio::test]
async fn missing_program_is_a_launch_error() {
    let cmd = PipelineCommand::new("train", "/nonexistent/pipeline-binary");
    let err = supervisor().run(&cmd, Duration::from_secs(10)).await.unwrap_err();

    assert!(matches!(err, SupervisorError::Spawn { .. }));
    assert!(err.to_string().contains("/nonexistent/pipeline-binary"));
}

#[tokio::test]
async fn env_and_cwd_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let mut env = BTreeMap::new();
    env.insert("PIPELINE_PARTITION".to_string(), "2025-09-05".to_string());
    let cmd = PipelineCommand::shell("train", "echo \"$PIPELINE_PARTITION\"; pwd")
        .env(env)
        .cwd(dir.path());

    let outcome = supervisor().run(&cmd, Duration::from_secs(10)).await.unwrap();

    let canonical = dir.path().canonicalize().unwrap();
    let lines: Vec<&str> = outcome.stdout.lines().collect();
    assert_eq!(lines[0], "2025-09-05");
    assert_eq!(std::path::Path::new(lines[1]).canonicalize().unwrap(), canonical);
}

#[tokio::test]
async fn timeout_kills_and_reports() {
    let cmd = PipelineCommand::shell("train", "echo started; sleep 30");
    let started = Instant::now();

    let outcome = supervisor().run(&cmd, Duration::from_secs(1)).await.unwrap();

    assert!(outcome.timed_out);
    assert!(!outcome.success());
    assert_eq!(outcome.exit_code, None);
    assert_eq!(outcome.signal, Some(9));
    assert!(outcome.stdout.contains("started"));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn timeout_kills_the_whole_process_tree() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("worker.pid");
    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
    let cmd = PipelineCommand::shell("train", script);

    let outcome = supervisor().run(&cmd, Duration::from_secs(1)).await.unwrap();
    assert!(outcome.timed_out);

    let worker: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !is_gone(worker) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(is_gone(worker), "worker {worker} survived the timeout");
}

#[tokio::test]
async fn abandoned_run_kills_the_whole_process_tree() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("worker.pid");
    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
    let cmd = PipelineCommand::shell("train", script);

    let sup = supervisor();
    let abandoned = tokio::time::timeout(Duration::from_millis(500), sup.run(&cmd, Duration::from_secs(60))).await;
    assert!(abandoned.is_err(), "stage should still be running");

    let worker: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !is_gone(worker) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(is_gone(worker), "worker {worker} survived the abandoned run");
}

#[tokio::test]
async fn background_child_holding_output_does_not_hang() {
    let cmd = PipelineCommand::shell("train", "sleep 30 & echo done");
    let started = Instant::now();

    let outcome = supervisor().run(&cmd, Duration::from_secs(20)).await.unwrap();

    assert!(outcome.success());
    assert!(outcome.stdout.contains("done"));
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[tokio::test]
async fn output_is_bounded_by_capture_limit() {
    let cmd = PipelineCommand::shell("train", "i=0; while [ $i -lt 2000 ]; do echo line-$i; i=$((i+1)); done");
    let outcome = ProcessSupervisor::new(1_000).run(&cmd, Duration::from_secs(10)).await.unwrap();

    assert!(outcome.success());
    assert!(outcome.stdout_truncated);
    assert_eq!(outcome.stdout.len(), 1_000);
    assert!(outcome.stdout.ends_with("line-1999\n"));
}

#[test]
fn stage_command_layers_env_and_defaults_cwd() {
    let mut stage = StageConfig::new("train", "python");
    stage.args = vec!["main.py".to_string()];
    stage.env.insert("MODE".to_string(), "stage".to_string());
    stage.env.insert("KEEP".to_string(), "yes".to_string());
    let mut config = PipelineConfig::new("retention", stage.clone());
    config.artifact_root = PathBuf::from("/app");
    let mut extra = BTreeMap::new();
    extra.insert("MODE".to_string(), "param".to_string());

    let cmd = PipelineCommand::for_stage(&config, &stage, &extra);

    assert_eq!(cmd.label, "train");
    assert_eq!(cmd.args, vec!["main.py"]);
    assert_eq!(cmd.cwd, Some(PathBuf::from("/app")));
    assert_eq!(cmd.env.get("MODE").map(String::as_str), Some("param"));
    assert_eq!(cmd.env.get("KEEP").map(String::as_str), Some("yes"));
}
