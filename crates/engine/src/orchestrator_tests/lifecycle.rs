// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger-to-terminal scenarios

use super::*;

#[tokio::test]
async fn successful_run_completes_with_manifest_and_record() {
    let h = setup(WRITE_ALL);

    let accepted = h.trigger("t1").unwrap();
    assert_eq!(accepted.job_id, "t1");
    assert_eq!(accepted.status, JobStatus::Queued);
    assert_eq!(accepted.started_at_ms, FakeClock::START_EPOCH_MS);
    assert!(h.orchestrator.is_busy());

    h.orchestrator.wait_idle().await;
    let job = h.orchestrator.status("t1").unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.output_manifest.values().all(|present| *present));
    assert_eq!(job.output_files_count().as_deref(), Some("2/2"));
    assert_eq!(job.model_saved, Some(true));
    assert!(job.execution_time_seconds.unwrap() >= 0.0);
    assert!(job.error.is_none());
    assert!(job.warnings.is_empty());
    assert_eq!(job.progress.as_deref(), Some("Pipeline completed successfully"));

    let stored = h.store.record("t1").unwrap();
    assert_eq!(job.record_id, Some(stored.record_id));
    assert_eq!(stored.primary_results["churned"], 2);
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn input_params_reach_the_process_environment() {
    let script = "mkdir -p out && printf '{\"partition\":\"%s\",\"job\":\"%s\"}' \
                  \"$GCS_DATE_PARTITION\" \"$PJ_JOB_ID\" > out/result.json";
    let h = setup_with(script, |config| {
        config.params.env.insert("partition".to_string(), "GCS_DATE_PARTITION".to_string());
    });
    let mut params = InputParams::new();
    params.insert("partition".to_string(), "2025-09-05".to_string());

    h.orchestrator
        .trigger(TriggerRequest { job_id: Some("t1".to_string()), input_params: params.clone() })
        .unwrap();
    h.orchestrator.wait_idle().await;

    let job = h.orchestrator.status("t1").unwrap();
    assert_eq!(job.input_params, params);
    let stored = h.store.record("t1").unwrap();
    assert_eq!(stored.primary_results["partition"], "2025-09-05");
    assert_eq!(stored.primary_results["job"], "t1");
}

#[tokio::test]
async fn primary_failure_fails_job_and_skips_secondary() {
    let marker = "secondary-ran";
    let h = setup_with("echo loading; echo 'ValueError: bad partition' >&2; exit 1", |config| {
        config.secondary = Some(shell_stage("score", &format!("touch {marker}"), 10));
    });

    let job = h.run("t1").await;

    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.kind, ErrorKind::ExecutionError);
    assert!(error.message.contains("exit code 1"));
    assert_eq!(error.stderr_excerpt, "ValueError: bad partition");
    assert_eq!(error.stdout_excerpt, "loading");
    assert_eq!(job.secondary_stage_status, Some(SecondaryStageStatus::NotRun));
    assert!(!h.root().join(marker).exists());
    assert!(h.store.is_empty());
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn secondary_failure_keeps_job_completed() {
    let h = setup_with(WRITE_ALL, |config| {
        config.secondary = Some(shell_stage("score", "echo 'scoring crashed' >&2; exit 2", 10));
    });

    let job = h.run("t1").await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.secondary_stage_status, Some(SecondaryStageStatus::Failed));
    let secondary_error = job.secondary_error.unwrap();
    assert_eq!(secondary_error.stderr_excerpt, "scoring crashed");
    assert!(job.error.is_none());
    assert!(h.store.record("t1").unwrap().secondary_results.is_none());
}

#[tokio::test]
async fn secondary_success_is_recorded_and_persisted() {
    let h = setup_with(WRITE_ALL, |config| {
        config.secondary = Some(shell_stage("score", "echo '[0.2, 0.8]' > out/scores.json", 10));
    });

    let job = h.run("t1").await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.secondary_stage_status, Some(SecondaryStageStatus::Succeeded));
    assert!(job.secondary_error.is_none());
    let stored = h.store.record("t1").unwrap();
    assert_eq!(stored.secondary_results, Some(serde_json::json!([0.2, 0.8])));
}

#[tokio::test]
async fn timeout_fails_job_and_frees_gate() {
    let h = setup_with("echo warming up; sleep 30", |config| {
        config.primary.timeout_secs = 1;
    });

    let job = h.run("t1").await;

    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Timeout);
    assert!(error.message.contains("timed out after 1 seconds"));
    assert_eq!(error.stdout_excerpt, "warming up");
    let elapsed = job.execution_time_seconds.unwrap();
    assert!((1.0..2.5).contains(&elapsed), "execution time {elapsed} not close to the timeout");
    assert!(!h.orchestrator.is_busy());
    assert!(h.trigger("t2").is_ok());
    h.orchestrator.wait_idle().await;
}

#[tokio::test]
async fn partial_artifacts_complete_with_warning() {
    let h = setup("mkdir -p out && echo '{}' > out/result.json");

    let job = h.run("t1").await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_files_count().as_deref(), Some("1/2"));
    assert_eq!(job.model_saved, Some(false));
    assert_eq!(job.missing_artifacts(), vec!["out/model.pkl"]);
    assert_eq!(job.warnings.len(), 1);
    assert_eq!(job.warnings[0].kind, WarningKind::MissingArtifacts);
    assert!(job.warnings[0].message.contains("out/model.pkl"));
}

#[tokio::test]
async fn generated_id_names_pipeline_and_stage() {
    let h = setup(WRITE_ALL);

    let accepted = h.orchestrator.trigger(TriggerRequest::default()).unwrap();
    h.orchestrator.wait_idle().await;

    assert!(accepted.job_id.starts_with("retention_train_19700101T"), "{}", accepted.job_id);
    assert_eq!(h.orchestrator.status(&accepted.job_id).unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn progress_is_visible_while_running() {
    let h = setup("sleep 1; mkdir -p out && echo '{}' > out/result.json");

    h.trigger("t1").unwrap();
    let running = h.wait_for("t1", |job| job.status == JobStatus::Running).await;

    assert_eq!(running.progress.as_deref(), Some("Executing primary stage"));
    assert!(running.started_at_ms.is_some());
    assert!(running.completed_at_ms.is_none());
    h.orchestrator.wait_idle().await;
}

#[tokio::test]
async fn stdout_excerpt_kept_on_success() {
    let h = setup(&format!("echo 'Training complete. AUC=0.91'; {WRITE_ALL}"));

    let job = h.run("t1").await;

    assert_eq!(job.stdout_excerpt.as_deref(), Some("Training complete. AUC=0.91"));
}

#[tokio::test]
async fn abort_running_fails_job_and_kills_stage_workers() {
    let h = setup("sleep 30 & echo $! > worker.pid; wait");
    h.trigger("t1").unwrap();
    h.wait_for("t1", |job| job.status == JobStatus::Running).await;
    let pid_file = h.root().join("worker.pid");
    for _ in 0..200 {
        if std::fs::read_to_string(&pid_file).is_ok_and(|s| s.ends_with('\n')) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    let worker: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();

    h.orchestrator.abort_running().await;

    let job = h.orchestrator.status("t1").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.unwrap().kind, ErrorKind::InternalError);
    assert!(!h.orchestrator.is_busy());

    let gone = |pid: i32| match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat.rsplit_once(')').is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    };
    for _ in 0..200 {
        if gone(worker) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(gone(worker), "worker {worker} outlived the aborted job");
}

#[tokio::test]
async fn execution_that_leaves_job_unfinished_is_failed() {
    let h = setup(WRITE_ALL);
    h.orchestrator.registry().create(pj_core::test_support::running_job("stuck")).unwrap();

    h.orchestrator.inner.settle(&JobId::from("stuck"), Ok(()));

    let job = h.orchestrator.status("stuck").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.kind, ErrorKind::InternalError);
    assert!(error.message.contains("without recording a result"));
}

#[tokio::test]
async fn settle_leaves_terminal_jobs_alone() {
    let h = setup(WRITE_ALL);
    let job = h.run("t1").await;

    h.orchestrator.inner.settle(&job.id, Ok(()));

    assert_eq!(h.orchestrator.status("t1").unwrap(), job);
}
