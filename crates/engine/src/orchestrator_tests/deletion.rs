// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delete, list, and health

use super::*;

#[tokio::test]
async fn running_job_cannot_be_deleted() {
    let h = setup("sleep 2; mkdir -p out && echo '{}' > out/result.json");
    h.trigger("t1").unwrap();
    h.wait_for("t1", |job| job.status == JobStatus::Running).await;

    let err = h.orchestrator.delete("t1").unwrap_err();

    assert_eq!(
        err,
        OrchestratorError::InvalidState { id: JobId::from("t1"), status: JobStatus::Running }
    );
    assert!(h.orchestrator.status("t1").is_ok());
    h.orchestrator.wait_idle().await;
}

#[tokio::test]
async fn terminal_job_is_removed_but_results_remain() {
    let h = setup(WRITE_ALL);
    h.run("t1").await;

    let removed = h.orchestrator.delete("t1").unwrap();

    assert_eq!(removed.status, JobStatus::Completed);
    assert_eq!(h.orchestrator.status("t1").unwrap_err(), OrchestratorError::NotFound("t1".into()));
    assert!(h.orchestrator.list(None).iter().all(|job| job.id != "t1"));
    assert!(h.store.record("t1").is_some());
}

#[tokio::test]
async fn deleted_id_can_be_reused() {
    let h = setup(WRITE_ALL);
    let first = h.run("t1").await;
    h.orchestrator.delete("t1").unwrap();

    let second = h.run("t1").await;

    assert_eq!(second.status, JobStatus::Completed);
    // Same payload, same job id: the stored record is reused
    assert_eq!(second.record_id, first.record_id);
    assert_eq!(h.store.len(), 1);
}

#[test]
fn unknown_job_is_not_found() {
    let h = setup(WRITE_ALL);
    assert!(matches!(h.orchestrator.status("ghost"), Err(OrchestratorError::NotFound(_))));
    assert!(matches!(h.orchestrator.delete("ghost"), Err(OrchestratorError::NotFound(_))));
}

#[tokio::test]
async fn list_and_health_reflect_registry() {
    let h = setup_with("test -e fail-now && exit 1; mkdir -p out && echo '{}' > out/result.json", |_| {});
    h.run("ok").await;
    std::fs::write(h.root().join("fail-now"), b"").unwrap();
    h.run("bad").await;

    let all: Vec<String> = h.orchestrator.list(None).iter().map(|j| j.id.to_string()).collect();
    assert_eq!(all, vec!["bad", "ok"]);
    let failed = h.orchestrator.list(Some(JobStatus::Failed));
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, "bad");

    let health = h.orchestrator.health();
    assert!(!health.busy);
    assert_eq!(health.running_job, None);
    assert_eq!(health.counts.completed, 1);
    assert_eq!(health.counts.failed, 1);
}
