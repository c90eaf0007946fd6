// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence outcomes and crash recovery

use super::*;

#[tokio::test]
async fn store_failure_completes_with_warning() {
    let h = setup(WRITE_ALL);
    h.store.fail_with("database unreachable");

    let job = h.run("t1").await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.record_id.is_none());
    assert_eq!(job.warnings.len(), 1);
    assert_eq!(job.warnings[0].kind, WarningKind::PersistenceWarning);
    assert!(job.warnings[0].message.contains("database unreachable"));
    assert_eq!(h.store.upsert_calls(), 1);
}

#[tokio::test]
async fn missing_results_payload_completes_with_warning() {
    let h = setup("mkdir -p out && echo model > out/model.pkl");

    let job = h.run("t1").await;

    assert_eq!(job.status, JobStatus::Completed);
    let kinds: Vec<WarningKind> = job.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(kinds, vec![WarningKind::MissingArtifacts, WarningKind::PersistenceWarning]);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn disabled_persistence_completes_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = base_config(dir.path(), WRITE_ALL);
    let orchestrator =
        Orchestrator::with_clock(config, ResultPersister::disabled(), FakeClock::new());

    orchestrator.trigger(TriggerRequest { job_id: Some("t1".into()), ..Default::default() }).unwrap();
    orchestrator.wait_idle().await;

    let job = orchestrator.status("t1").unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.warnings.is_empty());
    assert!(job.record_id.is_none());
}

#[tokio::test]
async fn panic_during_execution_fails_job_and_frees_gate() {
    let dir = tempfile::tempdir().unwrap();
    let config = base_config(dir.path(), WRITE_ALL);
    let persister = ResultPersister::new(Arc::new(PanickingStore), &config);
    let orchestrator = Orchestrator::with_clock(config, persister, FakeClock::new());

    orchestrator.trigger(TriggerRequest { job_id: Some("t1".into()), ..Default::default() }).unwrap();
    orchestrator.wait_idle().await;

    let job = orchestrator.status("t1").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.kind, ErrorKind::InternalError);
    assert!(error.message.contains("result store exploded"));
    assert!(!orchestrator.is_busy());
    assert!(orchestrator
        .trigger(TriggerRequest { job_id: Some("t2".into()), ..Default::default() })
        .is_ok());
    orchestrator.wait_idle().await;
}
