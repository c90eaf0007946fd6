// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight admission and id validation

use super::*;

const SLOW: &str = "sleep 2; mkdir -p out && echo '{}' > out/result.json";

#[tokio::test]
async fn second_trigger_while_running_conflicts() {
    let h = setup(SLOW);
    h.trigger("a").unwrap();

    let err = h.trigger("b").unwrap_err();

    assert_eq!(err, OrchestratorError::Conflict { running: Some(JobId::from("a")) });
    assert!(err.to_string().contains("(a)"));
    assert!(!h.orchestrator.registry().contains("b"));
    h.orchestrator.wait_idle().await;
}

#[tokio::test]
async fn gate_reopens_after_completion() {
    let h = setup(WRITE_ALL);
    assert_eq!(h.run("a").await.status, JobStatus::Completed);
    assert_eq!(h.run("b").await.status, JobStatus::Completed);
}

#[tokio::test]
async fn gate_reopens_after_failure() {
    let h = setup("exit 7");
    assert_eq!(h.run("a").await.status, JobStatus::Failed);
    assert!(!h.orchestrator.is_busy());
    assert_eq!(h.run("b").await.status, JobStatus::Failed);
}

#[tokio::test]
async fn duplicate_id_of_finished_job_is_rejected() {
    let h = setup(WRITE_ALL);
    h.run("a").await;

    let err = h.trigger("a").unwrap_err();

    assert_eq!(err, OrchestratorError::AlreadyExists(JobId::from("a")));
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn duplicate_id_wins_over_conflict() {
    let h = setup(SLOW);
    h.trigger("a").unwrap();

    let err = h.trigger("a").unwrap_err();

    assert_eq!(err, OrchestratorError::AlreadyExists(JobId::from("a")));
    h.orchestrator.wait_idle().await;
}

#[yare::parameterized(
    empty      = { "" },
    slash      = { "../etc/passwd" },
    space      = { "my job" },
    leading_dot = { ".hidden" },
)]
fn invalid_ids_are_rejected_synchronously(id: &str) {
    let h = setup(WRITE_ALL);

    let err = h.trigger(id).unwrap_err();

    assert!(matches!(err, OrchestratorError::InvalidJobId(_)), "{err:?}");
    assert!(!h.orchestrator.is_busy());
    assert!(h.orchestrator.registry().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_triggers_admit_exactly_one() {
    let h = setup(SLOW);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move {
                orchestrator.trigger(TriggerRequest {
                    job_id: Some(format!("job-{i}")),
                    input_params: InputParams::new(),
                })
            })
        })
        .collect();
    let mut accepted = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(OrchestratorError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(h.orchestrator.registry().len(), 1);
    h.orchestrator.wait_idle().await;
}
