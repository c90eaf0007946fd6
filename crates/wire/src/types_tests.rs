// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pj_core::test_support::{completed_job, failed_job};
use pj_core::OutputManifest;

#[test]
fn summary_of_failed_job_carries_error_kind() {
    let summary = JobSummary::from(&failed_job("t1"));
    assert_eq!(summary.id, "t1");
    assert_eq!(summary.status, JobStatus::Failed);
    assert_eq!(summary.error_kind, Some(ErrorKind::ExecutionError));
    assert_eq!(summary.output_files_count, None);
}

#[test]
fn detail_derives_artifact_fields() {
    let mut job = completed_job("t1");
    let mut manifest = OutputManifest::new();
    manifest.insert("out/model.pkl".to_string(), true);
    manifest.insert("out/result.json".to_string(), false);
    job.output_manifest = manifest;

    let detail = JobDetail::from(job);

    assert_eq!(detail.output_files_count.as_deref(), Some("1/2"));
    assert_eq!(detail.missing_artifacts, vec!["out/result.json"]);
}

#[test]
fn summary_defaults_when_fields_absent() {
    let json = r#"{"id":"t1","name":"retention","status":"queued","created_at_ms":5}"#;
    let summary: JobSummary = serde_json::from_str(json).unwrap();
    assert_eq!(summary.warnings, 0);
    assert!(summary.progress.is_none());
}
