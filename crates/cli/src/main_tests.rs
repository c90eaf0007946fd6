// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::exit_error::{EXIT_BUSY, EXIT_NOT_RUNNING};
use clap::CommandFactory;
use pj_wire::ErrorCode;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn trigger_parses_id_and_params() {
    let cli = Cli::try_parse_from([
        "pj", "trigger", "--id", "t1", "-p", "partition=2025-09-05", "--param", "bucket=gs://x",
    ])
    .unwrap();
    let Commands::Trigger(args) = cli.command else { panic!("expected trigger") };
    assert_eq!(args.id.as_deref(), Some("t1"));
    assert_eq!(args.params.len(), 2);
    assert!(!args.wait);
}

#[test]
fn trigger_rejects_param_without_equals() {
    assert!(Cli::try_parse_from(["pj", "trigger", "-p", "partition"]).is_err());
}

#[test]
fn list_status_filter_parses() {
    let cli = Cli::try_parse_from(["pj", "list", "--status", "failed", "-o", "json"]).unwrap();
    assert_eq!(cli.output, OutputFormat::Json);
    let Commands::List { status } = cli.command else { panic!("expected list") };
    assert_eq!(status, Some(JobStatus::Failed));

    assert!(Cli::try_parse_from(["pj", "list", "--status", "cancelled"]).is_err());
}

#[test]
fn exit_codes_follow_error_type() {
    let not_running: anyhow::Error = ClientError::NotRunning("/tmp/x.sock".into()).into();
    assert_eq!(exit_code(&not_running), EXIT_NOT_RUNNING as u8);

    let busy: anyhow::Error =
        ClientError::Rejected { kind: ErrorCode::Conflict, message: "busy".into() }.into();
    assert_eq!(exit_code(&busy), EXIT_BUSY as u8);

    let failed: anyhow::Error = ExitError::new(7, "job failed").into();
    assert_eq!(exit_code(&failed), 7);

    assert_eq!(exit_code(&anyhow::anyhow!("other")), EXIT_FAILURE as u8);
}
