// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub(super) use super::{startup, Config, LifecycleError};
pub(super) use std::path::Path;
pub(super) use std::time::Duration;
pub(super) use tempfile::tempdir;

/// A pipeline whose primary stage runs `script` under `sh -c`.
pub(super) fn pipeline_toml(script: &str) -> String {
    format!(
        r#"name = "retention"

[primary]
name = "train"
program = "sh"
args = ["-c", {script:?}]
timeout_secs = 10
"#
    )
}

/// Daemon paths under `dir`, with a pipeline config that runs `script`.
pub(super) fn test_config_with(dir: &Path, script: &str) -> Config {
    let pipeline_path = dir.join("pipeline.toml");
    std::fs::write(&pipeline_path, pipeline_toml(script)).unwrap();
    Config::with_state_dir(dir.join("state"), pipeline_path)
}

pub(super) fn test_config(dir: &Path) -> Config {
    test_config_with(dir, "true")
}
