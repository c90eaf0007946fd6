// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const FULL_CONFIG: &str = r#"
name = "retention"
artifact_root = "/app"

[primary]
name = "train"
program = "python"
args = ["main.py"]

[secondary]
name = "score"
program = "python"
args = ["score.py"]
timeout_secs = 600
env = { MODE = "batch" }

[artifacts]
expected = ["output/model/model.pkl", "output/termination_result.json"]
model = "output/model/model.pkl"

[params]
env_prefix = "RET_"
env = { gcs_bucket = "GCS_BUCKET_PATH" }

[persistence]
results_dir = "results"
primary_results = "output/termination_result.json"

[capture]
limit_bytes = 1024
"#;

#[test]
fn parses_full_config() {
    let config = PipelineConfig::from_toml(FULL_CONFIG).unwrap();

    assert_eq!(config.name, "retention");
    assert_eq!(config.primary.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(config.primary.timeout(), Duration::from_secs(1800));
    let secondary = config.secondary.as_ref().unwrap();
    assert_eq!(secondary.timeout_secs, 600);
    assert_eq!(secondary.env.get("MODE").map(String::as_str), Some("batch"));
    assert_eq!(config.artifacts.expected.len(), 2);
    assert_eq!(config.capture.limit_bytes, 1024);
    assert_eq!(config.capture.excerpt_chars, 500);
    assert_eq!(config.persistence.secondary_results, None);
}

#[test]
fn minimal_config_uses_defaults() {
    let config = PipelineConfig::from_toml(
        r#"
name = "p"
[primary]
name = "run"
program = "true"
"#,
    )
    .unwrap();

    assert!(config.secondary.is_none());
    assert!(config.artifacts.expected.is_empty());
    assert_eq!(config.params.env_prefix, "PIPELINE_");
    assert_eq!(config.capture, CaptureConfig::default());
    assert_eq!(config.stage_cwd(&config.primary), PathBuf::from("."));
}

#[yare::parameterized(
    empty_program  = { "name = \"p\"\n[primary]\nname = \"run\"\nprogram = \"\"\n" },
    zero_timeout   = { "name = \"p\"\n[primary]\nname = \"run\"\nprogram = \"x\"\ntimeout_secs = 0\n" },
    duplicate_name = { "name = \"p\"\n[primary]\nname = \"run\"\nprogram = \"x\"\n[secondary]\nname = \"run\"\nprogram = \"y\"\n" },
    stray_model    = { "name = \"p\"\n[primary]\nname = \"run\"\nprogram = \"x\"\n[artifacts]\nmodel = \"m.pkl\"\n" },
    empty_name     = { "name = \"\"\n[primary]\nname = \"run\"\nprogram = \"x\"\n" },
)]
fn rejects_invalid_config(content: &str) {
    let err = PipelineConfig::from_toml(content).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
}

#[test]
fn rejects_unknown_keys() {
    let err = PipelineConfig::from_toml(
        "name = \"p\"\n[primary]\nname = \"run\"\nprogram = \"x\"\nretries = 3\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn params_map_to_env_names() {
    let config = PipelineConfig::from_toml(FULL_CONFIG).unwrap();
    let mut params = InputParams::new();
    params.insert("gcs_bucket".to_string(), "gs://bucket".to_string());
    params.insert("date-partition".to_string(), "2025-09-05".to_string());

    let env = config.params.env_for(&params);

    assert_eq!(env.get("GCS_BUCKET_PATH").map(String::as_str), Some("gs://bucket"));
    assert_eq!(env.get("RET_DATE_PARTITION").map(String::as_str), Some("2025-09-05"));
    assert_eq!(env.len(), 2);
}

#[test]
fn load_resolves_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.toml");
    std::fs::write(
        &path,
        r#"
name = "p"
artifact_root = "work"
[primary]
name = "run"
program = "true"
cwd = "/abs"
[persistence]
results_dir = "results"
"#,
    )
    .unwrap();

    let config = PipelineConfig::load(&path).unwrap();

    assert_eq!(config.artifact_root, dir.path().join("work"));
    assert_eq!(config.primary.cwd.as_deref(), Some(Path::new("/abs")));
    assert_eq!(config.persistence.results_dir, Some(dir.path().join("results")));
}

#[test]
fn load_reports_missing_file() {
    let err = PipelineConfig::load(Path::new("/nonexistent/pipeline.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/pipeline.toml"));
}
