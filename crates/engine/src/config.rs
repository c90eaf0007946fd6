// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline configuration
//!
//! Loaded from TOML. Describes the stage commands, the expected artifact set,
//! how input params reach the process environment, and where results are
//! persisted.
//!
//! ```toml
//! name = "retention"
//! artifact_root = "/app"
//!
//! [primary]
//! name = "train"
//! program = "python"
//! args = ["main.py"]
//! timeout_secs = 1800
//!
//! [artifacts]
//! expected = ["output/model/model.pkl", "output/termination_result.json"]
//! model = "output/model/model.pkl"
//!
//! [params.env]
//! gcs_bucket = "GCS_BUCKET_PATH"
//!
//! [persistence]
//! results_dir = "results"
//! primary_results = "output/termination_result.json"
//! ```

use pj_core::InputParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default stage deadline: 30 minutes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pipeline name, used in generated job ids and on job records
    pub name: String,
    /// Directory that expected artifact paths are relative to
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
    pub primary: StageConfig,
    #[serde(default)]
    pub secondary: Option<StageConfig>,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub params: ParamsConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// One external command in the stage chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory; defaults to the artifact root
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl StageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactsConfig {
    /// Paths, relative to the artifact root, the primary stage must produce
    #[serde(default)]
    pub expected: Vec<String>,
    /// The model artifact reported as `model_saved`
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsConfig {
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
    /// Explicit param key -> environment variable name
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self { env_prefix: default_env_prefix(), env: BTreeMap::new() }
    }
}

impl ParamsConfig {
    /// Environment variables exported for a job's input params.
    pub fn env_for(&self, params: &InputParams) -> BTreeMap<String, String> {
        params
            .iter()
            .map(|(key, value)| (self.env_name(key), value.clone()))
            .collect()
    }

    fn env_name(&self, key: &str) -> String {
        if let Some(name) = self.env.get(key) {
            return name.clone();
        }
        let upper: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}{}", self.env_prefix, upper)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistenceConfig {
    /// Directory of the file-backed result store; persistence is off when unset
    #[serde(default)]
    pub results_dir: Option<PathBuf>,
    /// JSON artifact holding the primary results payload
    #[serde(default)]
    pub primary_results: Option<String>,
    /// JSON artifact holding the secondary results payload
    #[serde(default)]
    pub secondary_results: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    /// Bytes of stdout and stderr retained per stage
    #[serde(default = "default_limit_bytes")]
    pub limit_bytes: usize,
    /// Characters kept in recorded excerpts
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { limit_bytes: default_limit_bytes(), excerpt_chars: default_excerpt_chars() }
    }
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_env_prefix() -> String {
    "PIPELINE_".to_string()
}

fn default_limit_bytes() -> usize {
    64 * 1024
}

fn default_excerpt_chars() -> usize {
    500
}

impl PipelineConfig {
    /// Build a config with a single primary stage and defaults elsewhere.
    pub fn new(name: impl Into<String>, primary: StageConfig) -> Self {
        Self {
            name: name.into(),
            artifact_root: default_artifact_root(),
            primary,
            secondary: None,
            artifacts: ArtifactsConfig::default(),
            params: ParamsConfig::default(),
            persistence: PersistenceConfig::default(),
            capture: CaptureConfig::default(),
        }
    }

    /// Parse and validate TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Relative paths inside it resolve against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("pipeline name must not be empty".into()));
        }
        self.primary.validate()?;
        if let Some(secondary) = &self.secondary {
            secondary.validate()?;
            if secondary.name == self.primary.name {
                return Err(ConfigError::Invalid(format!(
                    "stage name `{}` is used twice",
                    secondary.name
                )));
            }
        }
        if self.capture.limit_bytes == 0 {
            return Err(ConfigError::Invalid("capture.limit_bytes must be positive".into()));
        }
        if let Some(model) = &self.artifacts.model {
            if !self.artifacts.expected.contains(model) {
                return Err(ConfigError::Invalid(format!(
                    "model artifact `{model}` is not in artifacts.expected"
                )));
            }
        }
        Ok(())
    }

    /// Working directory for a stage.
    pub fn stage_cwd(&self, stage: &StageConfig) -> PathBuf {
        stage.cwd.clone().unwrap_or_else(|| self.artifact_root.clone())
    }

    fn resolve_relative(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.artifact_root);
        if let Some(cwd) = self.primary.cwd.as_mut() {
            resolve(cwd);
        }
        if let Some(cwd) = self.secondary.as_mut().and_then(|s| s.cwd.as_mut()) {
            resolve(cwd);
        }
        if let Some(dir) = self.persistence.results_dir.as_mut() {
            resolve(dir);
        }
    }
}

impl StageConfig {
    /// A stage with default timeout and no extra arguments.
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("stage name must not be empty".into()));
        }
        if self.program.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "stage `{}`: program must not be empty",
                self.name
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(format!(
                "stage `{}`: timeout_secs must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
