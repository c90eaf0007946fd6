// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage chain: primary stage, artifact validation, optional secondary stage.
//!
//! The secondary stage runs only after a successful primary. Its outcome is
//! reported separately and never changes the primary result.

use crate::artifacts::{model_saved, validate_artifacts};
use crate::capture::excerpt;
use crate::config::{PipelineConfig, StageConfig};
use crate::supervisor::{PipelineCommand, ProcessSupervisor, RunOutcome};
use pj_core::{ErrorKind, JobError, OutputManifest, SecondaryStageStatus};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Summary of a stage that exited zero.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: String,
    pub elapsed: Duration,
    pub stdout_excerpt: String,
    pub stderr_excerpt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryReport {
    pub report: StageReport,
    pub manifest: OutputManifest,
    pub model_saved: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SecondaryOutcome {
    NotConfigured,
    /// Configured but skipped because the primary stage failed
    NotRun,
    Succeeded(StageReport),
    Failed(JobError),
}

impl SecondaryOutcome {
    /// Status for the job record; `None` when no secondary is configured.
    pub fn status(&self) -> Option<SecondaryStageStatus> {
        match self {
            SecondaryOutcome::NotConfigured => None,
            SecondaryOutcome::NotRun => Some(SecondaryStageStatus::NotRun),
            SecondaryOutcome::Succeeded(_) => Some(SecondaryStageStatus::Succeeded),
            SecondaryOutcome::Failed(_) => Some(SecondaryStageStatus::Failed),
        }
    }

    pub fn error(&self) -> Option<&JobError> {
        match self {
            SecondaryOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub primary: Result<PrimaryReport, JobError>,
    /// Wall-clock time of the primary stage alone
    pub primary_elapsed: Duration,
    pub secondary: SecondaryOutcome,
}

pub struct StageChain<'a> {
    config: &'a PipelineConfig,
    supervisor: &'a ProcessSupervisor,
}

impl<'a> StageChain<'a> {
    pub fn new(config: &'a PipelineConfig, supervisor: &'a ProcessSupervisor) -> Self {
        Self { config, supervisor }
    }

    /// Run the chain, reporting each phase through `progress`.
    pub async fn run(
        &self,
        env: &BTreeMap<String, String>,
        progress: &(dyn Fn(&str) + Send + Sync),
    ) -> ChainOutcome {
        progress("Executing primary stage");
        let (primary, primary_elapsed) = self.run_stage(&self.config.primary, env).await;
        let report = match primary {
            Ok(report) => report,
            Err(error) => {
                let secondary = match self.config.secondary {
                    Some(_) => SecondaryOutcome::NotRun,
                    None => SecondaryOutcome::NotConfigured,
                };
                return ChainOutcome { primary: Err(error), primary_elapsed, secondary };
            }
        };

        progress("Validating output artifacts");
        let manifest =
            validate_artifacts(&self.config.artifact_root, &self.config.artifacts.expected);
        let model_saved = model_saved(&manifest, self.config.artifacts.model.as_deref());

        let secondary = match &self.config.secondary {
            None => SecondaryOutcome::NotConfigured,
            Some(stage) => {
                progress("Running secondary stage");
                match self.run_stage(stage, env).await.0 {
                    Ok(report) => SecondaryOutcome::Succeeded(report),
                    Err(error) => {
                        tracing::warn!(
                            stage = %stage.name,
                            kind = %error.kind,
                            "secondary stage failed: {}",
                            error.message
                        );
                        SecondaryOutcome::Failed(error)
                    }
                }
            }
        };

        ChainOutcome {
            primary: Ok(PrimaryReport { report, manifest, model_saved }),
            primary_elapsed,
            secondary,
        }
    }

    async fn run_stage(
        &self,
        stage: &StageConfig,
        env: &BTreeMap<String, String>,
    ) -> (Result<StageReport, JobError>, Duration) {
        let command = PipelineCommand::for_stage(self.config, stage, env);
        let started = Instant::now();
        match self.supervisor.run(&command, stage.timeout()).await {
            Ok(outcome) => {
                let elapsed = outcome.elapsed;
                (self.judge(stage, outcome), elapsed)
            }
            Err(e) => (
                Err(JobError::new(
                    ErrorKind::ExecutionError,
                    format!("{} stage could not be started: {}", stage.name, e),
                )),
                started.elapsed(),
            ),
        }
    }

    fn judge(&self, stage: &StageConfig, outcome: RunOutcome) -> Result<StageReport, JobError> {
        let max = self.config.capture.excerpt_chars;
        let stdout_excerpt = excerpt(&outcome.stdout, max);
        let stderr_excerpt = excerpt(&outcome.stderr, max);
        if outcome.timed_out {
            return Err(JobError::new(
                ErrorKind::Timeout,
                format!("{} stage timed out after {} seconds", stage.name, stage.timeout_secs),
            )
            .with_excerpts(stdout_excerpt, stderr_excerpt));
        }
        if !outcome.success() {
            return Err(JobError::new(
                ErrorKind::ExecutionError,
                format!("{} stage failed with {}", stage.name, outcome.describe_exit()),
            )
            .with_excerpts(stdout_excerpt, stderr_excerpt));
        }
        Ok(StageReport {
            stage: stage.name.clone(),
            elapsed: outcome.elapsed,
            stdout_excerpt,
            stderr_excerpt,
        })
    }
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod tests;
