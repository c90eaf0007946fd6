// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pj-engine: pipeline execution for the job orchestrator
//!
//! The [`Orchestrator`] accepts trigger requests, admits at most one job at a
//! time through the [`ConcurrencyGate`], runs the configured stage chain under
//! the [`ProcessSupervisor`], validates artifacts, persists results, and
//! records every outcome in the [`JobRegistry`].

pub mod artifacts;
mod capture;
pub mod chain;
pub mod config;
pub mod gate;
pub mod orchestrator;
pub mod persist;
pub mod registry;
pub mod supervisor;

pub use artifacts::{model_saved, validate_artifacts};
pub use capture::excerpt;
pub use chain::{ChainOutcome, PrimaryReport, SecondaryOutcome, StageChain, StageReport};
pub use config::{
    ArtifactsConfig, CaptureConfig, ConfigError, ParamsConfig, PersistenceConfig, PipelineConfig,
    StageConfig,
};
pub use gate::{ConcurrencyGate, GatePermit};
pub use orchestrator::{
    Health, Orchestrator, OrchestratorError, TriggerAccepted, TriggerRequest, JOB_ID_ENV,
};
#[cfg(any(test, feature = "test-support"))]
pub use persist::MemoryResultStore;
pub use persist::{
    FileResultStore, PersistResult, ResultPersister, ResultRecord, ResultStore, StoreError,
    StoredRecord, UpsertOutcome, Upserted,
};
pub use registry::{JobRegistry, RegistryError, StatusCounts};
pub use supervisor::{PipelineCommand, ProcessSupervisor, RunOutcome, SupervisorError};
