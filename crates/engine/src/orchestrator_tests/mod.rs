// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod admission;
mod deletion;
mod lifecycle;
mod persistence;

use super::*;
use crate::config::StageConfig;
use crate::persist::{MemoryResultStore, ResultRecord, ResultStore, StoreError, StoredRecord, Upserted};
use pj_core::{FakeClock, SecondaryStageStatus};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Writes every expected artifact plus the results payload.
const WRITE_ALL: &str =
    "mkdir -p out && echo model > out/model.pkl && echo '{\"churned\": 2}' > out/result.json";

struct Harness {
    orchestrator: Orchestrator<FakeClock>,
    store: Arc<MemoryResultStore>,
    dir: TempDir,
}

impl Harness {
    fn trigger(&self, id: &str) -> Result<TriggerAccepted, OrchestratorError> {
        self.orchestrator.trigger(TriggerRequest {
            job_id: Some(id.to_string()),
            input_params: InputParams::new(),
        })
    }

    /// Trigger `id` and wait for it to reach a terminal state.
    async fn run(&self, id: &str) -> Job {
        self.trigger(id).unwrap();
        self.orchestrator.wait_idle().await;
        self.orchestrator.status(id).unwrap()
    }

    async fn wait_for(&self, id: &str, pred: impl Fn(&Job) -> bool) -> Job {
        for _ in 0..400 {
            let job = self.orchestrator.status(id).unwrap();
            if pred(&job) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {id} never reached the expected state");
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }
}

fn shell_stage(name: &str, script: &str, timeout_secs: u64) -> StageConfig {
    StageConfig {
        args: vec!["-c".to_string(), script.to_string()],
        timeout_secs,
        ..StageConfig::new(name, "sh")
    }
}

fn base_config(root: &Path, primary_script: &str) -> PipelineConfig {
    let mut config = PipelineConfig::new("retention", shell_stage("train", primary_script, 10));
    config.artifact_root = root.to_path_buf();
    config.artifacts.expected = vec!["out/model.pkl".to_string(), "out/result.json".to_string()];
    config.artifacts.model = Some("out/model.pkl".to_string());
    config.persistence.primary_results = Some("out/result.json".to_string());
    config.persistence.secondary_results = Some("out/scores.json".to_string());
    config
}

fn setup(primary_script: &str) -> Harness {
    setup_with(primary_script, |_| {})
}

fn setup_with(primary_script: &str, adjust: impl FnOnce(&mut PipelineConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path(), primary_script);
    adjust(&mut config);
    let store = Arc::new(MemoryResultStore::new());
    let persister = ResultPersister::new(store.clone(), &config);
    let orchestrator = Orchestrator::with_clock(config, persister, FakeClock::new());
    Harness { orchestrator, store, dir }
}

/// A store whose upsert panics, to exercise crash recovery.
struct PanickingStore;

#[async_trait::async_trait]
impl ResultStore for PanickingStore {
    async fn upsert(&self, _record: ResultRecord) -> Result<Upserted, StoreError> {
        panic!("result store exploded");
    }

    async fn get(&self, _job_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(None)
    }
}
