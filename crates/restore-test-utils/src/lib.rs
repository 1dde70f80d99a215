//! Testing utilities for the restore orchestrator workspace
//!
//! Shared fixtures and a harness wiring the in-memory collaborators together.

#![allow(missing_docs)]

use std::sync::Arc;

use restore_core::memory::{
    InMemoryRestoreStore, InMemoryUniverseRegistry, SequentialRunner, StaticVersionOracle,
};
use restore_core::{
    BackupStorageInfo, CustomerId, OrchestratorConfig, Restore, RestoreBackup,
    RestoreBackupParams, RestoreKeyspace, RestoreStore, StorageConfigId, SubtaskKind, TaskId,
    UniverseId, UniverseSnapshot, UniverseTaskContext,
};

pub use restore_core::memory::ScriptedExecutor;

pub const STABLE_AGENT_VERSION: &str = "1.3";

pub fn universe() -> UniverseSnapshot {
    UniverseSnapshot::new(UniverseId::new(), "test-universe")
}

pub fn universe_with_agent(version: &str) -> UniverseSnapshot {
    universe().with_controller(version)
}

pub fn request_for(universe_id: UniverseId, keyspaces: &[&str]) -> RestoreBackupParams {
    keyspaces.iter().fold(
        RestoreBackupParams::new(CustomerId::new(), universe_id, StorageConfigId::new()),
        |req, ks| req.with_backup(BackupStorageInfo::new(format!("s3://backups/{ks}"), *ks)),
    )
}

/// In-memory collaborators wired for one universe
#[derive(Debug)]
pub struct Harness {
    pub universe: UniverseSnapshot,
    pub registry: Arc<InMemoryUniverseRegistry>,
    pub store: Arc<InMemoryRestoreStore>,
    pub runner: Arc<SequentialRunner>,
    pub config: OrchestratorConfig,
}

impl Harness {
    pub fn new(universe: UniverseSnapshot) -> Self {
        Self::with_executor(universe, ScriptedExecutor::new())
    }

    pub fn with_executor(universe: UniverseSnapshot, executor: ScriptedExecutor) -> Self {
        let registry = Arc::new(InMemoryUniverseRegistry::new());
        registry.insert(universe.clone());

        let runner = Arc::new(executor.into_runner());

        Self {
            universe,
            registry,
            store: Arc::new(InMemoryRestoreStore::new()),
            runner,
            config: OrchestratorConfig::new().with_stable_controller_version(STABLE_AGENT_VERSION),
        }
    }

    pub fn universe_id(&self) -> UniverseId {
        self.universe.universe_id
    }

    pub fn request(&self, keyspaces: &[&str]) -> RestoreBackupParams {
        request_for(self.universe_id(), keyspaces)
    }

    pub fn context(&self) -> UniverseTaskContext {
        UniverseTaskContext::new(
            self.registry.clone(),
            Arc::new(StaticVersionOracle::from(&self.config.controller)),
            self.runner.clone(),
            self.store.clone(),
        )
    }

    pub fn task(&self, params: RestoreBackupParams) -> RestoreBackup {
        RestoreBackup::new(TaskId::new(), params, self.context(), self.config.clone())
    }

    pub fn restore_of(&self, task: &RestoreBackup) -> Option<Restore> {
        self.store.find_by_task(task.task_id()).unwrap()
    }

    pub fn keyspaces_of(&self, task: &RestoreBackup) -> Vec<RestoreKeyspace> {
        self.restore_of(task)
            .map(|r| self.store.keyspaces(r.id).unwrap())
            .unwrap_or_default()
    }

    pub fn load_balancer_enables(&self) -> usize {
        self.runner
            .executed()
            .iter()
            .filter(|k| {
                matches!(
                    k,
                    SubtaskKind::LoadBalancerStateChange { enable: true, .. }
                )
            })
            .count()
    }
}
