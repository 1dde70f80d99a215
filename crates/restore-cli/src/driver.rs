//! Runs the restore workflow against in-memory collaborators.

use std::sync::Arc;

use restore_core::memory::{
    InMemoryRestoreStore, InMemoryUniverseRegistry, ScriptedExecutor, StaticVersionOracle,
};
use restore_core::{
    DefaultRestoreSubtaskFactory, OrchestratorConfig, Plan, PlanBuilder, Restore, RestoreBackup,
    RestoreBackupParams, RestoreError, RestoreKeyspace, RestoreStore, SubtaskDescriptor, TaskId,
    UniverseSnapshot, UniverseTaskContext, VersionOracle,
};
use serde::Serialize;

/// Universe the request is run against
#[derive(Debug, Clone, Default)]
pub struct UniverseSetup {
    /// Deployed controller agent version; `None` when the agent is absent
    pub controller_version: Option<String>,
}

impl UniverseSetup {
    fn snapshot(&self, request: &RestoreBackupParams) -> UniverseSnapshot {
        let universe = UniverseSnapshot::new(request.universe_id, "harness-universe");
        match &self.controller_version {
            Some(version) => universe.with_controller(version.clone()),
            None => universe,
        }
    }
}

/// Faults injected into the run
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Fail the restore subtask at this index
    pub fail_at: Option<usize>,
    /// Cancel while the restore subtask at this index runs
    pub cancel_at: Option<usize>,
    /// Fail the load balancer post-step
    pub fail_post_step: bool,
}

impl Faults {
    fn executor(self) -> ScriptedExecutor {
        let mut executor = ScriptedExecutor::new();
        if let Some(index) = self.fail_at {
            executor = executor.fail_restore_at(index);
        }
        if let Some(index) = self.cancel_at {
            executor = executor.cancel_restore_at(index);
        }
        if self.fail_post_step {
            executor = executor.fail_load_balancer();
        }
        executor
    }
}

/// What a run left behind
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Workflow handle
    pub task_id: TaskId,
    /// Error returned by the workflow, if any
    pub error: Option<String>,
    /// Restore record, absent when the workflow failed before planning
    pub restore: Option<Restore>,
    /// Keyspace rows of the restore
    pub keyspaces: Vec<RestoreKeyspace>,
    /// Subtasks executed, in order
    pub executed: Vec<SubtaskDescriptor>,
    /// Whether the universe is still locked
    pub universe_locked: bool,
}

/// Build the plan the workflow would submit
///
/// # Errors
/// Invalid request or a plan that cannot be built.
pub fn plan(
    request: &RestoreBackupParams,
    config: &OrchestratorConfig,
    universe: &UniverseSetup,
) -> Result<Plan, RestoreError> {
    request.validate()?;
    let oracle = StaticVersionOracle::from(&config.controller);
    let plan = PlanBuilder::new(Arc::new(DefaultRestoreSubtaskFactory)).build(
        request,
        &universe.snapshot(request),
        || oracle.stable_controller_version(),
    )?;
    Ok(plan)
}

/// Run the full workflow and report the resulting state
///
/// The workflow's own error is captured in the report, and returned.
pub async fn run(
    request: RestoreBackupParams,
    config: OrchestratorConfig,
    universe: &UniverseSetup,
    faults: Faults,
) -> (RunReport, Result<(), RestoreError>) {
    let registry = Arc::new(InMemoryUniverseRegistry::new());
    registry.insert(universe.snapshot(&request));
    let store = Arc::new(InMemoryRestoreStore::new());
    let runner = Arc::new(faults.executor().into_runner());
    let ctx = UniverseTaskContext::new(
        registry.clone(),
        Arc::new(StaticVersionOracle::from(&config.controller)),
        runner.clone(),
        store.clone(),
    );

    let universe_id = request.universe_id;
    let task = RestoreBackup::new(TaskId::new(), request, ctx, config);
    let result = task.run().await;

    let restore = store.find_by_task(task.task_id()).ok().flatten();
    let keyspaces = restore
        .as_ref()
        .and_then(|r| store.keyspaces(r.id).ok())
        .unwrap_or_default();
    let report = RunReport {
        task_id: task.task_id(),
        error: result.as_ref().err().map(ToString::to_string),
        restore,
        keyspaces,
        executed: runner.history().into_iter().map(|r| r.subtask).collect(),
        universe_locked: registry.is_locked(universe_id),
    };
    (report, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use restore_core::{BackupStorageInfo, CustomerId, StorageConfigId, UniverseId};

    fn request() -> RestoreBackupParams {
        RestoreBackupParams::new(CustomerId::new(), UniverseId::new(), StorageConfigId::new())
            .with_backup(BackupStorageInfo::new("s3://b/orders", "orders"))
    }

    #[test]
    fn plan_upgrades_outdated_agent() {
        let universe = UniverseSetup {
            controller_version: Some("0.9".to_string()),
        };
        let plan = plan(&request(), &OrchestratorConfig::default(), &universe).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.subtasks()[0].name(), "UpgradeAgent");
    }

    #[tokio::test]
    async fn failed_run_reports_error_and_state() {
        let faults = Faults {
            fail_at: Some(0),
            ..Faults::default()
        };
        let (report, result) = run(
            request(),
            OrchestratorConfig::default(),
            &UniverseSetup::default(),
            faults,
        )
        .await;

        assert!(result.is_err());
        assert!(report.error.is_some());
        assert_eq!(
            report.restore.map(|r| r.state),
            Some(restore_core::RestoreState::Failure)
        );
        assert!(!report.universe_locked);
    }
}
