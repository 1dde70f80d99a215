//! Restore workflow supervisor
//!
//! [`RestoreBackup`] is the single entry point of a restore. It:
//! - locks the universe for the duration of the restore
//! - builds the restore plan and submits it to the subtask runner
//! - records the terminal state of the [`Restore`] record
//! - routes external cancellation to the abort branch
//! - re-enables the load balancer afterwards when asked to
//!
//! # Terminal branches
//!
//! | outcome | order of cleanup | lock release |
//! |---------|------------------|--------------|
//! | success | unlock, record `Success` | clear task details |
//! | cancel  | unlock, record `Aborted` with keyspace rows | preserve task details |
//! | failure | record `Failure`, unlock | clear task details |
//!
//! Once the universe is known to exist, the post-step runs on every exit:
//! version mismatch, lock conflict, plan or record failure included. Its
//! errors are logged and never replace the workflow's own error.

use crate::config::OrchestratorConfig;
use crate::context::UniverseTaskContext;
use crate::error::RestoreError;
use crate::lock::{UniverseLock, UniverseLocker};
use crate::plan::{Plan, PlanBuilder};
use crate::tracker::RestoreTracker;
use crate::types::{
    ExpectedVersion, Restore, RestoreBackupParams, RestoreState, SubTaskGroup, SubtaskDescriptor,
    SubtaskKind, TaskDetails, TaskId,
};

/// Restore task for one universe
#[derive(Debug)]
pub struct RestoreBackup {
    task_id: TaskId,
    params: RestoreBackupParams,
    ctx: UniverseTaskContext,
    config: OrchestratorConfig,
    locker: UniverseLocker,
    planner: PlanBuilder,
    tracker: RestoreTracker,
}

impl RestoreBackup {
    /// Create task
    #[must_use]
    pub fn new(
        task_id: TaskId,
        params: RestoreBackupParams,
        ctx: UniverseTaskContext,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            task_id,
            params,
            locker: UniverseLocker::new(ctx.registry.clone()),
            planner: PlanBuilder::new(ctx.subtasks.clone()),
            tracker: RestoreTracker::new(ctx.store.clone()),
            ctx,
            config,
        }
    }

    /// Workflow handle
    #[inline]
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Request being executed
    #[inline]
    #[must_use]
    pub fn params(&self) -> &RestoreBackupParams {
        &self.params
    }

    /// Display name used in logs
    #[must_use]
    pub fn name(&self) -> String {
        format!("RestoreBackup({})", self.params.universe_id)
    }

    /// Run the restore
    ///
    /// # Errors
    /// - `InvalidRequest` / `UniverseNotFound` before anything else happens
    /// - `VersionMismatch` / `LockConflict` with no restore record created
    /// - `Plan` / `Persistence` if the restore could not be started
    /// - `Cancelled` if the runner was cancelled
    /// - `SubtaskFailed` for the first failing subtask
    pub async fn run(&self) -> Result<(), RestoreError> {
        self.params.validate()?;
        self.ctx.registry.get_or_fail(self.params.universe_id)?;

        let result = self.run_workflow().await;

        if self.params.alter_load_balancer {
            self.reenable_load_balancer().await;
        }

        match &result {
            Ok(()) => tracing::info!(task = %self.name(), task_id = %self.task_id, "Finished task"),
            Err(e) if e.precedes_restore_record() => {
                tracing::error!(task = %self.name(), task_id = %self.task_id, error = %e, "restore could not start");
            }
            Err(_) => {}
        }
        result
    }

    async fn run_workflow(&self) -> Result<(), RestoreError> {
        let universe_id = self.params.universe_id;
        self.locker
            .check_version(universe_id, self.params.expected_universe_version)?;

        let lock = self
            .locker
            .lock(universe_id, self.lock_expectation(), self.task_id)?;

        let (plan, restore) = match self.prepare(&lock) {
            Ok(prepared) => prepared,
            Err(e) => {
                lock.release(TaskDetails::Clear);
                return Err(e);
            }
        };

        self.execute(plan, &restore, lock).await
    }

    fn lock_expectation(&self) -> ExpectedVersion {
        if self.config.enforce_universe_version() {
            self.params.expected_universe_version
        } else {
            ExpectedVersion::Any
        }
    }

    fn prepare(&self, lock: &UniverseLock) -> Result<(Plan, Restore), RestoreError> {
        let plan = self.planner.build(&self.params, lock.snapshot(), || {
            self.ctx.versions.stable_controller_version()
        })?;
        tracing::info!(
            task_id = %self.task_id,
            subtasks = plan.len(),
            upgrades_agent = plan.in_group(SubTaskGroup::UpgradingAgent).count() > 0,
            "restore plan built"
        );
        let restore = self.tracker.begin(&self.params, self.task_id)?;
        Ok((plan, restore))
    }

    async fn execute(
        &self,
        plan: Plan,
        restore: &Restore,
        lock: UniverseLock,
    ) -> Result<(), RestoreError> {
        for subtask in plan {
            self.ctx.runner.add(subtask);
        }

        match self.ctx.runner.run_subtasks().await.map_err(RestoreError::from) {
            Ok(()) => {
                lock.release(TaskDetails::Clear);
                self.tracker
                    .finish(restore, self.task_id, RestoreState::Success);
                Ok(())
            }
            Err(RestoreError::Cancelled) => {
                tracing::warn!(task = %self.name(), task_id = %self.task_id, "restore aborted");
                lock.release(TaskDetails::Preserve);
                self.tracker.abort(restore, self.task_id);
                Err(RestoreError::Cancelled)
            }
            Err(e) => {
                tracing::error!(
                    task = %self.name(),
                    task_id = %self.task_id,
                    error = %e,
                    "Error executing task"
                );
                self.tracker
                    .finish(restore, self.task_id, RestoreState::Failure);
                lock.release(TaskDetails::Clear);
                Err(e)
            }
        }
    }

    async fn reenable_load_balancer(&self) {
        self.ctx.runner.reset();
        self.ctx.runner.add(SubtaskDescriptor::new(
            SubtaskKind::LoadBalancerStateChange {
                universe_id: self.params.universe_id,
                enable: true,
            },
            SubTaskGroup::ConfigureUniverse,
        ));
        if let Err(e) = self.ctx.runner.run_subtasks().await {
            tracing::error!(
                task = %self.name(),
                task_id = %self.task_id,
                error = %e,
                "failed to re-enable load balancer"
            );
        }
    }
}
