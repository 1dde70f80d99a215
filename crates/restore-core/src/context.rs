//! Collaborator contracts of the restore workflow
//!
//! The workflow does not own the universe registry, the subtask runner or the
//! persistence layer. It talks to them through the traits below, bundled in a
//! [`UniverseTaskContext`]. Production wires real backends; tests and the
//! harness binary wire the implementations in [`crate::memory`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{RegistryError, RunnerError, StoreError};
use crate::state_machine::Transition;
use crate::types::{
    ExpectedVersion, Restore, RestoreId, RestoreKeyspace, RestoreState, RestoreSubtaskParams,
    SubtaskDescriptor, SubtaskKind, TaskId, UniverseId, UniverseSnapshot,
};

/// Universe registry: lookup plus the universe-wide update lock
pub trait UniverseRegistry: Send + Sync {
    /// Fetch the universe or fail with `NotFound`
    fn get_or_fail(&self, universe_id: UniverseId) -> Result<UniverseSnapshot, RegistryError>;

    /// Verify the caller's view of the universe is current
    fn check_version(
        &self,
        universe_id: UniverseId,
        expected: ExpectedVersion,
    ) -> Result<(), RegistryError>;

    /// Take the exclusive update lock and record `task_id` as the in-progress task
    fn lock(
        &self,
        universe_id: UniverseId,
        expected: ExpectedVersion,
        task_id: TaskId,
    ) -> Result<UniverseSnapshot, RegistryError>;

    /// Release the update lock; `clear_task_details` scrubs the task pointer
    fn unlock(&self, universe_id: UniverseId, clear_task_details: bool)
        -> Result<(), RegistryError>;
}

/// Source of the controller agent version universes should run
#[cfg_attr(test, mockall::automock)]
pub trait VersionOracle: Send + Sync {
    /// Stable controller agent version
    fn stable_controller_version(&self) -> String;
}

/// Executes batches of subtasks appended by the workflow
#[async_trait]
pub trait SubtaskRunner: Send + Sync {
    /// Append a subtask to the pending batch
    fn add(&self, subtask: SubtaskDescriptor);

    /// Run the pending batch until it terminates or is cancelled
    ///
    /// Cancellation must surface as [`RunnerError::Cancelled`].
    async fn run_subtasks(&self) -> Result<(), RunnerError>;

    /// Discard pending subtasks and any cancellation aimed at the previous batch
    fn reset(&self);
}

/// Persistence of restore records and their keyspace rows
pub trait RestoreStore: Send + Sync {
    /// Persist a new restore with its keyspace rows
    fn insert(&self, restore: Restore, keyspaces: Vec<RestoreKeyspace>) -> Result<(), StoreError>;

    /// Fetch a restore
    fn get(&self, restore_id: RestoreId) -> Result<Restore, StoreError>;

    /// Find the restore owned by a workflow
    fn find_by_task(&self, task_id: TaskId) -> Result<Option<Restore>, StoreError>;

    /// Keyspace rows of a restore, in creation order
    fn keyspaces(&self, restore_id: RestoreId) -> Result<Vec<RestoreKeyspace>, StoreError>;

    /// Move a restore to `state` on behalf of `task_id`
    fn update_state(
        &self,
        restore_id: RestoreId,
        task_id: TaskId,
        state: RestoreState,
    ) -> Result<Transition, StoreError>;

    /// Move every non-terminal keyspace row to `state`; returns rows changed
    fn update_keyspaces(&self, restore_id: RestoreId, state: RestoreState)
        -> Result<usize, StoreError>;

    /// Move the restore and its non-terminal rows to `state` as one unit
    ///
    /// Either both the parent and its rows change or neither does; a backend
    /// without transactions must not emulate this with two writes.
    fn finish_with_children(
        &self,
        restore_id: RestoreId,
        task_id: TaskId,
        state: RestoreState,
    ) -> Result<Transition, StoreError>;
}

/// Subtask family factory for one backup
///
/// Controlled and legacy restores need different subtasks; the workflow only
/// tells the factory which family applies.
pub trait RestoreSubtaskFactory: Send + Sync {
    /// Subtasks restoring the single backup in `params`
    fn restore_subtasks(&self, params: &RestoreSubtaskParams, controlled: bool)
        -> Vec<SubtaskKind>;
}

/// Capabilities a universe task needs
#[derive(Clone)]
pub struct UniverseTaskContext {
    /// Universe lookup and lock
    pub registry: Arc<dyn UniverseRegistry>,
    /// Stable controller version
    pub versions: Arc<dyn VersionOracle>,
    /// Subtask execution
    pub runner: Arc<dyn SubtaskRunner>,
    /// Restore persistence
    pub store: Arc<dyn RestoreStore>,
    /// Restore subtask family
    pub subtasks: Arc<dyn RestoreSubtaskFactory>,
}

impl UniverseTaskContext {
    /// Bundle collaborators, using the default restore subtask family
    #[must_use]
    pub fn new(
        registry: Arc<dyn UniverseRegistry>,
        versions: Arc<dyn VersionOracle>,
        runner: Arc<dyn SubtaskRunner>,
        store: Arc<dyn RestoreStore>,
    ) -> Self {
        Self {
            registry,
            versions,
            runner,
            store,
            subtasks: Arc::new(crate::plan::DefaultRestoreSubtaskFactory),
        }
    }

    /// With a custom restore subtask family
    #[must_use]
    pub fn with_subtask_factory(mut self, subtasks: Arc<dyn RestoreSubtaskFactory>) -> Self {
        self.subtasks = subtasks;
        self
    }
}

impl std::fmt::Debug for UniverseTaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniverseTaskContext").finish_non_exhaustive()
    }
}
