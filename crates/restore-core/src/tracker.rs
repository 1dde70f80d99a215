//! Restore record tracking
//!
//! Creates the persistent [`Restore`] record and moves it to its terminal
//! state. Bookkeeping never outranks the workflow: terminal updates log and
//! swallow persistence errors so lock release and error propagation proceed.

use std::sync::Arc;

use crate::context::RestoreStore;
use crate::error::RestoreError;
use crate::state_machine::Transition;
use crate::types::{Restore, RestoreBackupParams, RestoreKeyspace, RestoreState, TaskId};

/// Restore-record tracker
#[derive(Clone)]
pub struct RestoreTracker {
    store: Arc<dyn RestoreStore>,
}

impl RestoreTracker {
    /// Create tracker over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn RestoreStore>) -> Self {
        Self { store }
    }

    /// Persist an in-progress restore with one keyspace row per backup
    ///
    /// # Errors
    /// `RestoreError::Persistence` if the record cannot be stored.
    pub fn begin(
        &self,
        request: &RestoreBackupParams,
        task_id: TaskId,
    ) -> Result<Restore, RestoreError> {
        let restore = Restore::in_progress(request, task_id);
        let keyspaces = request
            .backup_storage_info
            .iter()
            .map(|info| RestoreKeyspace::for_backup(&restore, info))
            .collect();
        self.store.insert(restore.clone(), keyspaces)?;
        tracing::info!(
            restore_id = %restore.id,
            %task_id,
            universe_id = %restore.universe_id,
            backups = request.backup_storage_info.len(),
            "restore record created"
        );
        Ok(restore)
    }

    /// Move the restore to a terminal `state`
    ///
    /// Repeating the current state is a no-op; once terminal, other states are
    /// ignored. Persistence errors are logged and swallowed.
    pub fn finish(&self, restore: &Restore, task_id: TaskId, state: RestoreState) {
        let result = self.store.update_state(restore.id, task_id, state);
        Self::log_transition(restore, state, result);
    }

    /// Move every non-terminal keyspace row of `restore` to `state`
    ///
    /// Returns the number of rows changed; a store error is logged and
    /// counts as nothing changed.
    pub fn abort_children(&self, restore: &Restore, state: RestoreState) -> usize {
        match self.store.update_keyspaces(restore.id, state) {
            Ok(changed) => {
                tracing::debug!(restore_id = %restore.id, %state, changed, "keyspace rows updated");
                changed
            }
            Err(e) => {
                tracing::error!(
                    restore_id = %restore.id,
                    %state,
                    error = %e,
                    "failed to update restore keyspace rows"
                );
                0
            }
        }
    }

    /// Abort the restore and its keyspace rows together
    pub fn abort(&self, restore: &Restore, task_id: TaskId) {
        let result = self
            .store
            .finish_with_children(restore.id, task_id, RestoreState::Aborted);
        Self::log_transition(restore, RestoreState::Aborted, result);
    }

    fn log_transition(
        restore: &Restore,
        state: RestoreState,
        result: Result<Transition, crate::error::StoreError>,
    ) {
        match result {
            Ok(Transition::Applied { from }) => {
                tracing::info!(restore_id = %restore.id, %from, to = %state, "restore state updated");
            }
            Ok(Transition::Unchanged) => {
                tracing::debug!(restore_id = %restore.id, %state, "restore already in state");
            }
            Ok(Transition::Rejected { current }) => {
                tracing::warn!(
                    restore_id = %restore.id,
                    %current,
                    requested = %state,
                    "restore already finished, ignoring state change"
                );
            }
            Err(e) => {
                tracing::error!(
                    restore_id = %restore.id,
                    %state,
                    error = %e,
                    "failed to update restore state"
                );
            }
        }
    }
}

impl std::fmt::Debug for RestoreTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestoreTracker").finish_non_exhaustive()
    }
}
