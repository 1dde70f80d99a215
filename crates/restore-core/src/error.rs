//! Error types for the restore orchestrator
//!
//! Provides the error taxonomy of the workflow:
//! - Request validation failures
//! - Pre-plan universe failures (lookup, version check, lock)
//! - Plan building failures
//! - Subtask failures and external cancellation
//! - Persistence failures of the restore record

use crate::types::{SubTaskGroup, TaskId, UniverseId};

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// Request cannot be planned
    #[error("invalid restore request: {0}")]
    InvalidRequest(String),

    /// Universe vanished from the registry
    #[error("universe {0} not found")]
    UniverseNotFound(UniverseId),

    /// Another update holds the universe lock
    #[error("universe {universe_id} is locked by another update")]
    LockConflict {
        /// Locked universe
        universe_id: UniverseId,
        /// Task currently holding the lock, if known
        holder: Option<TaskId>,
    },

    /// Caller's view of the universe is stale
    #[error("universe {universe_id} version mismatch: expected {expected}, found {actual}")]
    VersionMismatch {
        /// Universe checked
        universe_id: UniverseId,
        /// Version the caller expected
        expected: i64,
        /// Version the registry holds
        actual: i64,
    },

    /// Plan building failed
    #[error("plan building failed: {0}")]
    Plan(#[from] PlanError),

    /// A subtask failed
    #[error("subtask {subtask} failed: {message}")]
    SubtaskFailed {
        /// Failing subtask name
        subtask: String,
        /// Failure detail
        message: String,
    },

    /// External abort signal
    #[error("restore cancelled")]
    Cancelled,

    /// Restore record could not be persisted
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Registry failure not covered by a dedicated variant
    #[error("universe registry error: {0}")]
    Registry(RegistryError),
}

impl RestoreError {
    /// Check if this is the external abort signal
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if the workflow failed before any restore record could exist
    ///
    /// `Persistence` counts because the workflow only surfaces store errors
    /// from record creation; terminal updates swallow them.
    #[inline]
    #[must_use]
    pub fn precedes_restore_record(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::UniverseNotFound(_)
                | Self::LockConflict { .. }
                | Self::VersionMismatch { .. }
                | Self::Registry(_)
                | Self::Plan(_)
                | Self::Persistence(_)
        )
    }
}

impl From<RegistryError> for RestoreError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::NotFound(universe_id) => Self::UniverseNotFound(universe_id),
            RegistryError::Conflict {
                universe_id,
                holder,
            } => Self::LockConflict {
                universe_id,
                holder,
            },
            RegistryError::VersionMismatch {
                universe_id,
                expected,
                actual,
            } => Self::VersionMismatch {
                universe_id,
                expected,
                actual,
            },
            other @ RegistryError::Unavailable(_) => Self::Registry(other),
        }
    }
}

impl From<RunnerError> for RestoreError {
    fn from(value: RunnerError) -> Self {
        match value {
            RunnerError::Cancelled => Self::Cancelled,
            RunnerError::Failed {
                subtask, message, ..
            } => Self::SubtaskFailed { subtask, message },
        }
    }
}

/// Universe registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Universe does not exist
    #[error("universe {0} not found")]
    NotFound(UniverseId),

    /// Universe already locked
    #[error("universe {universe_id} already has an update in progress")]
    Conflict {
        /// Locked universe
        universe_id: UniverseId,
        /// Lock holder, if known
        holder: Option<TaskId>,
    },

    /// Optimistic version check failed
    #[error("universe {universe_id} is at version {actual}, expected {expected}")]
    VersionMismatch {
        /// Universe checked
        universe_id: UniverseId,
        /// Expected version
        expected: i64,
        /// Actual version
        actual: i64,
    },

    /// Backend unavailable
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Subtask runner errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunnerError {
    /// The batch was cancelled externally
    #[error("subtask batch cancelled")]
    Cancelled,

    /// A subtask terminated with an error
    #[error("subtask {subtask} in group {group:?} failed: {message}")]
    Failed {
        /// Failing subtask name
        subtask: String,
        /// Its progress group
        group: SubTaskGroup,
        /// Failure detail
        message: String,
    },
}

impl RunnerError {
    /// Check if this is the cancellation variant
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Restore persistence errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Record missing
    #[error("record not found: {0}")]
    NotFound(String),

    /// Record already exists
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// Backend unavailable
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Plan building errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Nothing to restore
    #[error("backup storage info list is empty")]
    EmptyBackupList,

    /// Subtask family produced nothing for a backup
    #[error("no restore subtasks produced for keyspace {keyspace}")]
    NoSubtasks {
        /// Keyspace of the offending backup
        keyspace: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_error_display() {
        let err = RestoreError::InvalidRequest("empty".to_string());
        assert!(err.to_string().contains("invalid restore request"));
    }

    #[test]
    fn runner_cancellation_maps_to_cancelled() {
        let err: RestoreError = RunnerError::Cancelled.into();
        assert!(err.is_cancelled());
        assert!(!err.precedes_restore_record());
    }

    #[test]
    fn runner_failure_maps_to_subtask_failed() {
        let err: RestoreError = RunnerError::Failed {
            subtask: "RestoreKeyspace".to_string(),
            group: SubTaskGroup::RestoringBackup,
            message: "disk full".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            RestoreError::SubtaskFailed { ref subtask, .. } if subtask == "RestoreKeyspace"
        ));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn registry_errors_map_to_workflow_variants() {
        let id = UniverseId::new();
        let not_found: RestoreError = RegistryError::NotFound(id).into();
        assert!(matches!(not_found, RestoreError::UniverseNotFound(u) if u == id));

        let conflict: RestoreError = RegistryError::Conflict {
            universe_id: id,
            holder: None,
        }
        .into();
        assert!(matches!(conflict, RestoreError::LockConflict { .. }));
        assert!(conflict.precedes_restore_record());

        let unavailable: RestoreError = RegistryError::Unavailable("down".into()).into();
        assert!(matches!(unavailable, RestoreError::Registry(_)));
    }

    #[test]
    fn plan_and_store_failures_precede_the_record() {
        let plan: RestoreError = PlanError::EmptyBackupList.into();
        assert!(plan.precedes_restore_record());

        let store: RestoreError = StoreError::Unavailable("down".into()).into();
        assert!(store.precedes_restore_record());

        let failed = RestoreError::SubtaskFailed {
            subtask: "RestoreKeyspace".to_string(),
            message: "disk full".to_string(),
        };
        assert!(!failed.precedes_restore_record());
    }
}
