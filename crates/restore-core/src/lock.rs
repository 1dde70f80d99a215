//! Universe update lock
//!
//! [`UniverseLocker`] adapts the registry's lock calls to the workflow and
//! hands out a [`UniverseLock`] guard. The guard must be released explicitly
//! with the task-details policy chosen by the terminal state; if it is dropped
//! unreleased (early return, panic, dropped future) it unlocks with
//! [`TaskDetails::Clear`].

use std::sync::Arc;

use crate::context::UniverseRegistry;
use crate::error::RestoreError;
use crate::types::{ExpectedVersion, TaskDetails, TaskId, UniverseId, UniverseSnapshot};

/// Lock manager adapter over a [`UniverseRegistry`]
#[derive(Clone)]
pub struct UniverseLocker {
    registry: Arc<dyn UniverseRegistry>,
}

impl UniverseLocker {
    /// Create adapter
    #[inline]
    #[must_use]
    pub fn new(registry: Arc<dyn UniverseRegistry>) -> Self {
        Self { registry }
    }

    /// Verify the caller's expected universe version
    ///
    /// # Errors
    /// `VersionMismatch`, `UniverseNotFound` or `Registry`.
    pub fn check_version(
        &self,
        universe_id: UniverseId,
        expected: ExpectedVersion,
    ) -> Result<(), RestoreError> {
        self.registry
            .check_version(universe_id, expected)
            .map_err(RestoreError::from)
    }

    /// Take the exclusive update lock for `task_id`
    ///
    /// # Errors
    /// - `RestoreError::LockConflict` if another update holds the lock
    /// - `RestoreError::UniverseNotFound` if the universe vanished
    pub fn lock(
        &self,
        universe_id: UniverseId,
        expected: ExpectedVersion,
        task_id: TaskId,
    ) -> Result<UniverseLock, RestoreError> {
        let snapshot = self.registry.lock(universe_id, expected, task_id)?;
        tracing::debug!(%universe_id, %task_id, version = snapshot.version, "universe locked");
        Ok(UniverseLock {
            registry: Arc::clone(&self.registry),
            universe_id,
            snapshot,
            released: false,
        })
    }
}

impl std::fmt::Debug for UniverseLocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniverseLocker").finish_non_exhaustive()
    }
}

/// Held universe update lock
#[must_use = "dropping the guard unlocks the universe"]
pub struct UniverseLock {
    registry: Arc<dyn UniverseRegistry>,
    universe_id: UniverseId,
    snapshot: UniverseSnapshot,
    released: bool,
}

impl UniverseLock {
    /// Locked universe
    #[inline]
    #[must_use]
    pub fn universe_id(&self) -> UniverseId {
        self.universe_id
    }

    /// Universe state observed when the lock was taken
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> &UniverseSnapshot {
        &self.snapshot
    }

    /// Release the lock. Failures are logged, never returned.
    pub fn release(mut self, details: TaskDetails) {
        self.unlock(details);
    }

    fn unlock(&mut self, details: TaskDetails) {
        if self.released {
            return;
        }
        self.released = true;
        match self.registry.unlock(self.universe_id, details.clears()) {
            Ok(()) => {
                tracing::debug!(universe_id = %self.universe_id, ?details, "universe unlocked");
            }
            Err(e) => {
                tracing::error!(
                    universe_id = %self.universe_id,
                    ?details,
                    error = %e,
                    "failed to unlock universe"
                );
            }
        }
    }
}

impl Drop for UniverseLock {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                universe_id = %self.universe_id,
                "universe lock dropped without explicit release"
            );
            self.unlock(TaskDetails::Clear);
        }
    }
}

impl std::fmt::Debug for UniverseLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniverseLock")
            .field("universe_id", &self.universe_id)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryUniverseRegistry;

    fn locker_with(universe_id: UniverseId) -> (UniverseLocker, Arc<InMemoryUniverseRegistry>) {
        let registry = Arc::new(InMemoryUniverseRegistry::new());
        registry.insert(UniverseSnapshot::new(universe_id, "u1"));
        (UniverseLocker::new(registry.clone()), registry)
    }

    #[test]
    fn dropped_guard_unlocks_and_clears_details() {
        let id = UniverseId::new();
        let (locker, registry) = locker_with(id);
        {
            let _lock = locker.lock(id, ExpectedVersion::Any, TaskId::new()).unwrap();
            assert!(registry.is_locked(id));
        }
        assert!(!registry.is_locked(id));
        assert_eq!(registry.task_details(id), None);
    }

    #[test]
    fn release_preserving_details_keeps_task_pointer() {
        let id = UniverseId::new();
        let (locker, registry) = locker_with(id);
        let task = TaskId::new();

        let lock = locker.lock(id, ExpectedVersion::Any, task).unwrap();
        lock.release(TaskDetails::Preserve);

        let history = registry.unlock_history();
        assert_eq!(history.len(), 1, "release must unlock exactly once");
        assert!(!history[0].clear_task_details);
        assert_eq!(registry.task_details(id), Some(task));
    }

    #[test]
    fn conflict_surfaces_as_lock_conflict() {
        let id = UniverseId::new();
        let (locker, _registry) = locker_with(id);
        let _held = locker.lock(id, ExpectedVersion::Any, TaskId::new()).unwrap();

        let err = locker
            .lock(id, ExpectedVersion::Any, TaskId::new())
            .unwrap_err();
        assert!(matches!(err, RestoreError::LockConflict { .. }));
    }

    #[test]
    fn unlock_failure_is_swallowed() {
        let id = UniverseId::new();
        let (locker, registry) = locker_with(id);
        let lock = locker.lock(id, ExpectedVersion::Any, TaskId::new()).unwrap();
        registry.remove(id);
        lock.release(TaskDetails::Clear);
        assert!(registry.unlock_history().is_empty());
    }
}
