//! In-memory universe registry.

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::context::UniverseRegistry;
use crate::error::RegistryError;
use crate::types::{ExpectedVersion, TaskId, UniverseId, UniverseSnapshot};

#[derive(Debug, Clone)]
struct UniverseEntry {
    snapshot: UniverseSnapshot,
    update_in_progress: bool,
    task: Option<TaskId>,
}

/// One `unlock` call, kept for inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockRecord {
    /// Unlocked universe
    pub universe_id: UniverseId,
    /// Whether the task pointer was scrubbed
    pub clear_task_details: bool,
}

/// Universe registry backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryUniverseRegistry {
    universes: DashMap<UniverseId, UniverseEntry>,
    unlocks: Mutex<Vec<UnlockRecord>>,
}

impl InMemoryUniverseRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a universe
    pub fn insert(&self, snapshot: UniverseSnapshot) {
        self.universes.insert(
            snapshot.universe_id,
            UniverseEntry {
                snapshot,
                update_in_progress: false,
                task: None,
            },
        );
    }

    /// Remove a universe
    pub fn remove(&self, universe_id: UniverseId) -> Option<UniverseSnapshot> {
        self.universes.remove(&universe_id).map(|(_, e)| e.snapshot)
    }

    /// Whether an update holds the lock
    #[must_use]
    pub fn is_locked(&self, universe_id: UniverseId) -> bool {
        self.universes
            .get(&universe_id)
            .is_some_and(|e| e.update_in_progress)
    }

    /// Task pointer shown to operators
    #[must_use]
    pub fn task_details(&self, universe_id: UniverseId) -> Option<TaskId> {
        self.universes.get(&universe_id).and_then(|e| e.task)
    }

    /// Current universe version
    #[must_use]
    pub fn version(&self, universe_id: UniverseId) -> Option<i64> {
        self.universes.get(&universe_id).map(|e| e.snapshot.version)
    }

    /// All unlock calls so far
    #[must_use]
    pub fn unlock_history(&self) -> Vec<UnlockRecord> {
        self.unlocks.lock().clone()
    }
}

impl UniverseRegistry for InMemoryUniverseRegistry {
    fn get_or_fail(&self, universe_id: UniverseId) -> Result<UniverseSnapshot, RegistryError> {
        self.universes
            .get(&universe_id)
            .map(|e| e.snapshot.clone())
            .ok_or(RegistryError::NotFound(universe_id))
    }

    fn check_version(
        &self,
        universe_id: UniverseId,
        expected: ExpectedVersion,
    ) -> Result<(), RegistryError> {
        let entry = self
            .universes
            .get(&universe_id)
            .ok_or(RegistryError::NotFound(universe_id))?;
        if expected.matches(entry.snapshot.version) {
            Ok(())
        } else {
            Err(RegistryError::VersionMismatch {
                universe_id,
                expected: expected.as_raw(),
                actual: entry.snapshot.version,
            })
        }
    }

    fn lock(
        &self,
        universe_id: UniverseId,
        expected: ExpectedVersion,
        task_id: TaskId,
    ) -> Result<UniverseSnapshot, RegistryError> {
        let mut entry = self
            .universes
            .get_mut(&universe_id)
            .ok_or(RegistryError::NotFound(universe_id))?;

        if entry.update_in_progress {
            return Err(RegistryError::Conflict {
                universe_id,
                holder: entry.task,
            });
        }
        if !expected.matches(entry.snapshot.version) {
            return Err(RegistryError::VersionMismatch {
                universe_id,
                expected: expected.as_raw(),
                actual: entry.snapshot.version,
            });
        }

        entry.update_in_progress = true;
        entry.task = Some(task_id);
        entry.snapshot.version += 1;
        Ok(entry.snapshot.clone())
    }

    fn unlock(
        &self,
        universe_id: UniverseId,
        clear_task_details: bool,
    ) -> Result<(), RegistryError> {
        let mut entry = self
            .universes
            .get_mut(&universe_id)
            .ok_or(RegistryError::NotFound(universe_id))?;
        entry.update_in_progress = false;
        if clear_task_details {
            entry.task = None;
        }
        drop(entry);

        self.unlocks.lock().push(UnlockRecord {
            universe_id,
            clear_task_details,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(universe_id: UniverseId) -> InMemoryUniverseRegistry {
        let registry = InMemoryUniverseRegistry::new();
        registry.insert(UniverseSnapshot::new(universe_id, "u1"));
        registry
    }

    #[test]
    fn lock_is_exclusive() {
        let id = UniverseId::new();
        let registry = registry_with(id);
        let first = TaskId::new();

        registry.lock(id, ExpectedVersion::Any, first).unwrap();
        let err = registry
            .lock(id, ExpectedVersion::Any, TaskId::new())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Conflict {
                universe_id: id,
                holder: Some(first)
            }
        );
    }

    #[test]
    fn lock_bumps_version_and_records_task() {
        let id = UniverseId::new();
        let registry = registry_with(id);
        let task = TaskId::new();

        let snapshot = registry.lock(id, ExpectedVersion::Exact(1), task).unwrap();
        assert_eq!(snapshot.version, 2);
        assert_eq!(registry.task_details(id), Some(task));
        assert!(registry.is_locked(id));
    }

    #[test]
    fn unlock_preserving_details_keeps_task_pointer() {
        let id = UniverseId::new();
        let registry = registry_with(id);
        let task = TaskId::new();

        registry.lock(id, ExpectedVersion::Any, task).unwrap();
        registry.unlock(id, false).unwrap();
        assert!(!registry.is_locked(id));
        assert_eq!(registry.task_details(id), Some(task));

        registry.lock(id, ExpectedVersion::Any, task).unwrap();
        registry.unlock(id, true).unwrap();
        assert_eq!(registry.task_details(id), None);
        assert_eq!(registry.unlock_history().len(), 2);
    }

    #[test]
    fn missing_universe_is_not_found() {
        let registry = InMemoryUniverseRegistry::new();
        let id = UniverseId::new();
        assert_eq!(
            registry.get_or_fail(id).unwrap_err(),
            RegistryError::NotFound(id)
        );
        assert!(registry.lock(id, ExpectedVersion::Any, TaskId::new()).is_err());
    }

    #[test]
    fn check_version_honours_expectation() {
        let id = UniverseId::new();
        let registry = registry_with(id);
        assert!(registry.check_version(id, ExpectedVersion::Any).is_ok());
        assert!(registry.check_version(id, ExpectedVersion::Exact(1)).is_ok());
        assert!(matches!(
            registry.check_version(id, ExpectedVersion::Exact(5)),
            Err(RegistryError::VersionMismatch { actual: 1, .. })
        ));
    }
}
