//! In-memory restore store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::Mutex;

use crate::context::RestoreStore;
use crate::error::StoreError;
use crate::state_machine::{self, Transition};
use crate::types::{Restore, RestoreId, RestoreKeyspace, RestoreState, TaskId};

#[derive(Debug, Default)]
struct Tables {
    restores: HashMap<RestoreId, Restore>,
    keyspaces: HashMap<RestoreId, Vec<RestoreKeyspace>>,
}

impl Tables {
    fn update_state(
        &mut self,
        restore_id: RestoreId,
        task_id: TaskId,
        state: RestoreState,
    ) -> Result<Transition, StoreError> {
        let restore = self
            .restores
            .get_mut(&restore_id)
            .ok_or_else(|| StoreError::NotFound(format!("restore {restore_id}")))?;
        let transition = state_machine::resolve(restore.state, state);
        if let Transition::Applied { .. } = transition {
            restore.state = state;
            restore.task_id = task_id;
            restore.updated_at = Utc::now();
        }
        Ok(transition)
    }

    fn update_keyspaces(
        &mut self,
        restore_id: RestoreId,
        state: RestoreState,
    ) -> Result<usize, StoreError> {
        let rows = self
            .keyspaces
            .get_mut(&restore_id)
            .ok_or_else(|| StoreError::NotFound(format!("restore {restore_id}")))?;
        let mut changed = 0;
        for row in rows.iter_mut() {
            if let Transition::Applied { .. } = state_machine::resolve(row.state, state) {
                row.state = state;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

/// Restore store guarded by a single mutex
///
/// Parent and keyspace rows live under the same lock, so
/// [`RestoreStore::finish_with_children`] is atomic here.
#[derive(Debug, Default)]
pub struct InMemoryRestoreStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl InMemoryRestoreStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `Unavailable`
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored restores
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.lock().restores.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a keyspace row's state, as a restore subtask would
    ///
    /// # Errors
    /// `StoreError::NotFound` if the restore or keyspace is unknown.
    pub fn set_keyspace_state(
        &self,
        restore_id: RestoreId,
        keyspace: &str,
        state: RestoreState,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let row = tables
            .keyspaces
            .get_mut(&restore_id)
            .and_then(|rows| rows.iter_mut().find(|r| r.keyspace == keyspace))
            .ok_or_else(|| StoreError::NotFound(format!("keyspace {keyspace}")))?;
        row.state = state;
        Ok(())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

impl RestoreStore for InMemoryRestoreStore {
    fn insert(&self, restore: Restore, keyspaces: Vec<RestoreKeyspace>) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock();
        if tables.restores.contains_key(&restore.id) {
            return Err(StoreError::Duplicate(format!("restore {}", restore.id)));
        }
        tables.keyspaces.insert(restore.id, keyspaces);
        tables.restores.insert(restore.id, restore);
        Ok(())
    }

    fn get(&self, restore_id: RestoreId) -> Result<Restore, StoreError> {
        self.tables
            .lock()
            .restores
            .get(&restore_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("restore {restore_id}")))
    }

    fn find_by_task(&self, task_id: TaskId) -> Result<Option<Restore>, StoreError> {
        Ok(self
            .tables
            .lock()
            .restores
            .values()
            .find(|r| r.task_id == task_id)
            .cloned())
    }

    fn keyspaces(&self, restore_id: RestoreId) -> Result<Vec<RestoreKeyspace>, StoreError> {
        self.tables
            .lock()
            .keyspaces
            .get(&restore_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("restore {restore_id}")))
    }

    fn update_state(
        &self,
        restore_id: RestoreId,
        task_id: TaskId,
        state: RestoreState,
    ) -> Result<Transition, StoreError> {
        self.check_writable()?;
        self.tables.lock().update_state(restore_id, task_id, state)
    }

    fn update_keyspaces(
        &self,
        restore_id: RestoreId,
        state: RestoreState,
    ) -> Result<usize, StoreError> {
        self.check_writable()?;
        self.tables.lock().update_keyspaces(restore_id, state)
    }

    fn finish_with_children(
        &self,
        restore_id: RestoreId,
        task_id: TaskId,
        state: RestoreState,
    ) -> Result<Transition, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock();
        if !tables.keyspaces.contains_key(&restore_id) {
            return Err(StoreError::NotFound(format!("restore {restore_id}")));
        }
        let transition = tables.update_state(restore_id, task_id, state)?;
        tables.update_keyspaces(restore_id, state)?;
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackupStorageInfo, CustomerId, RestoreBackupParams, StorageConfigId, UniverseId};

    fn seeded() -> (InMemoryRestoreStore, Restore) {
        let request =
            RestoreBackupParams::new(CustomerId::new(), UniverseId::new(), StorageConfigId::new())
                .with_backup(BackupStorageInfo::new("s3://b/1", "ks1"))
                .with_backup(BackupStorageInfo::new("s3://b/2", "ks2"));
        let restore = Restore::in_progress(&request, TaskId::new());
        let rows = request
            .backup_storage_info
            .iter()
            .map(|i| RestoreKeyspace::for_backup(&restore, i))
            .collect();
        let store = InMemoryRestoreStore::new();
        store.insert(restore.clone(), rows).unwrap();
        (store, restore)
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let (store, restore) = seeded();
        let err = store.insert(restore, Vec::new()).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn first_terminal_state_wins() {
        let (store, restore) = seeded();
        let first = store
            .update_state(restore.id, restore.task_id, RestoreState::Success)
            .unwrap();
        assert!(matches!(first, Transition::Applied { .. }));

        let again = store
            .update_state(restore.id, restore.task_id, RestoreState::Success)
            .unwrap();
        assert_eq!(again, Transition::Unchanged);

        let other = store
            .update_state(restore.id, restore.task_id, RestoreState::Failure)
            .unwrap();
        assert_eq!(
            other,
            Transition::Rejected {
                current: RestoreState::Success
            }
        );
        assert_eq!(store.get(restore.id).unwrap().state, RestoreState::Success);
    }

    #[test]
    fn finish_with_children_skips_terminal_rows() {
        let (store, restore) = seeded();
        store
            .set_keyspace_state(restore.id, "ks1", RestoreState::Success)
            .unwrap();

        store
            .finish_with_children(restore.id, restore.task_id, RestoreState::Aborted)
            .unwrap();

        let rows = store.keyspaces(restore.id).unwrap();
        assert_eq!(rows[0].state, RestoreState::Success);
        assert_eq!(rows[1].state, RestoreState::Aborted);
        assert_eq!(store.get(restore.id).unwrap().state, RestoreState::Aborted);
    }

    #[test]
    fn failing_writes_surface_unavailable() {
        let (store, restore) = seeded();
        store.fail_writes(true);
        assert!(matches!(
            store.update_state(restore.id, restore.task_id, RestoreState::Failure),
            Err(StoreError::Unavailable(_))
        ));
        store.fail_writes(false);
        assert_eq!(store.get(restore.id).unwrap().state, RestoreState::InProgress);
    }

    #[test]
    fn failed_finish_with_children_changes_nothing() {
        let (store, restore) = seeded();
        store.fail_writes(true);

        let err = store
            .finish_with_children(restore.id, restore.task_id, RestoreState::Aborted)
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.fail_writes(false);
        assert_eq!(store.get(restore.id).unwrap().state, RestoreState::InProgress);
        assert!(store
            .keyspaces(restore.id)
            .unwrap()
            .iter()
            .all(|r| r.state == RestoreState::InProgress));
    }

    #[test]
    fn finish_with_children_of_unknown_restore_is_not_found() {
        let (store, _restore) = seeded();
        let err = store
            .finish_with_children(RestoreId::new(), TaskId::new(), RestoreState::Aborted)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.len(), 1);
    }
}
