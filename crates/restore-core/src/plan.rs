//! Restore plan building
//!
//! Translates a restore request plus the universe snapshot into the ordered
//! list of subtasks the runner executes:
//!
//! 1. optional controller agent upgrade (`UpgradingAgent`)
//! 2. restore subtasks for every backup, in request order (`RestoringBackup`)
//! 3. `MarkUniverseUpdateSuccess` (`ConfigureUniverse`), always last
//!
//! Building is pure: no registry, store or runner access.

use std::sync::Arc;

use serde::Serialize;

use crate::context::RestoreSubtaskFactory;
use crate::error::PlanError;
use crate::types::{
    ActionType, RestoreBackupParams, RestoreSubtaskParams, SubTaskGroup, SubtaskDescriptor,
    SubtaskKind, UniverseSnapshot,
};

/// Ordered subtasks of one restore
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Plan {
    subtasks: Vec<SubtaskDescriptor>,
}

impl Plan {
    /// Subtasks in execution order
    #[inline]
    #[must_use]
    pub fn subtasks(&self) -> &[SubtaskDescriptor] {
        &self.subtasks
    }

    /// Number of subtasks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.subtasks.len()
    }

    /// Whether the plan is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subtasks.is_empty()
    }

    /// Iterate in execution order
    pub fn iter(&self) -> impl Iterator<Item = &SubtaskDescriptor> {
        self.subtasks.iter()
    }

    /// Subtasks of one progress group
    pub fn in_group(&self, group: SubTaskGroup) -> impl Iterator<Item = &SubtaskDescriptor> {
        self.subtasks.iter().filter(move |s| s.group == group)
    }

    fn push(&mut self, kind: SubtaskKind, group: SubTaskGroup) {
        self.subtasks.push(SubtaskDescriptor::new(kind, group));
    }
}

impl IntoIterator for Plan {
    type Item = SubtaskDescriptor;
    type IntoIter = std::vec::IntoIter<SubtaskDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.subtasks.into_iter()
    }
}

/// Builds restore plans
#[derive(Clone)]
pub struct PlanBuilder {
    subtasks: Arc<dyn RestoreSubtaskFactory>,
}

impl PlanBuilder {
    /// Create builder over a restore subtask family
    #[inline]
    #[must_use]
    pub fn new(subtasks: Arc<dyn RestoreSubtaskFactory>) -> Self {
        Self { subtasks }
    }

    /// Build the plan for `request` against `universe`
    ///
    /// `stable_version` is only read when the universe runs the controller
    /// agent; pass a closure so callers can skip the lookup otherwise.
    ///
    /// # Errors
    /// - `PlanError::EmptyBackupList` if there is nothing to restore
    /// - `PlanError::NoSubtasks` if the family yields nothing for a backup
    pub fn build<F>(
        &self,
        request: &RestoreBackupParams,
        universe: &UniverseSnapshot,
        stable_version: F,
    ) -> Result<Plan, PlanError>
    where
        F: FnOnce() -> String,
    {
        if request.backup_storage_info.is_empty() {
            return Err(PlanError::EmptyBackupList);
        }

        let mut plan = Plan::default();

        if universe.controller_enabled {
            let stable = stable_version();
            if universe.needs_controller_upgrade(&stable) {
                plan.push(
                    SubtaskKind::UpgradeAgent {
                        universe_id: request.universe_id,
                        version: stable,
                        force: true,
                    },
                    SubTaskGroup::UpgradingAgent,
                );
            }
        }

        let controlled = request.is_controlled();
        for info in &request.backup_storage_info {
            let params = request.subtask_params(info, request.action_type);
            let kinds = self.subtasks.restore_subtasks(&params, controlled);
            if kinds.is_empty() {
                return Err(PlanError::NoSubtasks {
                    keyspace: info.keyspace.clone(),
                });
            }
            for kind in kinds {
                plan.push(kind, SubTaskGroup::RestoringBackup);
            }
        }

        plan.push(
            SubtaskKind::MarkUniverseUpdateSuccess {
                universe_id: request.universe_id,
            },
            SubTaskGroup::ConfigureUniverse,
        );

        Ok(plan)
    }
}

impl std::fmt::Debug for PlanBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanBuilder").finish_non_exhaustive()
    }
}

/// Default restore subtask family
///
/// Controlled restores hand keys and data to the agent in one subtask. Legacy
/// restores of encrypted backups restore the universe keys first.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRestoreSubtaskFactory;

impl RestoreSubtaskFactory for DefaultRestoreSubtaskFactory {
    fn restore_subtasks(
        &self,
        params: &RestoreSubtaskParams,
        controlled: bool,
    ) -> Vec<SubtaskKind> {
        let restore = |action_type| SubtaskKind::RestoreKeyspace {
            params: RestoreSubtaskParams {
                action_type,
                ..params.clone()
            },
            controlled,
        };

        if !controlled
            && params.action_type == ActionType::Restore
            && params.kms_config_id.is_some()
        {
            vec![restore(ActionType::RestoreKeys), restore(ActionType::Restore)]
        } else {
            vec![restore(params.action_type)]
        }
    }
}
