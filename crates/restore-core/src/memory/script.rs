//! Fault-injecting subtask executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::runner::{CancelHandle, SequentialRunner, SubtaskError, SubtaskExecutor};
use crate::types::{SubtaskDescriptor, SubtaskKind};

/// Executor whose faults are fixed up front
///
/// Restore subtasks are counted from zero in execution order. A cancelled
/// subtask trips the runner's [`CancelHandle`] and never completes.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    fail_restore_at: Option<usize>,
    cancel_restore_at: Option<usize>,
    fail_load_balancer: bool,
    cancel: Mutex<Option<CancelHandle>>,
    restores_started: AtomicUsize,
}

impl ScriptedExecutor {
    /// Executor where every subtask succeeds
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the restore subtask at `index`
    #[must_use]
    pub fn fail_restore_at(mut self, index: usize) -> Self {
        self.fail_restore_at = Some(index);
        self
    }

    /// Cancel the workflow while the restore subtask at `index` runs
    #[must_use]
    pub fn cancel_restore_at(mut self, index: usize) -> Self {
        self.cancel_restore_at = Some(index);
        self
    }

    /// Fail every load balancer change
    #[must_use]
    pub fn fail_load_balancer(mut self) -> Self {
        self.fail_load_balancer = true;
        self
    }

    /// Handle tripped by a scripted cancellation
    pub fn attach(&self, cancel: CancelHandle) {
        *self.cancel.lock() = Some(cancel);
    }

    /// Runner driving this executor, wired for scripted cancellation
    #[must_use]
    pub fn into_runner(self) -> SequentialRunner {
        let cancel = CancelHandle::new();
        self.attach(cancel.clone());
        SequentialRunner::with_cancel_handle(Arc::new(self), cancel)
    }
}

#[async_trait]
impl SubtaskExecutor for ScriptedExecutor {
    async fn execute(&self, subtask: &SubtaskDescriptor) -> Result<(), SubtaskError> {
        match &subtask.kind {
            SubtaskKind::RestoreKeyspace { params, .. } => {
                let index = self.restores_started.fetch_add(1, Ordering::SeqCst);
                if self.fail_restore_at == Some(index) {
                    return Err(SubtaskError::new(format!(
                        "restore of {} failed",
                        params.backup_storage_info.keyspace
                    )));
                }
                if self.cancel_restore_at == Some(index) {
                    let cancel = self.cancel.lock().clone();
                    if let Some(cancel) = cancel {
                        cancel.cancel();
                        std::future::pending::<()>().await;
                    }
                }
                Ok(())
            }
            SubtaskKind::LoadBalancerStateChange { .. } if self.fail_load_balancer => {
                Err(SubtaskError::new("load balancer unreachable"))
            }
            _ => Ok(()),
        }
    }
}
