//! Sequential subtask runner.
//!
//! Executes the pending batch one subtask at a time through a
//! [`SubtaskExecutor`]. A failed or cancelled batch leaves its unexecuted
//! subtasks queued until [`SubtaskRunner::reset`] is called.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::context::SubtaskRunner;
use crate::error::RunnerError;
use crate::types::{SubtaskDescriptor, SubtaskKind};

/// Failure reported by a subtask executor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SubtaskError(pub String);

impl SubtaskError {
    /// Create error
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Executes a single subtask
#[async_trait]
pub trait SubtaskExecutor: Send + Sync {
    /// Run `subtask` to completion
    async fn execute(&self, subtask: &SubtaskDescriptor) -> Result<(), SubtaskError>;
}

/// Executor that succeeds immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

#[async_trait]
impl SubtaskExecutor for NoopExecutor {
    async fn execute(&self, subtask: &SubtaskDescriptor) -> Result<(), SubtaskError> {
        tracing::debug!(subtask = %subtask, "executing subtask");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation signal shared with whoever may abort the workflow
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

impl CancelHandle {
    /// Create un-cancelled handle
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the running batch
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    fn clear(&self) {
        self.inner.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Terminal status of one executed subtask
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtaskStatus {
    /// Completed
    Success,
    /// Executor reported an error
    Failed(String),
    /// Interrupted by cancellation
    Cancelled,
}

/// Execution history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskRecord {
    /// The subtask
    pub subtask: SubtaskDescriptor,
    /// How it ended
    pub status: SubtaskStatus,
}

/// Runs subtasks in the order they were added
pub struct SequentialRunner {
    queue: Mutex<VecDeque<SubtaskDescriptor>>,
    executor: Arc<dyn SubtaskExecutor>,
    cancel: CancelHandle,
    history: Mutex<Vec<SubtaskRecord>>,
}

impl SequentialRunner {
    /// Create runner over an executor
    #[must_use]
    pub fn new(executor: Arc<dyn SubtaskExecutor>) -> Self {
        Self::with_cancel_handle(executor, CancelHandle::new())
    }

    /// Create runner observing an existing cancellation handle
    #[must_use]
    pub fn with_cancel_handle(executor: Arc<dyn SubtaskExecutor>, cancel: CancelHandle) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            executor,
            cancel,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Handle that cancels the running batch
    #[inline]
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Subtasks waiting to run
    #[must_use]
    pub fn pending(&self) -> Vec<SubtaskDescriptor> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Everything executed so far, in order
    #[must_use]
    pub fn history(&self) -> Vec<SubtaskRecord> {
        self.history.lock().clone()
    }

    /// Kinds of executed subtasks, in order
    #[must_use]
    pub fn executed(&self) -> Vec<SubtaskKind> {
        self.history
            .lock()
            .iter()
            .map(|r| r.subtask.kind.clone())
            .collect()
    }

    fn record(&self, subtask: SubtaskDescriptor, status: SubtaskStatus) {
        self.history.lock().push(SubtaskRecord { subtask, status });
    }
}

#[async_trait]
impl SubtaskRunner for SequentialRunner {
    fn add(&self, subtask: SubtaskDescriptor) {
        self.queue.lock().push_back(subtask);
    }

    async fn run_subtasks(&self) -> Result<(), RunnerError> {
        loop {
            let next = self.queue.lock().pop_front();
            let Some(subtask) = next else {
                return Ok(());
            };

            if self.cancel.is_cancelled() {
                self.queue.lock().push_front(subtask);
                return Err(RunnerError::Cancelled);
            }

            tracing::debug!(subtask = %subtask, group = subtask.group.title(), "running subtask");
            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                result = self.executor.execute(&subtask) => Some(result),
            };

            match outcome {
                None => {
                    self.record(subtask, SubtaskStatus::Cancelled);
                    return Err(RunnerError::Cancelled);
                }
                Some(Ok(())) => self.record(subtask, SubtaskStatus::Success),
                Some(Err(e)) => {
                    let err = RunnerError::Failed {
                        subtask: subtask.name().to_string(),
                        group: subtask.group,
                        message: e.0.clone(),
                    };
                    self.record(subtask, SubtaskStatus::Failed(e.0));
                    return Err(err);
                }
            }
        }
    }

    fn reset(&self) {
        self.queue.lock().clear();
        self.cancel.clear();
    }
}

impl std::fmt::Debug for SequentialRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialRunner")
            .field("pending", &self.queue.lock().len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
