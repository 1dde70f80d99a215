//! Restore Core - Universe Restore Orchestrator
//!
//! Coordinates restoring a database backup into a running universe:
//! - Validates the request and takes the universe-wide update lock
//! - Builds the ordered restore plan (agent upgrade, restores, success marker)
//! - Submits the plan to the subtask runner and supervises the outcome
//! - Tracks the persistent restore record through its lifecycle
//! - Re-enables the load balancer after the workflow when asked to
//!
//! # Example
//!
//! ```rust,ignore
//! use restore_core::prelude::*;
//!
//! # async fn example(ctx: UniverseTaskContext, params: RestoreBackupParams) -> Result<(), RestoreError> {
//! let task = RestoreBackup::new(TaskId::new(), params, ctx, OrchestratorConfig::new());
//! task.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod config;
pub mod context;
pub mod error;
pub mod lock;
pub mod memory;
pub mod plan;
pub mod state_machine;
pub mod supervisor;
pub mod tracker;
pub mod types;

// Re-exports for convenience
pub use config::{LogFormat, OrchestratorConfig};
pub use context::{
    RestoreStore, RestoreSubtaskFactory, SubtaskRunner, UniverseRegistry, UniverseTaskContext,
    VersionOracle,
};
pub use error::{PlanError, RegistryError, RestoreError, RunnerError, StoreError};
pub use lock::{UniverseLock, UniverseLocker};
pub use plan::{DefaultRestoreSubtaskFactory, Plan, PlanBuilder};
pub use state_machine::Transition;
pub use supervisor::RestoreBackup;
pub use tracker::RestoreTracker;
pub use types::{
    ActionType, BackupCategory, BackupStorageInfo, CustomerId, ExpectedVersion, KmsConfigId,
    Restore, RestoreBackupParams, RestoreId, RestoreKeyspace, RestoreState, RestoreSubtaskParams,
    StorageConfigId, SubTaskGroup, SubtaskDescriptor, SubtaskKind, TableType, TaskDetails, TaskId,
    UniverseId, UniverseSnapshot,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running restores
    pub use crate::{
        BackupStorageInfo, OrchestratorConfig, RestoreBackup, RestoreBackupParams, RestoreError,
        RestoreState, TaskId, UniverseTaskContext,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
