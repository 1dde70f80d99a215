//! In-memory collaborators for testing and local runs.
//!
//! ## Limitations
//!
//! - **NOT suitable for production**: no cross-process coordination
//! - **No persistence**: all state is lost when the process exits
//! - Subtasks are executed sequentially by a pluggable [`SubtaskExecutor`]

pub mod registry;
pub mod runner;
pub mod script;
pub mod store;

pub use registry::{InMemoryUniverseRegistry, UnlockRecord};
pub use runner::{
    CancelHandle, NoopExecutor, SequentialRunner, SubtaskError, SubtaskExecutor, SubtaskRecord,
    SubtaskStatus,
};
pub use script::ScriptedExecutor;
pub use store::InMemoryRestoreStore;

use crate::context::VersionOracle;

/// Version oracle returning a fixed version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticVersionOracle {
    version: String,
}

impl StaticVersionOracle {
    /// Create oracle
    #[inline]
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl From<&crate::config::ControllerConfig> for StaticVersionOracle {
    fn from(config: &crate::config::ControllerConfig) -> Self {
        Self::new(config.stable_version.clone())
    }
}

impl VersionOracle for StaticVersionOracle {
    fn stable_controller_version(&self) -> String {
        self.version.clone()
    }
}
