//! Orchestrator configuration
//!
//! Serde-backed settings with defaults. Libraries receive an already-built
//! [`OrchestratorConfig`]; the binary loads it from TOML.

use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Workflow behaviour
    pub orchestrator: WorkflowConfig,
    /// Controller agent settings
    pub controller: ControllerConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward the request's expected version to the lock call
    #[inline]
    #[must_use]
    pub fn with_enforced_universe_version(mut self, enforce: bool) -> Self {
        self.orchestrator.enforce_universe_version = enforce;
        self
    }

    /// With stable controller version
    #[inline]
    #[must_use]
    pub fn with_stable_controller_version(mut self, version: impl Into<String>) -> Self {
        self.controller.stable_version = version.into();
        self
    }

    /// Whether the lock call enforces the caller's expected version
    #[inline]
    #[must_use]
    pub fn enforce_universe_version(&self) -> bool {
        self.orchestrator.enforce_universe_version
    }
}

/// Workflow behaviour
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// When false the universe is locked unconditionally (expected version = any)
    pub enforce_universe_version: bool,
}

/// Controller agent settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Version every controlled universe should run
    pub stable_version: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            stable_version: "2.0.0.0-b1".to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "info".to_string(),
        }
    }
}
