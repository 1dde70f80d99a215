//! Loading configuration and requests from disk, and log setup.

use std::path::Path;

use anyhow::Context;
use restore_core::config::LoggingConfig;
use restore_core::{LogFormat, OrchestratorConfig, RestoreBackupParams};
use tracing_subscriber::EnvFilter;

/// Read the orchestrator config, or defaults when no file is given
///
/// # Errors
/// Unreadable file or invalid TOML.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<OrchestratorConfig> {
    let Some(path) = path else {
        return Ok(OrchestratorConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Read a JSON restore request
///
/// # Errors
/// Unreadable file or a request that does not deserialize.
pub fn load_request(path: &Path) -> anyhow::Result<RestoreBackupParams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing request {}", path.display()))
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured filter. Logs go to stderr so stdout
/// stays machine-readable.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if let Err(e) = installed {
        eprintln!("tracing already initialised: {e}");
    }
}
