//! Configuration file parsing

use pretty_assertions::assert_eq;
use restore_core::config::{ControllerConfig, LoggingConfig, WorkflowConfig};
use restore_core::{LogFormat, OrchestratorConfig};

#[test]
fn full_file_parses() {
    let config: OrchestratorConfig = toml::from_str(
        r#"
        [orchestrator]
        enforce_universe_version = true

        [controller]
        stable_version = "2.1.0.0-b5"

        [logging]
        format = "json"
        filter = "restore_core=debug"
        "#,
    )
    .unwrap();

    assert_eq!(
        config,
        OrchestratorConfig {
            orchestrator: WorkflowConfig {
                enforce_universe_version: true,
            },
            controller: ControllerConfig {
                stable_version: "2.1.0.0-b5".to_string(),
            },
            logging: LoggingConfig {
                format: LogFormat::Json,
                filter: "restore_core=debug".to_string(),
            },
        }
    );
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let config: OrchestratorConfig = toml::from_str(
        r#"
        [controller]
        stable_version = "1.3"
        "#,
    )
    .unwrap();

    assert_eq!(
        config,
        OrchestratorConfig::new().with_stable_controller_version("1.3")
    );
}

#[test]
fn empty_file_is_default() {
    let config: OrchestratorConfig = toml::from_str("").unwrap();
    assert_eq!(config, OrchestratorConfig::default());
}

#[test]
fn unknown_log_format_is_rejected() {
    let result = toml::from_str::<OrchestratorConfig>(
        r#"
        [logging]
        format = "xml"
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn serialized_config_reads_back() {
    let config = OrchestratorConfig::new().with_enforced_universe_version(true);
    let text = toml::to_string(&config).unwrap();
    let parsed: OrchestratorConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}
