//! Harness tests: inputs read from disk, workflow run in-process

use std::io::Write;

use pretty_assertions::assert_eq;
use restore_cli::driver::{self, Faults, UniverseSetup};
use restore_cli::settings;
use restore_core::{
    BackupStorageInfo, CustomerId, LogFormat, RestoreBackupParams, RestoreState, StorageConfigId,
    UniverseId,
};
use tempfile::NamedTempFile;

fn request() -> RestoreBackupParams {
    RestoreBackupParams::new(CustomerId::new(), UniverseId::new(), StorageConfigId::new())
        .with_backup(BackupStorageInfo::new("s3://backups/orders", "orders"))
        .with_backup(BackupStorageInfo::new("s3://backups/payments", "payments"))
        .with_alter_load_balancer(true)
}

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn request_round_trips_through_file() {
    let expected = request();
    let file = write_temp(&serde_json::to_string(&expected).unwrap());

    let loaded = settings::load_request(file.path()).unwrap();
    assert_eq!(loaded, expected);
}

#[test]
fn minimal_request_json_uses_defaults() {
    let universe_id = UniverseId::new();
    let file = write_temp(&format!(
        r#"{{
            "customerId": "{}",
            "universeId": "{universe_id}",
            "storageConfigId": "{}",
            "backupStorageInfo": [
                {{ "storageLocation": "s3://b/orders", "keyspace": "orders" }}
            ]
        }}"#,
        CustomerId::new(),
        StorageConfigId::new(),
    ));

    let loaded = settings::load_request(file.path()).unwrap();
    assert_eq!(loaded.universe_id, universe_id);
    assert!(!loaded.alter_load_balancer);
    assert_eq!(loaded.backup_storage_info[0].keyspace, "orders");
}

#[test]
fn config_file_is_loaded() {
    let file = write_temp(
        r#"
        [controller]
        stable_version = "1.3"

        [logging]
        format = "json"
        "#,
    );

    let config = settings::load_config(Some(file.path())).unwrap();
    assert_eq!(config.controller.stable_version, "1.3");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn malformed_config_is_an_error() {
    let file = write_temp("[controller\nstable_version = ");
    let err = settings::load_config(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("parsing config"));
}

#[test]
fn plan_without_agent_skips_upgrade() {
    let config = settings::load_config(None).unwrap();
    let plan = driver::plan(&request(), &config, &UniverseSetup::default()).unwrap();

    let names: Vec<_> = plan.iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec!["RestoreKeyspace", "RestoreKeyspace", "MarkUniverseUpdateSuccess"]
    );
}

#[tokio::test]
async fn successful_run_reports_terminal_rows() {
    let (report, result) = driver::run(
        request(),
        settings::load_config(None).unwrap(),
        &UniverseSetup::default(),
        Faults::default(),
    )
    .await;

    result.unwrap();
    assert_eq!(report.error, None);
    assert_eq!(report.restore.unwrap().state, RestoreState::Success);
    assert_eq!(report.keyspaces.len(), 2);
    assert_eq!(
        report.executed.last().map(|s| s.name()),
        Some("LoadBalancerStateChange")
    );
    assert!(!report.universe_locked);
}

#[tokio::test]
async fn cancelled_run_reports_aborted_rows() {
    let faults = Faults {
        cancel_at: Some(1),
        ..Faults::default()
    };
    let (report, result) = driver::run(
        request(),
        settings::load_config(None).unwrap(),
        &UniverseSetup::default(),
        faults,
    )
    .await;

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(report.restore.unwrap().state, RestoreState::Aborted);
    assert!(report
        .keyspaces
        .iter()
        .all(|k| k.state == RestoreState::Aborted));

    let json = serde_json::to_value(&report.executed).unwrap();
    assert_eq!(json.as_array().map(Vec::len), Some(report.executed.len()));
}
