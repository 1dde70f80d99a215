//! Core types for the restore orchestrator
//!
//! Defines the fundamental types shared by every component:
//! - Identity handles (universe, customer, restore, task)
//! - The restore request and its per-backup descriptors
//! - The universe snapshot consumed by the plan builder
//! - Restore / restore-keyspace tracking records
//! - Subtask descriptors and progress groups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

use crate::error::RestoreError;

/// Unique workflow handle (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Ulid);

impl TaskId {
    /// Generate new task ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a random identifier
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Universe identifier
    UniverseId
);
uuid_id!(
    /// Customer identifier
    CustomerId
);
uuid_id!(
    /// Backup storage configuration identifier
    StorageConfigId
);
uuid_id!(
    /// Encryption-at-rest key configuration identifier
    KmsConfigId
);
uuid_id!(
    /// Restore record identifier
    RestoreId
);
uuid_id!(
    /// Restore keyspace row identifier
    RestoreKeyspaceId
);

/// Optimistic concurrency expectation for universe updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpectedVersion {
    /// Do not enforce the universe version
    #[default]
    Any,
    /// Require the universe to be at exactly this version
    Exact(i64),
}

impl ExpectedVersion {
    /// Sentinel used on the wire for "any version"
    pub const ANY_RAW: i64 = -1;

    /// Raw value as understood by the universe registry
    #[inline]
    #[must_use]
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Any => Self::ANY_RAW,
            Self::Exact(v) => v,
        }
    }

    /// Decode a raw value; any negative number means "any"
    #[inline]
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Self::Any
        } else {
            Self::Exact(raw)
        }
    }

    /// Whether `actual` satisfies this expectation
    #[inline]
    #[must_use]
    pub fn matches(self, actual: i64) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(v) => v == actual,
        }
    }
}

/// Backup family used to produce the backup being restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupCategory {
    /// Script-driven backups taken without the controller agent
    #[default]
    Legacy,
    /// Backups taken through the controller agent (YBC)
    Controlled,
}

/// What a restore subtask should do with its backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Restore table data
    #[default]
    Restore,
    /// Restore the universe keys needed to decrypt the backup
    RestoreKeys,
}

/// Table API of the backed-up keyspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    /// Cassandra-compatible tables
    #[default]
    Ycql,
    /// PostgreSQL-compatible tables
    Ysql,
    /// Redis-compatible tables
    Redis,
}

/// One backup to restore
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStorageInfo {
    /// Source location inside the backup storage
    pub storage_location: String,
    /// Target keyspace / database
    pub keyspace: String,
    /// Tables to restore (empty = whole keyspace)
    #[serde(default)]
    pub table_names: Vec<String>,
    /// Table API of the keyspace
    #[serde(default)]
    pub backup_type: TableType,
}

impl BackupStorageInfo {
    /// Create a whole-keyspace backup descriptor
    #[inline]
    #[must_use]
    pub fn new(storage_location: impl Into<String>, keyspace: impl Into<String>) -> Self {
        Self {
            storage_location: storage_location.into(),
            keyspace: keyspace.into(),
            table_names: Vec::new(),
            backup_type: TableType::default(),
        }
    }

    /// Restrict to a set of tables
    #[inline]
    #[must_use]
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_names = tables.into_iter().map(Into::into).collect();
        self
    }

    /// With table API
    #[inline]
    #[must_use]
    pub fn with_backup_type(mut self, backup_type: TableType) -> Self {
        self.backup_type = backup_type;
        self
    }
}

/// High-level restore request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreBackupParams {
    /// Owning customer
    pub customer_id: CustomerId,
    /// Target universe
    pub universe_id: UniverseId,
    /// Backup storage credentials
    pub storage_config_id: StorageConfigId,
    /// Encryption-at-rest key, if the backup is encrypted
    #[serde(default)]
    pub kms_config_id: Option<KmsConfigId>,
    /// Point-in-time selector
    #[serde(default)]
    pub restore_time_stamp: Option<DateTime<Utc>>,
    /// Backups to restore, in order
    pub backup_storage_info: Vec<BackupStorageInfo>,
    /// Backup family
    #[serde(default)]
    pub category: BackupCategory,
    /// Restore data or keys
    #[serde(default)]
    pub action_type: ActionType,
    /// Skip checksum verification
    #[serde(default)]
    pub disable_checksum: bool,
    /// Restore tablespace placement
    #[serde(default)]
    pub use_tablespaces: bool,
    /// Re-enable the load balancer after the workflow, whatever the outcome
    #[serde(default)]
    pub alter_load_balancer: bool,
    /// Universe version the caller observed
    #[serde(default)]
    pub expected_universe_version: ExpectedVersion,
}

impl RestoreBackupParams {
    /// Create a legacy restore request with no backups yet
    #[must_use]
    pub fn new(
        customer_id: CustomerId,
        universe_id: UniverseId,
        storage_config_id: StorageConfigId,
    ) -> Self {
        Self {
            customer_id,
            universe_id,
            storage_config_id,
            kms_config_id: None,
            restore_time_stamp: None,
            backup_storage_info: Vec::new(),
            category: BackupCategory::default(),
            action_type: ActionType::default(),
            disable_checksum: false,
            use_tablespaces: false,
            alter_load_balancer: false,
            expected_universe_version: ExpectedVersion::Any,
        }
    }

    /// Append a backup to restore
    #[inline]
    #[must_use]
    pub fn with_backup(mut self, info: BackupStorageInfo) -> Self {
        self.backup_storage_info.push(info);
        self
    }

    /// With backup category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: BackupCategory) -> Self {
        self.category = category;
        self
    }

    /// With action type
    #[inline]
    #[must_use]
    pub fn with_action_type(mut self, action_type: ActionType) -> Self {
        self.action_type = action_type;
        self
    }

    /// With encryption-at-rest config
    #[inline]
    #[must_use]
    pub fn with_kms_config(mut self, kms_config_id: KmsConfigId) -> Self {
        self.kms_config_id = Some(kms_config_id);
        self
    }

    /// With load balancer re-enable post-step
    #[inline]
    #[must_use]
    pub fn with_alter_load_balancer(mut self, alter: bool) -> Self {
        self.alter_load_balancer = alter;
        self
    }

    /// With expected universe version
    #[inline]
    #[must_use]
    pub fn with_expected_version(mut self, expected: ExpectedVersion) -> Self {
        self.expected_universe_version = expected;
        self
    }

    /// Whether the controller agent drives the restore
    #[inline]
    #[must_use]
    pub fn is_controlled(&self) -> bool {
        self.category == BackupCategory::Controlled
    }

    /// Reject requests the orchestrator cannot plan
    ///
    /// # Errors
    /// `RestoreError::InvalidRequest` if there is nothing to restore or a
    /// backup descriptor is missing its location or keyspace.
    pub fn validate(&self) -> Result<(), RestoreError> {
        if self.backup_storage_info.is_empty() {
            return Err(RestoreError::InvalidRequest(
                "backup storage info list is empty".to_string(),
            ));
        }
        for (idx, info) in self.backup_storage_info.iter().enumerate() {
            if info.storage_location.trim().is_empty() {
                return Err(RestoreError::InvalidRequest(format!(
                    "backup #{idx} has no storage location"
                )));
            }
            if info.keyspace.trim().is_empty() {
                return Err(RestoreError::InvalidRequest(format!(
                    "backup #{idx} has no target keyspace"
                )));
            }
        }
        Ok(())
    }

    /// Narrow this request to one backup and one action
    #[must_use]
    pub fn subtask_params(
        &self,
        info: &BackupStorageInfo,
        action_type: ActionType,
    ) -> RestoreSubtaskParams {
        RestoreSubtaskParams {
            customer_id: self.customer_id,
            universe_id: self.universe_id,
            storage_config_id: self.storage_config_id,
            kms_config_id: self.kms_config_id,
            restore_time_stamp: self.restore_time_stamp,
            backup_storage_info: info.clone(),
            action_type,
            disable_checksum: self.disable_checksum,
            use_tablespaces: self.use_tablespaces,
        }
    }
}

/// Parameters of a single restore subtask
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSubtaskParams {
    /// Owning customer
    pub customer_id: CustomerId,
    /// Target universe
    pub universe_id: UniverseId,
    /// Backup storage credentials
    pub storage_config_id: StorageConfigId,
    /// Encryption-at-rest key
    pub kms_config_id: Option<KmsConfigId>,
    /// Point-in-time selector
    pub restore_time_stamp: Option<DateTime<Utc>>,
    /// The single backup this subtask restores
    pub backup_storage_info: BackupStorageInfo,
    /// Data or keys
    pub action_type: ActionType,
    /// Skip checksum verification
    pub disable_checksum: bool,
    /// Restore tablespace placement
    pub use_tablespaces: bool,
}

/// Observable universe state used for planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniverseSnapshot {
    /// Universe identifier
    pub universe_id: UniverseId,
    /// Display name
    pub name: String,
    /// Whether the controller agent is deployed on the nodes
    pub controller_enabled: bool,
    /// Deployed controller agent version
    pub controller_version: Option<String>,
    /// Optimistic concurrency token
    pub version: i64,
}

impl UniverseSnapshot {
    /// Universe without the controller agent
    #[must_use]
    pub fn new(universe_id: UniverseId, name: impl Into<String>) -> Self {
        Self {
            universe_id,
            name: name.into(),
            controller_enabled: false,
            controller_version: None,
            version: 1,
        }
    }

    /// With the controller agent deployed at `version`
    #[must_use]
    pub fn with_controller(mut self, version: impl Into<String>) -> Self {
        self.controller_enabled = true;
        self.controller_version = Some(version.into());
        self
    }

    /// Whether the deployed agent must be upgraded to `stable`
    #[inline]
    #[must_use]
    pub fn needs_controller_upgrade(&self, stable: &str) -> bool {
        self.controller_enabled && self.controller_version.as_deref() != Some(stable)
    }
}

/// Lifecycle state of a restore and of its keyspace rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestoreState {
    /// Persisted, nothing started
    Created,
    /// Subtasks running
    InProgress,
    /// All subtasks succeeded
    Success,
    /// A subtask failed
    Failure,
    /// Cancelled externally
    Aborted,
}

impl RestoreState {
    /// Terminal states are never left
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Aborted)
    }
}

impl std::fmt::Display for RestoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Persistent restore tracking record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restore {
    /// Record identifier
    pub id: RestoreId,
    /// Workflow that owns the record
    pub task_id: TaskId,
    /// Owning customer
    pub customer_id: CustomerId,
    /// Target universe
    pub universe_id: UniverseId,
    /// Current state
    pub state: RestoreState,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last state change
    pub updated_at: DateTime<Utc>,
}

impl Restore {
    /// New in-progress record for `request`
    #[must_use]
    pub fn in_progress(request: &RestoreBackupParams, task_id: TaskId) -> Self {
        let now = Utc::now();
        Self {
            id: RestoreId::new(),
            task_id,
            customer_id: request.customer_id,
            universe_id: request.universe_id,
            state: RestoreState::InProgress,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-keyspace child row of a restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreKeyspace {
    /// Row identifier
    pub id: RestoreKeyspaceId,
    /// Parent restore
    pub restore_id: RestoreId,
    /// Workflow that owns the row
    pub task_id: TaskId,
    /// Target keyspace
    pub keyspace: String,
    /// Source location
    pub storage_location: String,
    /// Current state
    pub state: RestoreState,
}

impl RestoreKeyspace {
    /// New in-progress row for one backup of `restore`
    #[must_use]
    pub fn for_backup(restore: &Restore, info: &BackupStorageInfo) -> Self {
        Self {
            id: RestoreKeyspaceId::new(),
            restore_id: restore.id,
            task_id: restore.task_id,
            keyspace: info.keyspace.clone(),
            storage_location: info.storage_location.clone(),
            state: RestoreState::InProgress,
        }
    }
}

/// Progress grouping of subtasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubTaskGroup {
    /// Controller agent upgrade
    UpgradingAgent,
    /// Backup data / key restore
    RestoringBackup,
    /// Universe bookkeeping
    ConfigureUniverse,
}

impl SubTaskGroup {
    /// Human-readable progress title
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::UpgradingAgent => "Upgrading Backup Controller",
            Self::RestoringBackup => "Restoring Backup",
            Self::ConfigureUniverse => "Configuring Universe",
        }
    }
}

/// Concrete subtask to execute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SubtaskKind {
    /// Upgrade the controller agent on every node
    UpgradeAgent {
        /// Target universe
        universe_id: UniverseId,
        /// Version to install
        version: String,
        /// Reinstall even if nodes report the version
        force: bool,
    },
    /// Restore one backup (data or keys)
    RestoreKeyspace {
        /// Narrowed request
        params: RestoreSubtaskParams,
        /// Whether the controller agent performs the restore
        controlled: bool,
    },
    /// Mark the universe update as successful
    MarkUniverseUpdateSuccess {
        /// Target universe
        universe_id: UniverseId,
    },
    /// Toggle the universe load balancer
    LoadBalancerStateChange {
        /// Target universe
        universe_id: UniverseId,
        /// Enable or disable
        enable: bool,
    },
}

impl SubtaskKind {
    /// Short name used in logs and errors
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpgradeAgent { .. } => "UpgradeAgent",
            Self::RestoreKeyspace { .. } => "RestoreKeyspace",
            Self::MarkUniverseUpdateSuccess { .. } => "MarkUniverseUpdateSuccess",
            Self::LoadBalancerStateChange { .. } => "LoadBalancerStateChange",
        }
    }
}

/// Subtask plus its progress group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubtaskDescriptor {
    /// What to run
    pub kind: SubtaskKind,
    /// Progress group
    pub group: SubTaskGroup,
}

impl SubtaskDescriptor {
    /// Create descriptor
    #[inline]
    #[must_use]
    pub fn new(kind: SubtaskKind, group: SubTaskGroup) -> Self {
        Self { kind, group }
    }

    /// Short name used in logs and errors
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

impl std::fmt::Display for SubtaskDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.kind.name(), self.group)
    }
}

/// Whether releasing the universe lock keeps the task pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskDetails {
    /// Scrub the in-progress task pointer
    #[default]
    Clear,
    /// Keep it so operators can inspect the task
    Preserve,
}

impl TaskDetails {
    /// Value of the registry's `clear_task_details` flag
    #[inline]
    #[must_use]
    pub fn clears(self) -> bool {
        matches!(self, Self::Clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RestoreBackupParams {
        RestoreBackupParams::new(CustomerId::new(), UniverseId::new(), StorageConfigId::new())
    }

    #[test]
    fn expected_version_raw_roundtrip() {
        assert_eq!(ExpectedVersion::Any.as_raw(), -1);
        assert_eq!(ExpectedVersion::from_raw(-1), ExpectedVersion::Any);
        assert_eq!(ExpectedVersion::from_raw(7), ExpectedVersion::Exact(7));
        assert!(ExpectedVersion::Any.matches(42));
        assert!(!ExpectedVersion::Exact(3).matches(4));
    }

    #[test]
    fn validate_rejects_empty_backup_list() {
        let err = request().validate().unwrap_err();
        assert!(matches!(err, RestoreError::InvalidRequest(_)));
    }

    #[test]
    fn validate_rejects_blank_keyspace() {
        let req = request().with_backup(BackupStorageInfo::new("s3://bucket/b1", " "));
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_request() {
        let req = request().with_backup(BackupStorageInfo::new("s3://bucket/b1", "orders"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn subtask_params_narrow_to_single_backup() {
        let req = request()
            .with_backup(BackupStorageInfo::new("s3://b/1", "ks1"))
            .with_backup(BackupStorageInfo::new("s3://b/2", "ks2"));
        let params = req.subtask_params(&req.backup_storage_info[1], ActionType::RestoreKeys);
        assert_eq!(params.backup_storage_info.keyspace, "ks2");
        assert_eq!(params.action_type, ActionType::RestoreKeys);
        assert_eq!(params.universe_id, req.universe_id);
    }

    #[test]
    fn controller_upgrade_detection() {
        let id = UniverseId::new();
        assert!(!UniverseSnapshot::new(id, "u").needs_controller_upgrade("1.3"));
        let snap = UniverseSnapshot::new(id, "u").with_controller("1.2");
        assert!(snap.needs_controller_upgrade("1.3"));
        assert!(!snap.needs_controller_upgrade("1.2"));

        let mut unknown = UniverseSnapshot::new(id, "u");
        unknown.controller_enabled = true;
        assert!(unknown.needs_controller_upgrade("1.3"));
    }

    #[test]
    fn request_deserializes_from_camel_case_json() {
        let json = serde_json::json!({
            "customerId": Uuid::new_v4(),
            "universeId": Uuid::new_v4(),
            "storageConfigId": Uuid::new_v4(),
            "backupStorageInfo": [
                { "storageLocation": "s3://b/1", "keyspace": "ks1", "backupType": "YSQL" }
            ],
            "category": "CONTROLLED",
            "alterLoadBalancer": true
        });
        let req: RestoreBackupParams = serde_json::from_value(json).unwrap();
        assert!(req.is_controlled());
        assert!(req.alter_load_balancer);
        assert_eq!(req.action_type, ActionType::Restore);
        assert_eq!(req.expected_universe_version, ExpectedVersion::Any);
        assert_eq!(req.backup_storage_info[0].backup_type, TableType::Ysql);
    }
}
