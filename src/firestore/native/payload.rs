//! Plain data shapes exchanged with native engines, outside of filters and
//! orderings (those live with the query modifiers).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::firestore::native::type_map::WireValue;

/// Cache and pending-write flags, carried as `[fromCache, hasPendingWrites]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeMetadata(pub bool, pub bool);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeDocumentSnapshot {
    pub path: String,
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub metadata: NativeMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, WireValue>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeChangeType {
    #[serde(rename = "a", alias = "added")]
    Added,
    #[serde(rename = "m", alias = "modified")]
    Modified,
    #[serde(rename = "r", alias = "removed")]
    Removed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeDocumentChange {
    #[serde(rename = "type")]
    pub change_type: NativeChangeType,
    pub doc: NativeDocumentSnapshot,
    #[serde(rename = "ni", default = "absent_index")]
    pub new_index: i64,
    #[serde(rename = "oi", default = "absent_index")]
    pub old_index: i64,
    #[serde(default)]
    pub is_metadata_change: bool,
}

fn absent_index() -> i64 {
    -1
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeQuerySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub excludes_metadata_changes: bool,
    #[serde(default)]
    pub changes: Vec<NativeDocumentChange>,
    #[serde(default)]
    pub documents: Vec<NativeDocumentSnapshot>,
    #[serde(default)]
    pub metadata: NativeMetadata,
}

/// `{code, message}` error body reported by the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Merge behaviour forwarded with `SET` writes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeSetOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_fields: Option<Vec<String>>,
}

impl NativeSetOptions {
    pub fn is_empty(&self) -> bool {
        self.merge.is_none() && self.merge_fields.is_none()
    }
}

/// One buffered write, shared by batches and transactions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum WriteCommand {
    Set {
        path: String,
        data: BTreeMap<String, WireValue>,
        #[serde(default)]
        options: NativeSetOptions,
    },
    Update {
        path: String,
        data: BTreeMap<String, WireValue>,
    },
    Delete {
        path: String,
    },
}

impl WriteCommand {
    pub fn path(&self) -> &str {
        match self {
            WriteCommand::Set { path, .. }
            | WriteCommand::Update { path, .. }
            | WriteCommand::Delete { path } => path,
        }
    }
}

/// Where a one-off read is served from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Default,
    Server,
    Cache,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOptions {
    #[serde(default)]
    pub source: Source,
}

impl GetOptions {
    pub fn from_source(source: Source) -> Self {
        Self { source }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotListenOptions {
    #[serde(default)]
    pub include_metadata_changes: bool,
}

impl SnapshotListenOptions {
    pub fn include_metadata_changes() -> Self {
        Self {
            include_metadata_changes: true,
        }
    }
}

/// `collectionCount` result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCountResult {
    pub count: u64,
}

/// Engine settings forwarded by `Firestore::settings`. Unset keys are omitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_size_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_timestamp_behavior: Option<String>,
}

impl NativeSettings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_commands_use_uppercase_type() {
        let command = WriteCommand::Delete {
            path: "users/alice".into(),
        };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({"type": "DELETE", "path": "users/alice"})
        );

        let set = WriteCommand::Set {
            path: "users/bob".into(),
            data: BTreeMap::new(),
            options: NativeSetOptions {
                merge: Some(true),
                merge_fields: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!({"type": "SET", "path": "users/bob", "data": {}, "options": {"merge": true}})
        );
    }

    #[test]
    fn query_snapshot_parses_engine_layout() {
        let raw = json!({
            "source": "get",
            "excludesMetadataChanges": true,
            "metadata": [false, true],
            "documents": [{"path": "users/a", "exists": true, "metadata": [false, false], "data": {"n": [17, 1]}}],
            "changes": [{
                "type": "a",
                "isMetadataChange": false,
                "ni": 0,
                "oi": -1,
                "doc": {"path": "users/a", "exists": true, "metadata": [false, false], "data": {}}
            }]
        });
        let snapshot: NativeQuerySnapshot = serde_json::from_value(raw).unwrap();
        assert!(snapshot.excludes_metadata_changes);
        assert_eq!(snapshot.metadata, NativeMetadata(false, true));
        assert_eq!(snapshot.documents.len(), 1);
        assert_eq!(snapshot.changes[0].change_type, NativeChangeType::Added);
        assert_eq!(snapshot.changes[0].old_index, -1);
    }

    #[test]
    fn get_options_serialize_source() {
        let options = GetOptions::from_source(Source::Cache);
        assert_eq!(serde_json::to_value(options).unwrap(), json!({"source": "cache"}));
    }
}
