use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BundleError;
use crate::model::{DayStats, Doc, Note, Session, SettingEnvelope, Tag, Task};

/// Application tag every bundle must carry.
pub const APP_ID: &str = "CozyFocus";

/// Bundles written before `schemaVersion` existed.
const LEGACY_SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub schema_version: i32,
    pub exported_at: i64,
    pub app: String,
    pub data: BundleData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleData {
    pub tasks: Vec<Task>,
    pub notes: Vec<Note>,
    pub sessions: Vec<Session>,
    pub stats: Vec<DayStats>,
    pub docs: Vec<Doc>,
    pub settings: Vec<SettingEnvelope>,
    /// Absent in bundles from stores that predate the tag registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
}

impl ExportBundle {
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Re-read this bundle the way an import would.
    pub fn to_incoming(&self) -> Result<IncomingBundle, BundleError> {
        let json = self.to_json(false).map_err(BundleError::Malformed)?;
        parse_bundle(&json)
    }

    pub fn record_count(&self) -> usize {
        let d = &self.data;
        d.tasks.len()
            + d.notes.len()
            + d.sessions.len()
            + d.stats.len()
            + d.docs.len()
            + d.settings.len()
            + d.tags.as_ref().map_or(0, Vec::len)
    }
}

/// A validated bundle whose records are still raw JSON.
///
/// Records are normalized one by one during merge so a single bad entry
/// is skipped instead of failing the whole import.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingBundle {
    pub schema_version: i32,
    pub exported_at: Option<i64>,
    pub data: IncomingData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomingData {
    pub tasks: Vec<Value>,
    pub notes: Vec<Value>,
    pub sessions: Vec<Value>,
    pub stats: Vec<Value>,
    pub docs: Vec<Value>,
    pub settings: Vec<Value>,
    pub tags: Option<Vec<Value>>,
}

fn collection(data: &Map<String, Value>, name: &'static str) -> Result<Option<Vec<Value>>, BundleError> {
    match data.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.clone())),
        Some(_) => Err(BundleError::InvalidCollection(name)),
    }
}

/// Validate and split a bundle payload.
///
/// # Errors
/// Fails if the text is not JSON, is not an object, carries another
/// application's tag, or has no `data` section.
pub fn parse_bundle(text: &str) -> Result<IncomingBundle, BundleError> {
    let root: Value = serde_json::from_str(text).map_err(BundleError::Malformed)?;
    let obj = root.as_object().ok_or(BundleError::NotAnObject)?;

    match obj.get("app") {
        Some(Value::String(app)) if app == APP_ID => {}
        other => {
            return Err(BundleError::ForeignApp {
                found: other.map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
            })
        }
    }

    let data = obj
        .get("data")
        .and_then(Value::as_object)
        .ok_or(BundleError::MissingData)?;

    let schema_version = obj
        .get("schemaVersion")
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(LEGACY_SCHEMA_VERSION);
    if schema_version > crate::storage::CURRENT_SCHEMA_VERSION {
        tracing::warn!(
            schema_version,
            supported = crate::storage::CURRENT_SCHEMA_VERSION,
            "bundle is from a newer schema; importing known fields only"
        );
    }

    Ok(IncomingBundle {
        schema_version,
        exported_at: obj.get("exportedAt").and_then(Value::as_i64),
        data: IncomingData {
            tasks: collection(data, "tasks")?.unwrap_or_default(),
            notes: collection(data, "notes")?.unwrap_or_default(),
            sessions: collection(data, "sessions")?.unwrap_or_default(),
            stats: collection(data, "stats")?.unwrap_or_default(),
            docs: collection(data, "docs")?.unwrap_or_default(),
            settings: collection(data, "settings")?.unwrap_or_default(),
            tags: collection(data, "tags")?,
        },
    })
}
