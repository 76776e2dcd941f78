//! Raw bundle records to typed incoming records.
//!
//! Exports from older app versions may omit ids or fields, so tasks, notes
//! and docs are read into partial structs first. A record that cannot be
//! turned into something keyed yields `None` and is counted as skipped.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::model::{normalize_tags, DayStats, Doc, Note, Session, Tag, Task};

/// Characters of title or content hashed into a legacy id.
const LEGACY_TEXT_PREFIX: usize = 64;

/// Distinguishes an explicit `null` from a missing field.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Deterministic id for a record exported before ids existed.
///
/// The same day, text and creation time always give the same id, so
/// re-importing an old bundle does not duplicate its records.
pub fn legacy_id(entity: &str, day_key: &str, text: &str, created_at: Option<i64>) -> String {
    let prefix: String = text.trim().chars().take(LEGACY_TEXT_PREFIX).collect();
    let created = created_at.map(|c| c.to_string()).unwrap_or_default();
    let digest = Sha256::digest(format!("{day_key}|{prefix}|{created}").as_bytes());
    format!("legacy-{entity}-{}", &hex::encode(digest)[..16])
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFields {
    pub id: Option<String>,
    pub day_key: Option<String>,
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub completed_at: Option<Option<i64>>,
}

/// A task as it would be added, plus the fields the bundle actually set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingTask {
    pub record: Task,
    pub fields: TaskFields,
}

impl IncomingTask {
    /// Overlay the fields present in the bundle onto a local task.
    pub fn merge_into(&self, local: &Task) -> Task {
        let f = &self.fields;
        let completed = f.completed.unwrap_or(local.completed);
        let mut completed_at = f.completed_at.unwrap_or(local.completed_at);
        if completed && completed_at.is_none() {
            completed_at = Some(self.record.updated_at);
        }
        Task {
            id: local.id.clone(),
            day_key: f.day_key.clone().unwrap_or_else(|| local.day_key.clone()),
            title: f.title.clone().unwrap_or_else(|| local.title.clone()),
            completed,
            created_at: f.created_at.unwrap_or(local.created_at),
            updated_at: self.record.updated_at,
            completed_at,
        }
    }
}

pub fn normalize_task(raw: &Value) -> Option<IncomingTask> {
    let fields: TaskFields = serde_json::from_value(raw.clone()).ok()?;
    let day_key = non_empty(fields.day_key.as_deref())?;
    let title = fields.title.clone().unwrap_or_default();
    let id = non_empty(fields.id.as_deref())
        .unwrap_or_else(|| legacy_id("task", &day_key, &title, fields.created_at));
    let created_at = fields.created_at.or(fields.updated_at).unwrap_or(0);
    let updated_at = fields.updated_at.unwrap_or(created_at);
    let completed = fields.completed.unwrap_or(false);
    let completed_at = fields
        .completed_at
        .flatten()
        .or_else(|| completed.then_some(updated_at));

    Some(IncomingTask {
        record: Task {
            id,
            day_key,
            title,
            completed,
            created_at,
            updated_at,
            completed_at,
        },
        fields,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteFields {
    id: Option<String>,
    day_key: Option<String>,
    content: Option<String>,
    created_at: Option<i64>,
    updated_at: Option<i64>,
}

/// Notes are replaced wholesale, so only the full record is kept.
pub fn normalize_note(raw: &Value) -> Option<Note> {
    let fields: NoteFields = serde_json::from_value(raw.clone()).ok()?;
    let day_key = non_empty(fields.day_key.as_deref())?;
    let content = fields.content.unwrap_or_default();
    let stamp = fields.created_at.or(fields.updated_at);
    let id = non_empty(fields.id.as_deref())
        .unwrap_or_else(|| legacy_id("note", &day_key, &content, stamp));

    Some(Note {
        id,
        day_key,
        content,
        updated_at: fields.updated_at.or(fields.created_at).unwrap_or(0),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocFields {
    pub id: Option<String>,
    pub day_key: Option<String>,
    pub title: Option<String>,
    pub markdown: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingDoc {
    pub record: Doc,
    pub fields: DocFields,
}

impl IncomingDoc {
    /// Overlay present fields onto a local doc; tags are the union of both.
    pub fn merge_into(&self, local: &Doc) -> Doc {
        let f = &self.fields;
        let incoming_tags = f.tags.iter().flatten();
        Doc {
            id: local.id.clone(),
            day_key: f.day_key.clone().unwrap_or_else(|| local.day_key.clone()),
            title: f.title.clone().unwrap_or_else(|| local.title.clone()),
            markdown: f.markdown.clone().unwrap_or_else(|| local.markdown.clone()),
            tags: normalize_tags(local.tags.iter().chain(incoming_tags)),
            created_at: f.created_at.unwrap_or(local.created_at),
            updated_at: self.record.updated_at,
        }
    }
}

pub fn normalize_doc(raw: &Value) -> Option<IncomingDoc> {
    let fields: DocFields = serde_json::from_value(raw.clone()).ok()?;
    let day_key = non_empty(fields.day_key.as_deref())?;
    let title = fields.title.clone().unwrap_or_default();
    let id = non_empty(fields.id.as_deref())
        .unwrap_or_else(|| legacy_id("doc", &day_key, &title, fields.created_at));
    let created_at = fields.created_at.or(fields.updated_at).unwrap_or(0);

    Some(IncomingDoc {
        record: Doc {
            id,
            day_key,
            title,
            markdown: fields.markdown.clone().unwrap_or_default(),
            tags: normalize_tags(fields.tags.iter().flatten()),
            created_at,
            updated_at: fields.updated_at.unwrap_or(created_at),
        },
        fields,
    })
}

pub fn normalize_session(raw: &Value) -> Option<Session> {
    let session: Session = serde_json::from_value(raw.clone()).ok()?;
    if session.id.trim().is_empty() || session.day_key.trim().is_empty() {
        return None;
    }
    Some(session)
}

pub fn normalize_stats(raw: &Value) -> Option<DayStats> {
    let stats: DayStats = serde_json::from_value(raw.clone()).ok()?;
    if stats.day_key.trim().is_empty() {
        return None;
    }
    Some(stats)
}

/// Tags may be full records or, in old exports, bare names.
pub fn normalize_tag(raw: &Value) -> Option<Tag> {
    let tag = match raw {
        Value::String(name) => Tag {
            name: name.clone(),
            created_at: 0,
        },
        other => serde_json::from_value(other.clone()).ok()?,
    };
    let name = non_empty(Some(tag.name.as_str()))?;
    Some(Tag { name, ..tag })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_ids_are_stable_and_prefixed() {
        let a = legacy_id("task", "2026-03-10", "write report", Some(100));
        let b = legacy_id("task", "2026-03-10", "write report", Some(100));
        let c = legacy_id("task", "2026-03-10", "write report", Some(101));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("legacy-task-"));
        assert_eq!(a.len(), "legacy-task-".len() + 16);
    }

    #[test]
    fn task_without_id_gets_legacy_id() {
        let raw = json!({"dayKey": "2026-03-10", "title": "old", "createdAt": 5});
        let task = normalize_task(&raw).unwrap();
        assert!(task.record.id.starts_with("legacy-task-"));
        assert_eq!(task.record.updated_at, 5);
        assert!(!task.record.completed);
    }

    #[test]
    fn task_without_day_is_rejected() {
        assert!(normalize_task(&json!({"id": "t1", "title": "x"})).is_none());
        assert!(normalize_task(&json!("not a task")).is_none());
    }

    #[test]
    fn explicit_null_completed_at_clears_local_value() {
        let local = Task {
            id: "t1".into(),
            day_key: "2026-03-10".into(),
            title: "local".into(),
            completed: true,
            created_at: 1,
            updated_at: 2,
            completed_at: Some(2),
        };
        let cleared = normalize_task(&json!({
            "id": "t1", "dayKey": "2026-03-10", "completed": false,
            "completedAt": null, "updatedAt": 3
        }))
        .unwrap();
        let merged = cleared.merge_into(&local);
        assert!(!merged.completed);
        assert_eq!(merged.completed_at, None);
        assert_eq!(merged.title, "local");

        let untouched = normalize_task(&json!({"id": "t1", "dayKey": "2026-03-10", "updatedAt": 3}))
            .unwrap()
            .merge_into(&local);
        assert_eq!(untouched.completed_at, Some(2));
        assert!(untouched.completed);
    }

    #[test]
    fn completed_task_without_timestamp_uses_updated_at() {
        let local = Task {
            id: "t1".into(),
            day_key: "2026-03-10".into(),
            title: "local".into(),
            completed: false,
            created_at: 1,
            updated_at: 2,
            completed_at: None,
        };
        let incoming = normalize_task(&json!({
            "id": "t1", "dayKey": "2026-03-10", "completed": true, "updatedAt": 8
        }))
        .unwrap();
        assert_eq!(incoming.record.completed_at, Some(8));

        let merged = incoming.merge_into(&local);
        assert!(merged.completed);
        assert_eq!(merged.completed_at, Some(8));

        let done_locally = Task {
            completed: true,
            completed_at: Some(4),
            ..local
        };
        assert_eq!(incoming.merge_into(&done_locally).completed_at, Some(4));
    }

    #[test]
    fn note_prefers_updated_at_for_ordering() {
        let note = normalize_note(&json!({"dayKey": "2026-03-10", "content": "hi", "createdAt": 1, "updatedAt": 9}))
            .unwrap();
        assert_eq!(note.updated_at, 9);
        assert!(note.id.starts_with("legacy-note-"));
    }

    #[test]
    fn doc_merge_unions_tags() {
        let local = Doc {
            id: "d1".into(),
            day_key: "2026-03-10".into(),
            title: "Plan".into(),
            markdown: "old".into(),
            tags: vec!["work".into()],
            created_at: 1,
            updated_at: 1,
        };
        let incoming = normalize_doc(&json!({
            "id": "d1", "dayKey": "2026-03-10", "markdown": "new",
            "tags": ["work", "brainstorm"], "updatedAt": 2
        }))
        .unwrap();
        let merged = incoming.merge_into(&local);
        assert_eq!(merged.tags, vec!["brainstorm".to_string(), "work".to_string()]);
        assert_eq!(merged.markdown, "new");
        assert_eq!(merged.title, "Plan");
    }

    #[test]
    fn tags_accept_bare_names_and_reject_blank() {
        assert_eq!(normalize_tag(&json!("  focus ")).unwrap().name, "focus");
        assert_eq!(normalize_tag(&json!({"name": "Deep", "createdAt": 3})).unwrap().created_at, 3);
        assert!(normalize_tag(&json!({"name": "   "})).is_none());
        assert!(normalize_tag(&json!(7)).is_none());
    }

    #[test]
    fn sessions_and_stats_need_keys() {
        assert!(normalize_session(&json!({
            "id": "", "dayKey": "2026-03-10", "type": "focus",
            "durationMs": 1, "startedAt": 0, "endedAt": 1
        }))
        .is_none());
        assert!(normalize_stats(&json!({"focusCompletedCount": 1})).is_none());
        assert_eq!(
            normalize_stats(&json!({"dayKey": "2026-03-10", "totalFocusMs": 5})).unwrap().total_focus_ms,
            5
        );
    }
}
