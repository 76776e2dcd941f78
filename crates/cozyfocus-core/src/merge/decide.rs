//! Per-entity merge decisions.
//!
//! Every function here is pure: it compares one incoming record against
//! the local one (if any) and says what the store should end up holding.

use std::collections::HashSet;

use super::normalize::{IncomingDoc, IncomingTask};
use crate::model::{DayStats, Doc, Note, Session, SettingEnvelope, Tag, Task};

/// Outcome for a single incoming record.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<T> {
    Add(T),
    Update(T),
    Skip,
}

impl<T> Decision<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            Decision::Add(r) | Decision::Update(r) => Some(r),
            Decision::Skip => None,
        }
    }

    pub fn into_record(self) -> Option<T> {
        match self {
            Decision::Add(r) | Decision::Update(r) => Some(r),
            Decision::Skip => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Decision::Skip)
    }
}

/// Newer `updatedAt` wins; fields the bundle left out keep local values.
pub fn decide_task(local: Option<&Task>, incoming: &IncomingTask) -> Decision<Task> {
    match local {
        None => Decision::Add(incoming.record.clone()),
        Some(local) if incoming.record.updated_at > local.updated_at => {
            Decision::Update(incoming.merge_into(local))
        }
        Some(_) => Decision::Skip,
    }
}

/// Newer `updatedAt` replaces the whole note.
pub fn decide_note(local: Option<&Note>, incoming: &Note) -> Decision<Note> {
    match local {
        None => Decision::Add(incoming.clone()),
        Some(local) if incoming.updated_at > local.updated_at => Decision::Update(incoming.clone()),
        Some(_) => Decision::Skip,
    }
}

/// As tasks, but tags are unioned instead of replaced.
pub fn decide_doc(local: Option<&Doc>, incoming: &IncomingDoc) -> Decision<Doc> {
    match local {
        None => Decision::Add(incoming.record.clone()),
        Some(local) if incoming.record.updated_at > local.updated_at => {
            Decision::Update(incoming.merge_into(local))
        }
        Some(_) => Decision::Skip,
    }
}

/// A completed session is never overwritten.
pub fn decide_session(local: Option<&Session>, incoming: &Session) -> Decision<Session> {
    match local {
        None => Decision::Add(incoming.clone()),
        Some(local) if !local.completed && incoming.completed => Decision::Update(incoming.clone()),
        Some(_) => Decision::Skip,
    }
}

/// Field-wise maximum; an update only when some counter grows.
pub fn decide_stats(local: Option<&DayStats>, incoming: &DayStats) -> Decision<DayStats> {
    match local {
        None => Decision::Add(incoming.clone()),
        Some(local) => {
            let merged = local.max_merge(incoming);
            if merged == *local {
                Decision::Skip
            } else {
                Decision::Update(merged)
            }
        }
    }
}

pub fn decide_setting(
    local: Option<&SettingEnvelope>,
    incoming: &SettingEnvelope,
) -> Decision<SettingEnvelope> {
    match local {
        None => Decision::Add(incoming.clone()),
        Some(local) if incoming.updated_at > local.updated_at => Decision::Update(incoming.clone()),
        Some(_) => Decision::Skip,
    }
}

/// Tag names already present, compared case-insensitively.
///
/// Accepted tags are added as they are decided so two new names that
/// differ only by case collapse into one.
#[derive(Debug, Clone, Default)]
pub struct KnownTags(HashSet<String>);

impl KnownTags {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self(names.into_iter().map(|n| n.trim().to_lowercase()).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn decide_tag(known: &mut KnownTags, incoming: &Tag) -> Decision<Tag> {
    let name = incoming.name.trim();
    if name.is_empty() {
        return Decision::Skip;
    }
    if known.0.insert(name.to_lowercase()) {
        Decision::Add(Tag {
            name: name.to_string(),
            created_at: incoming.created_at,
        })
    } else {
        Decision::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::normalize::normalize_task;
    use crate::model::SessionType;
    use serde_json::json;

    fn task(updated_at: i64) -> Task {
        Task {
            id: "t1".into(),
            day_key: "2026-03-10".into(),
            title: "local".into(),
            completed: false,
            created_at: 1,
            updated_at,
            completed_at: None,
        }
    }

    fn note(updated_at: i64, content: &str) -> Note {
        Note {
            id: "n1".into(),
            day_key: "2026-03-10".into(),
            content: content.into(),
            updated_at,
        }
    }

    #[test]
    fn task_requires_strictly_newer_update() {
        let incoming = normalize_task(&json!({
            "id": "t1", "dayKey": "2026-03-10", "title": "remote", "updatedAt": 5
        }))
        .unwrap();

        assert!(matches!(decide_task(None, &incoming), Decision::Add(_)));
        assert!(decide_task(Some(&task(5)), &incoming).is_skip());
        assert!(decide_task(Some(&task(9)), &incoming).is_skip());

        let Decision::Update(merged) = decide_task(Some(&task(4)), &incoming) else {
            panic!("expected update");
        };
        assert_eq!(merged.title, "remote");
        assert_eq!(merged.updated_at, 5);
        assert_eq!(merged.created_at, 1);
    }

    #[test]
    fn newer_task_can_uncomplete() {
        let mut local = task(4);
        local.completed = true;
        local.completed_at = Some(4);
        let incoming = normalize_task(&json!({
            "id": "t1", "dayKey": "2026-03-10", "completed": false,
            "completedAt": null, "updatedAt": 6
        }))
        .unwrap();
        let merged = decide_task(Some(&local), &incoming).into_record().unwrap();
        assert!(!merged.completed);
        assert_eq!(merged.completed_at, None);
    }

    #[test]
    fn note_is_replaced_wholesale_when_newer() {
        assert_eq!(
            decide_note(Some(&note(1, "old")), &note(2, "new")),
            Decision::Update(note(2, "new"))
        );
        assert!(decide_note(Some(&note(2, "local")), &note(2, "same time")).is_skip());
    }

    #[test]
    fn completed_session_is_immutable() {
        let mut session = Session {
            id: "s1".into(),
            day_key: "2026-03-10".into(),
            session_type: SessionType::Focus,
            duration_ms: 1_000,
            started_at: 0,
            ended_at: 1_000,
            completed: true,
        };
        let mut pending = session.clone();
        pending.completed = false;

        assert!(decide_session(Some(&session), &pending).is_skip());
        assert!(decide_session(Some(&session), &session.clone()).is_skip());
        assert!(matches!(decide_session(Some(&pending), &session), Decision::Update(_)));

        session.id = "s2".into();
        assert!(matches!(decide_session(None, &session), Decision::Add(_)));
    }

    #[test]
    fn stats_take_fieldwise_max() {
        let local = DayStats {
            day_key: "2026-03-10".into(),
            focus_completed_count: 2,
            total_focus_ms: 3_000_000,
            ..Default::default()
        };
        let incoming = DayStats {
            day_key: "2026-03-10".into(),
            focus_completed_count: 3,
            total_focus_ms: 2_000_000,
            ..Default::default()
        };
        let merged = decide_stats(Some(&local), &incoming).into_record().unwrap();
        assert_eq!(merged.focus_completed_count, 3);
        assert_eq!(merged.total_focus_ms, 3_000_000);

        assert!(decide_stats(Some(&merged), &incoming).is_skip());
        assert!(decide_stats(Some(&merged), &local).is_skip());
    }

    #[test]
    fn tags_collapse_case_insensitively() {
        let mut known = KnownTags::new(["Work"]);
        let tag = |name: &str| Tag {
            name: name.into(),
            created_at: 0,
        };
        assert!(decide_tag(&mut known, &tag("work")).is_skip());
        assert!(decide_tag(&mut known, &tag("   ")).is_skip());
        assert!(matches!(decide_tag(&mut known, &tag(" Deep ")), Decision::Add(ref t) if t.name == "Deep"));
        assert!(decide_tag(&mut known, &tag("DEEP")).is_skip());
        assert_eq!(known.len(), 2);
    }
}
