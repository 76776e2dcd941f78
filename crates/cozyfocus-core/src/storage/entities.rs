//! Typed entity operations used by the interactive layer.
//!
//! Every mutation bumps `updatedAt` so later imports can tell which side
//! is newer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::database::Database;
use crate::clock::Clock;
use crate::error::{Result, ValidationError};
use crate::model::{
    normalize_tags, setting_keys, CurrentFocus, Doc, MediaPlayerSetting, Note, PomodoroDefaults,
    SettingEnvelope, Tag, Task, TimeFormat,
};

/// Partial update for a task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct DocPatch {
    pub title: Option<String>,
    pub markdown: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Next `updatedAt`: the clock, but never at or behind the previous value.
fn bump(clock: &dyn Clock, previous: i64) -> i64 {
    clock.now_ms().max(previous + 1)
}

fn not_found(collection: &'static str, id: &str) -> ValidationError {
    ValidationError::NotFound {
        collection,
        id: id.to_string(),
    }
}

impl Database {
    // === Tasks ===

    pub fn create_task(&self, clock: &dyn Clock, day_key: &str, title: &str) -> Result<Task> {
        let now = clock.now_ms();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            day_key: day_key.to_string(),
            title: title.trim().to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        self.tasks().put(&task)?;
        Ok(task)
    }

    pub fn patch_task(&self, clock: &dyn Clock, id: &str, patch: TaskPatch) -> Result<Task> {
        let mut task = self.tasks().get(id)?.ok_or_else(|| not_found("task", id))?;
        let now = bump(clock, task.updated_at);
        if let Some(title) = patch.title {
            task.title = title.trim().to_string();
        }
        if let Some(completed) = patch.completed {
            if completed != task.completed {
                task.completed = completed;
                task.completed_at = completed.then_some(now);
            }
        }
        task.updated_at = now;
        self.tasks().put(&task)?;
        Ok(task)
    }

    pub fn toggle_task(&self, clock: &dyn Clock, id: &str) -> Result<Task> {
        let current = self.tasks().get(id)?.ok_or_else(|| not_found("task", id))?;
        self.patch_task(
            clock,
            id,
            TaskPatch {
                completed: Some(!current.completed),
                ..Default::default()
            },
        )
    }

    /// Delete a task, clearing the day's focus pointer if it referenced it.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let Some(task) = self.tasks().get(id)? else {
            return Ok(false);
        };
        if self.current_focus(&task.day_key)?.as_deref() == Some(id) {
            self.settings()
                .delete(&setting_keys::current_focus(&task.day_key))?;
        }
        Ok(self.tasks().delete(id)?)
    }

    /// Tasks of one day in creation order.
    pub fn list_tasks(&self, day_key: &str) -> Result<Vec<Task>> {
        let mut tasks = self.tasks().get_all(Some(day_key))?;
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    // === Notes ===

    pub fn create_note(&self, clock: &dyn Clock, day_key: &str, content: &str) -> Result<Note> {
        let note = Note {
            id: Uuid::new_v4().to_string(),
            day_key: day_key.to_string(),
            content: content.to_string(),
            updated_at: self.note_stamp.next(clock),
        };
        self.notes().put(&note)?;
        Ok(note)
    }

    pub fn update_note(&self, clock: &dyn Clock, id: &str, content: &str) -> Result<Note> {
        let mut note = self.notes().get(id)?.ok_or_else(|| not_found("note", id))?;
        note.content = content.to_string();
        note.updated_at = self.note_stamp.next(clock).max(note.updated_at + 1);
        self.notes().put(&note)?;
        Ok(note)
    }

    /// Notes of one day, most recently edited first.
    pub fn list_notes(&self, day_key: &str) -> Result<Vec<Note>> {
        let mut notes = self.notes().get_all(Some(day_key))?;
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    // === Docs ===

    pub fn create_doc(
        &self,
        clock: &dyn Clock,
        day_key: &str,
        title: &str,
        markdown: &str,
        tags: &[String],
    ) -> Result<Doc> {
        let now = clock.now_ms();
        let doc = Doc {
            id: Uuid::new_v4().to_string(),
            day_key: day_key.to_string(),
            title: title.trim().to_string(),
            markdown: markdown.to_string(),
            tags: normalize_tags(tags),
            created_at: now,
            updated_at: now,
        };
        for tag in &doc.tags {
            self.ensure_tag(clock, tag)?;
        }
        self.docs().put(&doc)?;
        Ok(doc)
    }

    pub fn patch_doc(&self, clock: &dyn Clock, id: &str, patch: DocPatch) -> Result<Doc> {
        let mut doc = self.docs().get(id)?.ok_or_else(|| not_found("doc", id))?;
        if let Some(title) = patch.title {
            doc.title = title.trim().to_string();
        }
        if let Some(markdown) = patch.markdown {
            doc.markdown = markdown;
        }
        if let Some(tags) = patch.tags {
            doc.tags = normalize_tags(&tags);
            for tag in &doc.tags {
                self.ensure_tag(clock, tag)?;
            }
        }
        doc.updated_at = bump(clock, doc.updated_at);
        self.docs().put(&doc)?;
        Ok(doc)
    }

    /// Docs carrying a tag, compared case-insensitively, newest first.
    pub fn docs_with_tag(&self, tag: &str) -> Result<Vec<Doc>> {
        let wanted = tag.trim().to_lowercase();
        let mut docs: Vec<Doc> = self
            .docs()
            .get_all(None)?
            .into_iter()
            .filter(|d| d.tags.iter().any(|t| t.to_lowercase() == wanted))
            .collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(docs)
    }

    // === Tags ===

    /// Register a tag unless one with the same name (ignoring case) exists.
    ///
    /// Returns the new tag, or `None` if nothing was created.
    pub fn ensure_tag(&self, clock: &dyn Clock, name: &str) -> Result<Option<Tag>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let wanted = name.to_lowercase();
        let exists = self
            .tags()
            .get_all(None)?
            .iter()
            .any(|t| t.name.to_lowercase() == wanted);
        if exists {
            return Ok(None);
        }
        let tag = Tag {
            name: name.to_string(),
            created_at: clock.now_ms(),
        };
        self.tags().put(&tag)?;
        Ok(Some(tag))
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags = self.tags().get_all(None)?;
        tags.sort_by_key(|t| t.name.to_lowercase());
        Ok(tags)
    }

    // === Settings ===

    pub fn get_setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(envelope) = self.settings().get(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(envelope.value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable setting");
                Ok(None)
            }
        }
    }

    /// Upsert a setting; the latest write wins.
    pub fn put_setting<T: Serialize>(&self, clock: &dyn Clock, key: &str, value: &T) -> Result<()> {
        let previous = self.settings().get(key)?.map(|s| s.updated_at).unwrap_or(0);
        let envelope = SettingEnvelope {
            key: key.to_string(),
            value: serde_json::to_value(value)?,
            updated_at: bump(clock, previous),
        };
        self.settings().put(&envelope)?;
        Ok(())
    }

    pub fn pomodoro_defaults(&self) -> Result<PomodoroDefaults> {
        Ok(self
            .get_setting(setting_keys::POMODORO_DEFAULTS)?
            .unwrap_or_default())
    }

    pub fn set_pomodoro_defaults(&self, clock: &dyn Clock, defaults: PomodoroDefaults) -> Result<()> {
        if !defaults.is_valid() {
            return Err(ValidationError::InvalidValue {
                field: "pomodoro.defaults".into(),
                message: "durations must be at least one minute".into(),
            }
            .into());
        }
        self.put_setting(clock, setting_keys::POMODORO_DEFAULTS, &defaults)
    }

    pub fn time_format(&self) -> Result<TimeFormat> {
        Ok(self.get_setting(setting_keys::TIME_FORMAT)?.unwrap_or_default())
    }

    pub fn set_time_format(&self, clock: &dyn Clock, format: TimeFormat) -> Result<()> {
        self.put_setting(clock, setting_keys::TIME_FORMAT, &format)
    }

    pub fn media_player(&self) -> Result<Option<MediaPlayerSetting>> {
        self.get_setting(setting_keys::MEDIA_PLAYER)
    }

    pub fn set_media_player(&self, clock: &dyn Clock, setting: &MediaPlayerSetting) -> Result<()> {
        self.put_setting(clock, setting_keys::MEDIA_PLAYER, setting)
    }

    /// Task the user is focusing on for a day.
    pub fn current_focus(&self, day_key: &str) -> Result<Option<String>> {
        Ok(self
            .get_setting::<CurrentFocus>(&setting_keys::current_focus(day_key))?
            .map(|f| f.task_id))
    }

    pub fn set_current_focus(
        &self,
        clock: &dyn Clock,
        day_key: &str,
        task_id: Option<&str>,
    ) -> Result<()> {
        let key = setting_keys::current_focus(day_key);
        match task_id {
            Some(task_id) => {
                if self.tasks().get(task_id)?.is_none() {
                    return Err(not_found("task", task_id).into());
                }
                self.put_setting(
                    clock,
                    &key,
                    &CurrentFocus {
                        day_key: day_key.to_string(),
                        task_id: task_id.to_string(),
                    },
                )
            }
            None => {
                self.settings().delete(&key)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const DAY: &str = "2026-03-10";

    #[test]
    fn patch_task_bumps_updated_at_and_tracks_completion() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(1_000);
        let task = db.create_task(&clock, DAY, "  Write report ").unwrap();
        assert_eq!(task.title, "Write report");

        // Same millisecond: updatedAt still moves forward.
        let done = db.toggle_task(&clock, &task.id).unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(1_001));
        assert_eq!(done.updated_at, 1_001);

        clock.set(5_000);
        let undone = db.toggle_task(&clock, &task.id).unwrap();
        assert!(!undone.completed);
        assert_eq!(undone.completed_at, None);
        assert_eq!(undone.updated_at, 5_000);
    }

    #[test]
    fn patch_missing_task_is_not_found() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(0);
        let err = db
            .patch_task(&clock, "nope", TaskPatch::default())
            .unwrap_err();
        assert!(err.to_string().contains("task 'nope' not found"));
    }

    #[test]
    fn notes_created_in_same_tick_are_strictly_ordered() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(42);
        let a = db.create_note(&clock, DAY, "first").unwrap();
        let b = db.create_note(&clock, DAY, "second").unwrap();
        assert!(b.updated_at > a.updated_at);

        let listed = db.list_notes(DAY).unwrap();
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);
    }

    #[test]
    fn doc_tags_are_normalized_and_registered_once() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(10);
        db.ensure_tag(&clock, "Work").unwrap();
        let doc = db
            .create_doc(
                &clock,
                DAY,
                "Plan",
                "# plan",
                &["work".to_string(), "ideas".to_string(), "ideas ".to_string()],
            )
            .unwrap();
        assert_eq!(doc.tags, vec!["ideas".to_string(), "work".to_string()]);

        let names: Vec<_> = db.list_tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["ideas".to_string(), "Work".to_string()]);

        assert_eq!(db.docs_with_tag("WORK").unwrap().len(), 1);
    }

    #[test]
    fn ensure_tag_ignores_blank_names() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(10);
        assert!(db.ensure_tag(&clock, "   ").unwrap().is_none());
        assert_eq!(db.tags().count().unwrap(), 0);
    }

    #[test]
    fn current_focus_round_trip_and_cleared_on_delete() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(10);
        let task = db.create_task(&clock, DAY, "Deep work").unwrap();

        db.set_current_focus(&clock, DAY, Some(&task.id)).unwrap();
        assert_eq!(db.current_focus(DAY).unwrap().as_deref(), Some(task.id.as_str()));

        assert!(db.delete_task(&task.id).unwrap());
        assert!(db.current_focus(DAY).unwrap().is_none());
    }

    #[test]
    fn settings_default_when_absent() {
        let db = Database::open_memory().unwrap();
        let clock = ManualClock::new(10);
        assert_eq!(db.pomodoro_defaults().unwrap(), PomodoroDefaults::default());
        assert_eq!(db.time_format().unwrap(), TimeFormat::TwentyFourHour);

        db.set_time_format(&clock, TimeFormat::TwelveHour).unwrap();
        assert_eq!(db.time_format().unwrap(), TimeFormat::TwelveHour);

        let zero = PomodoroDefaults {
            focus: 0,
            ..Default::default()
        };
        assert!(db.set_pomodoro_defaults(&clock, zero).is_err());
    }
}
