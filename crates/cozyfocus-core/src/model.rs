//! Entity types shared by storage, export and merge.
//!
//! Field names serialize in camelCase because these structs are also the
//! export bundle wire format. Timestamps are epoch milliseconds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub day_key: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// Set while `completed` is true.
    #[serde(default)]
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub day_key: String,
    #[serde(default)]
    pub content: String,
    /// Sole ordering key; strictly increasing across notes.
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doc {
    pub id: String,
    pub day_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        !matches!(self, SessionType::Focus)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Focus => "focus",
            SessionType::ShortBreak => "shortBreak",
            SessionType::LongBreak => "longBreak",
        }
    }
}

impl std::str::FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(SessionType::Focus),
            "shortBreak" | "short-break" | "short" => Ok(SessionType::ShortBreak),
            "longBreak" | "long-break" | "long" => Ok(SessionType::LongBreak),
            other => Err(format!("unknown session type: {other}")),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub day_key: String,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub duration_ms: u64,
    pub started_at: i64,
    pub ended_at: i64,
    /// Only completed sessions are persisted locally.
    #[serde(default = "default_true")]
    pub completed: bool,
}

/// Per-day accumulated counters.
///
/// Counters only grow within a day; the only way down is an explicit reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub day_key: String,
    #[serde(default)]
    pub focus_completed_count: u64,
    #[serde(default)]
    pub short_break_completed_count: u64,
    #[serde(default)]
    pub long_break_completed_count: u64,
    #[serde(default)]
    pub total_focus_ms: u64,
    #[serde(default)]
    pub total_break_ms: u64,
}

impl DayStats {
    pub fn empty(day_key: impl Into<String>) -> Self {
        Self {
            day_key: day_key.into(),
            ..Default::default()
        }
    }

    /// Account one completed session.
    pub fn record(&mut self, session_type: SessionType, duration_ms: u64) {
        match session_type {
            SessionType::Focus => {
                self.focus_completed_count += 1;
                self.total_focus_ms = self.total_focus_ms.saturating_add(duration_ms);
            }
            SessionType::ShortBreak => {
                self.short_break_completed_count += 1;
                self.total_break_ms = self.total_break_ms.saturating_add(duration_ms);
            }
            SessionType::LongBreak => {
                self.long_break_completed_count += 1;
                self.total_break_ms = self.total_break_ms.saturating_add(duration_ms);
            }
        }
    }

    /// Field-wise maximum against another snapshot of the same day.
    ///
    /// Each field is maximized independently, so the result can combine
    /// values that never coexisted in either input.
    pub fn max_merge(&self, other: &DayStats) -> DayStats {
        DayStats {
            day_key: self.day_key.clone(),
            focus_completed_count: self.focus_completed_count.max(other.focus_completed_count),
            short_break_completed_count: self
                .short_break_completed_count
                .max(other.short_break_completed_count),
            long_break_completed_count: self
                .long_break_completed_count
                .max(other.long_break_completed_count),
            total_focus_ms: self.total_focus_ms.max(other.total_focus_ms),
            total_break_ms: self.total_break_ms.max(other.total_break_ms),
        }
    }

    pub fn completed_count(&self) -> u64 {
        self.focus_completed_count + self.short_break_completed_count + self.long_break_completed_count
    }
}

/// A keyed setting as stored locally and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingEnvelope {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub updated_at: i64,
}

/// Well-known setting keys.
pub mod setting_keys {
    pub const MEDIA_PLAYER: &str = "mediaPlayer";
    pub const POMODORO_DEFAULTS: &str = "pomodoro.defaults";
    pub const TIME_FORMAT: &str = "ui.timeFormat";
    pub const CURRENT_FOCUS_PREFIX: &str = "tasks.currentFocus.";

    pub fn current_focus(day_key: &str) -> String {
        format!("{CURRENT_FOCUS_PREFIX}{day_key}")
    }
}

/// Per-mode default durations, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroDefaults {
    pub focus: u32,
    pub short_break: u32,
    pub long_break: u32,
}

impl PomodoroDefaults {
    /// Every mode lasts at least one minute.
    pub fn is_valid(&self) -> bool {
        self.focus > 0 && self.short_break > 0 && self.long_break > 0
    }
}

impl Default for PomodoroDefaults {
    fn default() -> Self {
        Self {
            focus: 25,
            short_break: 5,
            long_break: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPlayerSetting {
    pub raw_input: String,
    pub embed_url: String,
    pub platform_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentFocus {
    pub day_key: String,
    pub task_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
}

impl std::str::FromStr for TimeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "12h" | "12" => Ok(TimeFormat::TwelveHour),
            "24h" | "24" => Ok(TimeFormat::TwentyFourHour),
            other => Err(format!("unknown time format: {other}")),
        }
    }
}

/// Trim, drop empties and sort a tag list, deduping case-insensitively.
///
/// The first spelling of a tag wins, so existing tags listed first keep
/// their case.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut by_key = std::collections::BTreeMap::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        by_key
            .entry(tag.to_lowercase())
            .or_insert_with(|| tag.to_string());
    }
    by_key.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_serializes_type_field() {
        let session = Session {
            id: "s1".into(),
            day_key: "2026-03-10".into(),
            session_type: SessionType::ShortBreak,
            duration_ms: 300_000,
            started_at: 1,
            ended_at: 300_001,
            completed: true,
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["type"], "shortBreak");
        assert_eq!(json["dayKey"], "2026-03-10");
        assert_eq!(json["durationMs"], 300_000);
    }

    #[test]
    fn session_completed_defaults_to_true() {
        let session: Session = serde_json::from_str(
            r#"{"id":"s","dayKey":"2026-01-01","type":"focus","durationMs":1,"startedAt":0,"endedAt":1}"#,
        )
        .unwrap();
        assert!(session.completed);
    }

    #[test]
    fn record_routes_durations_by_type() {
        let mut stats = DayStats::empty("2026-03-10");
        stats.record(SessionType::Focus, 1_500_000);
        stats.record(SessionType::ShortBreak, 300_000);
        stats.record(SessionType::LongBreak, 900_000);
        assert_eq!(stats.focus_completed_count, 1);
        assert_eq!(stats.short_break_completed_count, 1);
        assert_eq!(stats.long_break_completed_count, 1);
        assert_eq!(stats.total_focus_ms, 1_500_000);
        assert_eq!(stats.total_break_ms, 1_200_000);
        assert_eq!(stats.completed_count(), 3);
    }

    #[test]
    fn max_merge_is_field_wise() {
        let local = DayStats {
            focus_completed_count: 2,
            total_focus_ms: 3_000_000,
            ..DayStats::empty("d")
        };
        let incoming = DayStats {
            focus_completed_count: 3,
            total_focus_ms: 2_000_000,
            ..DayStats::empty("d")
        };
        let merged = local.max_merge(&incoming);
        assert_eq!(merged.focus_completed_count, 3);
        assert_eq!(merged.total_focus_ms, 3_000_000);
    }

    #[test]
    fn normalize_tags_dedupes_and_sorts() {
        assert_eq!(
            normalize_tags(["work", " brainstorm ", "work", ""]),
            vec!["brainstorm".to_string(), "work".to_string()]
        );
    }

    #[test]
    fn normalize_tags_ignores_case_and_keeps_first_spelling() {
        assert_eq!(
            normalize_tags(["Work", "work", "brainstorm", "WORK"]),
            vec!["brainstorm".to_string(), "Work".to_string()]
        );
    }

    #[test]
    fn zero_minute_defaults_are_invalid() {
        assert!(PomodoroDefaults::default().is_valid());
        let zero = PomodoroDefaults {
            short_break: 0,
            ..Default::default()
        };
        assert!(!zero.is_valid());
    }

    #[test]
    fn time_format_wire_values() {
        assert_eq!(serde_json::to_value(TimeFormat::TwelveHour).unwrap(), "12h");
        assert_eq!("24h".parse::<TimeFormat>().unwrap(), TimeFormat::TwentyFourHour);
    }
}
