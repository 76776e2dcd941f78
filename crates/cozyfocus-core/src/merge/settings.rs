//! Setting key resolution.
//!
//! Current exports carry `{ key, value, updatedAt }` envelopes. Older ones
//! stored bare setting objects, so the key has to be recognized from the
//! object's shape. Recognizers run in order and the first hit wins.

use serde_json::{Map, Value};

use crate::model::{setting_keys, SettingEnvelope};

/// Returns the setting key a record belongs to, if it recognizes the shape.
pub type Recognizer = fn(&Map<String, Value>) -> Option<String>;

/// The object a shape recognizer inspects: the nested `value` when present.
fn payload(record: &Map<String, Value>) -> &Map<String, Value> {
    record
        .get("value")
        .and_then(Value::as_object)
        .unwrap_or(record)
}

fn has_numbers(obj: &Map<String, Value>, fields: &[&str]) -> bool {
    fields.iter().all(|f| obj.get(*f).is_some_and(Value::is_number))
}

fn has_strings(obj: &Map<String, Value>, fields: &[&str]) -> bool {
    fields.iter().all(|f| obj.get(*f).is_some_and(Value::is_string))
}

fn explicit_key(record: &Map<String, Value>) -> Option<String> {
    record
        .get("key")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

fn pomodoro_defaults(record: &Map<String, Value>) -> Option<String> {
    has_numbers(payload(record), &["focus", "shortBreak", "longBreak"])
        .then(|| setting_keys::POMODORO_DEFAULTS.to_string())
}

fn media_player(record: &Map<String, Value>) -> Option<String> {
    has_strings(payload(record), &["rawInput", "embedUrl", "platformId"])
        .then(|| setting_keys::MEDIA_PLAYER.to_string())
}

fn current_focus(record: &Map<String, Value>) -> Option<String> {
    let obj = payload(record);
    let day = obj.get("dayKey").and_then(Value::as_str)?;
    obj.get("taskId")?;
    (!day.is_empty()).then(|| setting_keys::current_focus(day))
}

/// Ordered recognizer list, open for extension.
#[derive(Debug, Clone)]
pub struct SettingKeyResolver {
    recognizers: Vec<(&'static str, Recognizer)>,
}

impl Default for SettingKeyResolver {
    fn default() -> Self {
        Self {
            recognizers: vec![
                ("explicit-key", explicit_key as Recognizer),
                ("pomodoro-defaults", pomodoro_defaults as Recognizer),
                ("media-player", media_player as Recognizer),
                ("current-focus", current_focus as Recognizer),
            ],
        }
    }
}

impl SettingKeyResolver {
    /// A resolver with no recognizers at all.
    pub fn empty() -> Self {
        Self {
            recognizers: Vec::new(),
        }
    }

    /// Append a recognizer; it runs after every existing one.
    pub fn with(mut self, name: &'static str, recognizer: Recognizer) -> Self {
        self.recognizers.push((name, recognizer));
        self
    }

    pub fn resolve(&self, record: &Map<String, Value>) -> Option<String> {
        self.recognizers.iter().find_map(|(name, recognize)| {
            let key = recognize(record)?;
            tracing::trace!(recognizer = name, key = %key, "setting key resolved");
            Some(key)
        })
    }

    /// Turn a raw setting record into an envelope, or `None` if no
    /// recognizer claims it.
    pub fn normalize(&self, raw: &Value) -> Option<SettingEnvelope> {
        let record = raw.as_object()?;
        let key = self.resolve(record)?;
        let updated_at = record.get("updatedAt").and_then(Value::as_i64).unwrap_or(0);
        // Flat rows carry the payload beside the bookkeeping fields.
        let value = match record.get("value") {
            Some(value) => value.clone(),
            None => {
                let mut bare = record.clone();
                bare.remove("key");
                bare.remove("updatedAt");
                Value::Object(bare)
            }
        };
        Some(SettingEnvelope {
            key,
            value,
            updated_at,
        })
    }
}
