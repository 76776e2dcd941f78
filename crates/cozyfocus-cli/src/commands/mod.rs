pub mod config;
pub mod doc;
pub mod note;
pub mod stats;
pub mod tag;
pub mod task;
pub mod timer;
pub mod transfer;

use cozyfocus_core::{day_key, parse_day_key, Clock, SystemClock, ValidationError};

/// The given day after validation, or today.
pub(crate) fn resolve_day(day: Option<String>) -> Result<String, ValidationError> {
    match day {
        Some(day) => {
            parse_day_key(&day)?;
            Ok(day)
        }
        None => Ok(day_key(SystemClock.now_ms())),
    }
}
