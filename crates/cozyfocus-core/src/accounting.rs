//! Session and day-stats accounting.
//!
//! A finished timer run becomes two writes, a [`Session`] and an updated
//! [`DayStats`], committed together in one SQLite transaction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::day_key::day_key;
use crate::error::Result;
use crate::model::{DayStats, Session, SessionType};
use crate::storage::{Database, Repo};
use crate::timer::TimerCompletion;

/// Persist a completed run and return the day's updated stats.
///
/// The day is `day_key` when given, otherwise the local day of `ended_at`:
/// a run crossing midnight belongs to the day it ended.
///
/// # Errors
/// Returns an error if either write fails; neither is kept in that case.
pub fn record_completion(
    db: &Database,
    completion: &TimerCompletion,
    day_key_override: Option<&str>,
) -> Result<DayStats> {
    let day = day_key_override
        .map(str::to_string)
        .unwrap_or_else(|| day_key(completion.ended_at));

    let session = Session {
        id: Uuid::new_v4().to_string(),
        day_key: day.clone(),
        session_type: completion.mode,
        duration_ms: completion.duration_ms,
        started_at: completion.started_at,
        ended_at: completion.ended_at,
        completed: true,
    };

    let tx = db.conn().unchecked_transaction()?;
    let stats = {
        let sessions: Repo<'_, Session> = Repo::new(&tx);
        let stats_repo: Repo<'_, DayStats> = Repo::new(&tx);

        sessions.put(&session)?;
        let mut stats = stats_repo.get(&day)?.unwrap_or_else(|| DayStats::empty(&day));
        stats.record(completion.mode, completion.duration_ms);
        stats_repo.put(&stats)?;
        stats
    };
    tx.commit()?;

    tracing::info!(
        day = %day,
        mode = completion.mode.as_str(),
        duration_ms = completion.duration_ms,
        "session recorded"
    );
    Ok(stats)
}

/// Stats for one day; zeroes when nothing was recorded.
pub fn stats_for_day(db: &Database, day: &str) -> Result<DayStats> {
    Ok(db.stats().get(day)?.unwrap_or_else(|| DayStats::empty(day)))
}

/// Sessions of one day ordered by start time.
pub fn sessions_for_day(db: &Database, day: &str) -> Result<Vec<Session>> {
    let mut sessions = db.sessions().get_all(Some(day))?;
    sessions.sort_by_key(|s| s.started_at);
    Ok(sessions)
}

/// Totals across a range of days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub from: String,
    pub to: String,
    pub days_with_activity: u64,
    pub focus_completed_count: u64,
    pub break_completed_count: u64,
    pub total_focus_ms: u64,
    pub total_break_ms: u64,
    pub days: Vec<DayStats>,
}

/// Per-day stats and totals for `from..=to`.
pub fn stats_range(db: &Database, from: &str, to: &str) -> Result<StatsSummary> {
    let days = db.stats().get_range(from, to)?;
    let mut summary = StatsSummary {
        from: from.to_string(),
        to: to.to_string(),
        ..Default::default()
    };
    for day in &days {
        if day.completed_count() > 0 {
            summary.days_with_activity += 1;
        }
        summary.focus_completed_count += day.focus_completed_count;
        summary.break_completed_count +=
            day.short_break_completed_count + day.long_break_completed_count;
        summary.total_focus_ms += day.total_focus_ms;
        summary.total_break_ms += day.total_break_ms;
    }
    summary.days = days;
    Ok(summary)
}

/// Convenience for callers without a timer: account a manual session.
pub fn record_manual(
    db: &Database,
    mode: SessionType,
    duration_ms: u64,
    ended_at: i64,
) -> Result<DayStats> {
    let started_at = ended_at - i64::try_from(duration_ms).unwrap_or(i64::MAX);
    record_completion(
        db,
        &TimerCompletion {
            mode,
            duration_ms,
            started_at,
            ended_at,
        },
        None,
    )
}
