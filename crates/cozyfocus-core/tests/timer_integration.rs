//! Integration tests for the timer engine feeding session accounting.

use std::sync::{Arc, Mutex};

use cozyfocus_core::accounting::{record_completion, sessions_for_day, stats_for_day};
use cozyfocus_core::timer::{ModeDurations, TimerEngine, TimerEvent, TimerSnapshot, TimerStatus};
use cozyfocus_core::{Database, ManualClock, SessionType};

fn durations(focus_ms: u64) -> ModeDurations {
    ModeDurations {
        focus_ms,
        short_break_ms: 5_000,
        long_break_ms: 15_000,
    }
}

#[test]
fn test_time_jump_is_derived_from_target_end() {
    let clock = Arc::new(ManualClock::new(0));
    let mut engine = TimerEngine::new(clock.clone(), durations(10_000));
    engine.start();

    clock.set(7_000);
    assert!(engine.sync().is_none());
    assert_eq!(engine.snapshot().remaining_ms, 3_000);
    assert_eq!(engine.status(), TimerStatus::Running);
}

#[test]
fn test_completion_resets_to_full_duration() {
    let clock = Arc::new(ManualClock::new(0));
    let mut engine = TimerEngine::new(clock.clone(), ModeDurations::default());
    engine.start();

    clock.advance(25 * 60_000);
    let done = engine.tick().expect("run should complete");
    assert_eq!(done.duration_ms, 25 * 60_000);

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.status, TimerStatus::Idle);
    assert_eq!(snapshot.remaining_ms, 25 * 60_000);
    assert!(engine.tick().is_none());
}

#[test]
fn test_completion_event_is_recorded_once() {
    let clock = Arc::new(ManualClock::new(1_000));
    let db = Database::open_memory().unwrap();
    let mut engine = TimerEngine::new(clock.clone(), durations(60_000));

    let completions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completions);
    engine.subscribe(Box::new(move |event: &TimerEvent| {
        if let TimerEvent::Completed(done) = event {
            sink.lock().unwrap().push(*done);
        }
    }));

    engine.start();
    clock.advance(30_000);
    engine.tick();
    clock.advance(31_000);
    engine.tick();
    engine.sync();

    let seen = completions.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    for done in &seen {
        record_completion(&db, done, Some("2026-03-10")).unwrap();
    }

    let stats = stats_for_day(&db, "2026-03-10").unwrap();
    assert_eq!(stats.focus_completed_count, 1);
    assert_eq!(stats.total_focus_ms, 60_000);
    assert_eq!(sessions_for_day(&db, "2026-03-10").unwrap().len(), 1);
}

#[test]
fn test_break_completion_counts_as_break_time() {
    let clock = Arc::new(ManualClock::new(0));
    let db = Database::open_memory().unwrap();
    let mut engine = TimerEngine::new(clock.clone(), durations(60_000));
    assert!(engine.set_mode(SessionType::ShortBreak));
    engine.start();
    clock.advance(5_000);

    let done = engine.tick().unwrap();
    let stats = record_completion(&db, &done, Some("2026-03-11")).unwrap();
    assert_eq!(stats.short_break_completed_count, 1);
    assert_eq!(stats.total_break_ms, 5_000);
    assert_eq!(stats.total_focus_ms, 0);
}

#[test]
fn test_persisted_snapshot_resumes_across_restarts() {
    let clock = Arc::new(ManualClock::new(0));
    let mut engine = TimerEngine::new(clock.clone(), durations(10_000));
    engine.start();
    clock.set(4_000);

    let saved = serde_json::to_string(&engine.snapshot()).unwrap();
    engine.destroy();

    clock.set(9_000);
    let snapshot: TimerSnapshot = serde_json::from_str(&saved).unwrap();
    let mut restored = TimerEngine::restore(clock.clone(), durations(10_000), snapshot);
    assert_eq!(restored.snapshot().remaining_ms, 1_000);

    clock.set(10_000);
    let done = restored.tick().unwrap();
    assert_eq!(done.started_at, 0);
    assert_eq!(done.ended_at, 10_000);
}

#[test]
fn test_destroyed_engine_stays_silent() {
    let clock = Arc::new(ManualClock::new(0));
    let mut engine = TimerEngine::new(clock.clone(), durations(1_000));
    let events = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&events);
    engine.subscribe(Box::new(move |_: &TimerEvent| *counter.lock().unwrap() += 1));

    engine.start();
    let before = *events.lock().unwrap();
    engine.destroy();
    clock.advance(5_000);

    assert!(engine.tick().is_none());
    assert!(!engine.start());
    assert_eq!(*events.lock().unwrap(), before);
}
