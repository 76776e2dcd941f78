//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-anchored state machine. It does not use
//! internal threads - the caller (or a [`super::Ticker`]) calls `tick()`
//! periodically, and `sync()` when a host comes back from the background.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> ... -> Idle
//!            \__________ completed ___________/
//! ```
//!
//! Remaining time is always `target_end_at - now`, never a decremented
//! counter, so missed ticks cannot cause drift.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Arc::new(SystemClock), ModeDurations::default());
//! engine.start();
//! // In a loop:
//! if let Some(done) = engine.tick() { /* record the session */ }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::events::{Listener, ListenerId, ListenerRegistry, TimerCompletion, TimerEvent};
use crate::clock::Clock;
use crate::model::SessionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

/// Full duration of each timer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeDurations {
    pub focus_ms: u64,
    pub short_break_ms: u64,
    pub long_break_ms: u64,
}

impl ModeDurations {
    pub fn from_minutes(focus: u32, short_break: u32, long_break: u32) -> Self {
        let ms = |min: u32| u64::from(min).saturating_mul(60_000);
        Self {
            focus_ms: ms(focus),
            short_break_ms: ms(short_break),
            long_break_ms: ms(long_break),
        }
    }

    pub fn for_mode(&self, mode: SessionType) -> u64 {
        match mode {
            SessionType::Focus => self.focus_ms,
            SessionType::ShortBreak => self.short_break_ms,
            SessionType::LongBreak => self.long_break_ms,
        }
    }
}

impl Default for ModeDurations {
    fn default() -> Self {
        Self::from_minutes(25, 5, 15)
    }
}

/// Point-in-time view of the timer; also its persisted form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub mode: SessionType,
    pub status: TimerStatus,
    pub duration_ms: u64,
    pub remaining_ms: i64,
    pub started_at: Option<i64>,
    pub target_end_at: Option<i64>,
}

/// Core timer engine.
///
/// One instance per active timer context; owned by whoever mounts it.
pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    durations: ModeDurations,
    mode: SessionType,
    status: TimerStatus,
    remaining_ms: i64,
    started_at: Option<i64>,
    target_end_at: Option<i64>,
    listeners: ListenerRegistry,
    destroyed: bool,
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("remaining_ms", &self.remaining_ms)
            .field("started_at", &self.started_at)
            .field("target_end_at", &self.target_end_at)
            .field("listeners", &self.listeners)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

fn to_ms(duration: u64) -> i64 {
    i64::try_from(duration).unwrap_or(i64::MAX)
}

impl TimerEngine {
    /// Create an idle focus timer with a full duration.
    pub fn new(clock: Arc<dyn Clock>, durations: ModeDurations) -> Self {
        Self {
            clock,
            durations,
            mode: SessionType::Focus,
            status: TimerStatus::Idle,
            remaining_ms: to_ms(durations.focus_ms),
            started_at: None,
            target_end_at: None,
            listeners: ListenerRegistry::default(),
            destroyed: false,
        }
    }

    /// Rebuild an engine from a persisted snapshot.
    ///
    /// A running snapshot keeps its wall-clock target, so time that passed
    /// while nothing was loaded is accounted on the next `tick()`.
    pub fn restore(clock: Arc<dyn Clock>, durations: ModeDurations, snapshot: TimerSnapshot) -> Self {
        let mut engine = Self::new(clock, durations);
        engine.mode = snapshot.mode;
        engine.started_at = snapshot.started_at;
        match (snapshot.status, snapshot.target_end_at) {
            (TimerStatus::Running, Some(target)) => {
                engine.status = TimerStatus::Running;
                engine.target_end_at = Some(target);
                engine.remaining_ms = snapshot.remaining_ms;
            }
            (TimerStatus::Running, None) | (TimerStatus::Paused, _) => {
                engine.status = TimerStatus::Paused;
                engine.remaining_ms = snapshot.remaining_ms;
            }
            (TimerStatus::Idle, _) => {
                engine.started_at = None;
                engine.remaining_ms = engine.full_duration();
            }
        }
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> SessionType {
        self.mode
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn durations(&self) -> ModeDurations {
        self.durations
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn full_duration(&self) -> i64 {
        to_ms(self.durations.for_mode(self.mode))
    }

    /// Current state, with remaining time derived from the wall clock.
    pub fn snapshot(&self) -> TimerSnapshot {
        let remaining_ms = match (self.status, self.target_end_at) {
            (TimerStatus::Running, Some(target)) => (target - self.clock.now_ms()).max(0),
            _ => self.remaining_ms.max(0),
        };
        TimerSnapshot {
            mode: self.mode,
            status: self.status,
            duration_ms: self.durations.for_mode(self.mode),
            remaining_ms,
            started_at: self.started_at,
            target_end_at: self.target_end_at,
        }
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn emit(&mut self, event: TimerEvent) {
        if !self.destroyed {
            self.listeners.emit(&event);
        }
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        self.emit(TimerEvent::StateChanged(snapshot));
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume. No-op while already running.
    pub fn start(&mut self) -> bool {
        if self.destroyed || self.status == TimerStatus::Running {
            return false;
        }
        let full = self.full_duration();
        if self.remaining_ms <= 0 || self.remaining_ms > full {
            self.remaining_ms = full;
        }
        let now = self.clock.now_ms();
        self.target_end_at = Some(now + self.remaining_ms);
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.status = TimerStatus::Running;
        self.emit_state();
        true
    }

    /// Freeze the remaining time. No-op unless running.
    pub fn pause(&mut self) -> bool {
        if self.destroyed || self.status != TimerStatus::Running {
            return false;
        }
        let now = self.clock.now_ms();
        if let Some(target) = self.target_end_at.take() {
            self.remaining_ms = (target - now).max(0);
        }
        self.status = TimerStatus::Paused;
        self.emit_state();
        true
    }

    /// Back to idle with the full duration of the current mode.
    pub fn reset(&mut self) {
        if self.destroyed {
            return;
        }
        self.go_idle();
        self.emit_state();
    }

    /// Switch mode. Ignored while running.
    pub fn set_mode(&mut self, mode: SessionType) -> bool {
        if self.destroyed || self.status == TimerStatus::Running {
            return false;
        }
        self.mode = mode;
        self.reset();
        true
    }

    /// Replace per-mode durations. Ignored while running; an idle timer
    /// picks up the new full duration immediately.
    pub fn set_durations(&mut self, durations: ModeDurations) -> bool {
        if self.destroyed || self.status == TimerStatus::Running {
            return false;
        }
        self.durations = durations;
        if self.status == TimerStatus::Idle {
            self.remaining_ms = self.full_duration();
        }
        self.emit_state();
        true
    }

    /// Periodic re-evaluation. Returns the completion when this tick
    /// finished the run.
    pub fn tick(&mut self) -> Option<TimerCompletion> {
        if self.destroyed || self.status != TimerStatus::Running {
            return None;
        }
        let now = self.clock.now_ms();
        let target = self.target_end_at?;
        self.remaining_ms = (target - now).max(0);
        if self.remaining_ms > 0 {
            let snapshot = self.snapshot();
            self.emit(TimerEvent::Tick(snapshot));
            return None;
        }

        let completion = TimerCompletion {
            mode: self.mode,
            duration_ms: self.durations.for_mode(self.mode),
            started_at: self
                .started_at
                .unwrap_or_else(|| now - self.full_duration()),
            ended_at: now,
        };
        // Idle before anyone hears about it, so a re-entrant tick is a no-op.
        self.go_idle();
        self.emit(TimerEvent::Completed(completion));
        self.emit_state();
        Some(completion)
    }

    /// Immediate re-evaluation, e.g. when the host becomes visible again.
    pub fn sync(&mut self) -> Option<TimerCompletion> {
        self.tick()
    }

    /// Release listeners; the engine stays inert afterwards.
    pub fn destroy(&mut self) {
        self.listeners.clear();
        self.destroyed = true;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn go_idle(&mut self) {
        self.status = TimerStatus::Idle;
        self.remaining_ms = self.full_duration();
        self.started_at = None;
        self.target_end_at = None;
    }
}
