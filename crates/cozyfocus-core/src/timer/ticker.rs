//! Background driver that calls `tick()` on a shared engine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::engine::TimerEngine;

/// How often a running timer is re-evaluated.
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

pub type SharedTimer = Arc<Mutex<TimerEngine>>;

/// Periodic re-evaluation task. Dropping it stops the ticks.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn on the current tokio runtime.
    pub fn spawn(timer: SharedTimer, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let mut engine = match timer.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if engine.is_destroyed() {
                    tracing::debug!("timer destroyed, ticker exiting");
                    break;
                }
                if let Some(done) = engine.tick() {
                    tracing::debug!(mode = done.mode.as_str(), "timer run completed");
                }
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop ticking; no further events fire from this ticker.
    pub fn stop(self) {}
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer::{ModeDurations, TimerEvent, TimerStatus};

    fn shared(clock: Arc<ManualClock>) -> SharedTimer {
        Arc::new(Mutex::new(TimerEngine::new(
            clock,
            ModeDurations {
                focus_ms: 1_000,
                short_break_ms: 1_000,
                long_break_ms: 1_000,
            },
        )))
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_completes_a_running_timer() {
        let clock = Arc::new(ManualClock::new(0));
        let timer = shared(clock.clone());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        {
            let mut engine = timer.lock().unwrap();
            engine.subscribe(Box::new(move |e: &TimerEvent| {
                if let TimerEvent::Completed(done) = e {
                    let _ = tx.send(*done);
                }
            }));
            engine.start();
        }

        let _ticker = Ticker::spawn(timer.clone(), TICK_INTERVAL);
        clock.set(1_500);
        tokio::time::sleep(TICK_INTERVAL * 2).await;

        let done = rx.recv().await.expect("completion delivered");
        assert_eq!(done.ended_at, 1_500);
        assert_eq!(timer.lock().unwrap().status(), TimerStatus::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_exits_after_destroy() {
        let clock = Arc::new(ManualClock::new(0));
        let timer = shared(clock);
        let ticker = Ticker::spawn(timer.clone(), TICK_INTERVAL);
        timer.lock().unwrap().destroy();
        tokio::time::sleep(TICK_INTERVAL * 2).await;
        assert!(ticker.is_finished());
    }
}
