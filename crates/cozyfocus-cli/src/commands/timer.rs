use std::sync::{Arc, Mutex};

use clap::Subcommand;
use cozyfocus_core::accounting::record_completion;
use cozyfocus_core::model::{setting_keys, PomodoroDefaults, SessionType};
use cozyfocus_core::storage::{Config, Database};
use cozyfocus_core::timer::{
    ModeDurations, Ticker, TimerCompletion, TimerEngine, TimerEvent, TimerSnapshot, TICK_INTERVAL,
};
use cozyfocus_core::SystemClock;

const ENGINE_KEY: &str = "timer_engine";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the timer
    Start,
    /// Pause a running timer
    Pause,
    /// Reset to idle with a full duration
    Reset,
    /// Switch mode (focus, short-break, long-break); ignored while running
    Mode {
        /// Timer mode
        mode: SessionType,
    },
    /// Print current timer state as JSON
    Status,
    /// Run the timer in the foreground until the current run completes
    Watch,
}

/// Stored pomodoro defaults win over the config file unless a mode is
/// zero minutes long, which an imported setting can carry.
fn durations(db: &Database) -> Result<ModeDurations, Box<dyn std::error::Error>> {
    let stored: Option<PomodoroDefaults> = db.get_setting(setting_keys::POMODORO_DEFAULTS)?;
    Ok(match stored {
        Some(d) if d.is_valid() => ModeDurations::from_minutes(d.focus, d.short_break, d.long_break),
        Some(d) => {
            tracing::warn!(?d, "ignoring stored pomodoro defaults with a zero-minute mode");
            Config::load_or_default().pomodoro.durations()
        }
        None => Config::load_or_default().pomodoro.durations(),
    })
}

fn load_engine(db: &Database) -> Result<TimerEngine, Box<dyn std::error::Error>> {
    let durations = durations(db)?;
    let clock = Arc::new(SystemClock);
    if let Some(json) = db.kv_get(ENGINE_KEY)? {
        match serde_json::from_str::<TimerSnapshot>(&json) {
            Ok(snapshot) => return Ok(TimerEngine::restore(clock, durations, snapshot)),
            Err(e) => tracing::warn!(error = %e, "discarding unreadable timer state"),
        }
    }
    Ok(TimerEngine::new(clock, durations))
}

fn save_engine(db: &Database, engine: &TimerEngine) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(&engine.snapshot())?;
    db.kv_set(ENGINE_KEY, &json)?;
    Ok(())
}

/// Persist a finished run. The timer has already gone idle, so a failed
/// write is reported without rolling the timer back.
fn account(db: &Database, done: &TimerCompletion) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&TimerEvent::Completed(*done))?);
    match record_completion(db, done, None) {
        Ok(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
        Err(e) => eprintln!("warning: completed {} run was not saved: {e}", done.mode.as_str()),
    }
    Ok(())
}

fn format_remaining(ms: i64) -> String {
    let secs = (ms.max(0) + 999) / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn watch(db: &Database, engine: TimerEngine) -> Result<TimerEngine, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let shared = Arc::new(Mutex::new(engine));
    {
        let mut engine = shared.lock().map_err(|_| "timer state poisoned")?;
        engine.subscribe(Box::new(move |event: &TimerEvent| {
            let _ = tx.send(event.clone());
        }));
        engine.start();
        // Keep the run if the watch is interrupted.
        save_engine(db, &engine)?;
    }

    let completion = runtime.block_on(async {
        let ticker = Ticker::spawn(Arc::clone(&shared), TICK_INTERVAL);
        let mut last_shown = String::new();
        let mut completion = None;
        while let Some(event) = rx.recv().await {
            match event {
                TimerEvent::Tick(snapshot) => {
                    let shown = format_remaining(snapshot.remaining_ms);
                    if shown != last_shown {
                        println!("{} {shown}", snapshot.mode.as_str());
                        last_shown = shown;
                    }
                }
                TimerEvent::Completed(done) => {
                    completion = Some(done);
                    break;
                }
                TimerEvent::StateChanged(_) => {}
            }
        }
        ticker.stop();
        completion
    });
    // Shutting down drops the ticker task and its handle on the engine.
    drop(runtime);

    let mut engine = Arc::try_unwrap(shared)
        .map_err(|_| "timer still shared after watch")?
        .into_inner()
        .map_err(|_| "timer state poisoned")?;
    engine.destroy();
    if let Some(done) = completion {
        account(db, &done)?;
    }
    Ok(engine)
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut engine = load_engine(&db)?;

    // Account a run that finished while no command was running.
    if let Some(done) = engine.tick() {
        account(&db, &done)?;
    }

    match action {
        TimerAction::Start => {
            engine.start();
        }
        TimerAction::Pause => {
            engine.pause();
        }
        TimerAction::Reset => engine.reset(),
        TimerAction::Mode { mode } => {
            if !engine.set_mode(mode) {
                eprintln!("timer is running; pause or reset before switching mode");
            }
        }
        TimerAction::Status => {}
        TimerAction::Watch => {
            engine = watch(&db, engine)?;
        }
    }

    println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
    save_engine(&db, &engine)?;
    Ok(())
}
