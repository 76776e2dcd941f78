mod engine;
mod events;
mod ticker;

pub use engine::{ModeDurations, TimerEngine, TimerSnapshot, TimerStatus};
pub use events::{Listener, ListenerId, ListenerRegistry, TimerCompletion, TimerEvent};
pub use ticker::{SharedTimer, Ticker, TICK_INTERVAL};
