use serde::{Deserialize, Serialize};

use super::engine::TimerSnapshot;
use crate::model::SessionType;

/// Emitted once per finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCompletion {
    pub mode: SessionType,
    pub duration_ms: u64,
    pub started_at: i64,
    pub ended_at: i64,
}

/// Everything a timer observer can be told.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    /// Periodic re-evaluation while running.
    Tick(TimerSnapshot),
    /// Status, mode or duration changed.
    StateChanged(TimerSnapshot),
    Completed(TimerCompletion),
}

/// Handle returned by [`ListenerRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Box<dyn FnMut(&TimerEvent) + Send>;

/// Observer list with per-listener unsubscribe handles.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl ListenerRegistry {
    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &TimerEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn completion() -> TimerEvent {
        TimerEvent::Completed(TimerCompletion {
            mode: SessionType::Focus,
            duration_ms: 1,
            started_at: 0,
            ended_at: 1,
        })
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let seen = Arc::new(Mutex::new(0));
        let mut registry = ListenerRegistry::default();

        let counter = Arc::clone(&seen);
        let id = registry.subscribe(Box::new(move |_: &TimerEvent| *counter.lock().unwrap() += 1));

        registry.emit(&completion());
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.emit(&completion());

        assert_eq!(*seen.lock().unwrap(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn completion_event_serializes_with_type_tag() {
        let json = serde_json::to_value(completion()).unwrap();
        assert_eq!(json["type"], "completed");
        assert_eq!(json["mode"], "focus");
        assert_eq!(json["durationMs"], 1);
    }
}
