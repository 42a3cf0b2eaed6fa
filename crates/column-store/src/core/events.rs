//! Semantic column events.
//!
//! Owned by the store rather than inherited: handlers are registered per
//! [`ColumnEventKind`] and run synchronously, in registration order, when
//! an event is dispatched.

use std::fmt;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use serde::Serialize;

use crate::core::{
    lock,
    types::{ColumnId, ColumnRecord},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ColumnEvent {
    /// A column name changed on the server. Carries the column id.
    ColumnRenamed(ColumnId),
    /// A column type or its options changed. Carries the server's column.
    ColumnPatched(ColumnRecord),
}

impl ColumnEvent {
    pub fn kind(&self) -> ColumnEventKind {
        match self {
            ColumnEvent::ColumnRenamed(_) => ColumnEventKind::Renamed,
            ColumnEvent::ColumnPatched(_) => ColumnEventKind::Patched,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnEventKind {
    Renamed,
    Patched,
}

impl fmt::Display for ColumnEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnEventKind::Renamed => write!(f, "columnRenamed"),
            ColumnEventKind::Patched => write!(f, "columnPatched"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

pub type EventCallback = Arc<dyn Fn(&ColumnEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventHandler {
    handlers: Mutex<Vec<(HandlerId, ColumnEventKind, EventCallback)>>,
    next_id: AtomicU64,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: ColumnEventKind, handler: impl Fn(&ColumnEvent) + Send + Sync + 'static) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.handlers).push((id, kind, Arc::new(handler)));
        id
    }

    pub fn off(&self, id: HandlerId) -> bool {
        let mut guard = lock(&self.handlers);
        let before = guard.len();
        guard.retain(|(hid, _, _)| *hid != id);
        guard.len() != before
    }

    /// Runs every handler registered for the event's kind. Returns how many ran.
    pub fn dispatch(&self, event: &ColumnEvent) -> usize {
        let kind = event.kind();
        let matching: Vec<EventCallback> = lock(&self.handlers)
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, h)| h.clone())
            .collect();
        tracing::debug!(event = %kind, handlers = matching.len(), "dispatching column event");
        for handler in &matching {
            handler(event);
        }
        matching.len()
    }

    pub fn clear(&self) {
        lock(&self.handlers).clear();
    }
}
