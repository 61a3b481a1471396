//! Note change events and the broadcast bus that carries them.
//!
//! The data-access layer emits an event after every successful mutation.
//! Presentation clients subscribe (via the SSE feed) and use the events to
//! invalidate whatever list or detail views they cache. The bus itself keeps
//! no state beyond the broadcast buffer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::uuid_utils::new_v7;

/// A completed mutation on a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoteEvent {
    NoteCreated { note_id: Uuid },
    NoteUpdated { note_id: Uuid },
    NoteDeleted { note_id: Uuid },
}

impl NoteEvent {
    /// Event type string used as the SSE `event:` name.
    pub fn event_type(&self) -> &'static str {
        match self {
            NoteEvent::NoteCreated { .. } => "note.created",
            NoteEvent::NoteUpdated { .. } => "note.updated",
            NoteEvent::NoteDeleted { .. } => "note.deleted",
        }
    }

    pub fn note_id(&self) -> Uuid {
        match self {
            NoteEvent::NoteCreated { note_id }
            | NoteEvent::NoteUpdated { note_id }
            | NoteEvent::NoteDeleted { note_id } => *note_id,
        }
    }
}

/// Event plus delivery metadata.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    /// Only subscribers authenticated as this owner may see the event.
    pub owner_id: Uuid,
    pub payload: NoteEvent,
}

impl EventEnvelope {
    pub fn new(owner_id: Uuid, payload: NoteEvent) -> Self {
        Self {
            event_id: new_v7(),
            event_type: payload.event_type().to_string(),
            occurred_at: Utc::now(),
            owner_id,
            payload,
        }
    }
}

/// Broadcast bus for note change events.
///
/// Slow receivers that fall behind get a `Lagged` error and miss events;
/// a client that sees a gap should refetch instead of patching its cache.
pub struct NoteEventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl NoteEventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event for `owner_id`. Dropped silently when nobody listens.
    pub fn emit(&self, owner_id: Uuid, event: NoteEvent) {
        let envelope = EventEnvelope::new(owner_id, event);
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "NoteEventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NoteEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
