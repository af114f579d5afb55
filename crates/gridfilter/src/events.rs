//! Change notifications emitted by the engine.
//!
//! Events are broadcast; a send with no subscribers is dropped silently, and
//! a subscriber that falls behind sees `RecvError::Lagged` rather than
//! blocking the engine.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::FilterModel;

/// Buffered events per subscriber before older ones are dropped.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What triggered a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventSource {
    Api,
    QuickFilter,
    History,
    Preset,
    Import,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterEvent {
    /// The filter model changed. `column_id` is set for single-column changes.
    #[serde(rename_all = "camelCase")]
    FilterChanged {
        column_id: Option<String>,
        model: FilterModel,
        source: EventSource,
    },
    /// A column filter, or every filter when `column_id` is `None`, was removed.
    #[serde(rename_all = "camelCase")]
    FilterCleared {
        column_id: Option<String>,
        source: EventSource,
    },
    PresetSaved {
        name: String,
        source: EventSource,
    },
    PresetApplied {
        name: String,
        source: EventSource,
    },
    PresetDeleted {
        name: String,
        source: EventSource,
    },
}

/// Sending half of the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FilterEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FilterEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: FilterEvent) {
        // An error only means there are no subscribers.
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
