//! Event types for the tracker event system
//!
//! Overlay transitions and record-store activity are published on the
//! EventBus. The styling/notification collaborator subscribes to render
//! success and failure feedback; nothing in the core depends on a listener.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Overlay lifecycle state of one tracked page element
///
/// Elements that are not tracked are implicitly `Unseen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverlayState {
    /// Not yet classified as needing a control
    Unseen,
    /// Control inserted, idle
    Attached,
    /// Control activated, resolve-and-submit in flight
    Working,
    /// Last operation succeeded, waiting for cool-down
    Succeeded,
    /// Last operation failed, waiting for cool-down
    Failed,
}

impl std::fmt::Display for OverlayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayState::Unseen => write!(f, "Unseen"),
            OverlayState::Attached => write!(f, "Attached"),
            OverlayState::Working => write!(f, "Working"),
            OverlayState::Succeeded => write!(f, "Succeeded"),
            OverlayState::Failed => write!(f, "Failed"),
        }
    }
}

/// Tracker event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackerEvent {
    /// A media record was seen for the first time
    RecordStored {
        session_id: Uuid,
        primary_key: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A later payload filled in missing fields of a known record
    RecordMerged {
        session_id: Uuid,
        primary_key: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A control was inserted for a page element
    ControlAttached {
        session_id: Uuid,
        host_node: u64,
        control_node: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A tracked control moved between lifecycle states
    ControlStateChanged {
        session_id: Uuid,
        host_node: u64,
        control_node: u64,
        old_state: OverlayState,
        new_state: OverlayState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A tracked element left the document; its state was dropped
    ControlDiscarded {
        session_id: Uuid,
        host_node: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// No resolution strategy produced a record
    ResolutionMissed {
        session_id: Uuid,
        location: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TrackerEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &str {
        match self {
            TrackerEvent::RecordStored { .. } => "RecordStored",
            TrackerEvent::RecordMerged { .. } => "RecordMerged",
            TrackerEvent::ControlAttached { .. } => "ControlAttached",
            TrackerEvent::ControlStateChanged { .. } => "ControlStateChanged",
            TrackerEvent::ControlDiscarded { .. } => "ControlDiscarded",
            TrackerEvent::ResolutionMissed { .. } => "ResolutionMissed",
        }
    }

    /// Session that produced the event
    pub fn session_id(&self) -> Uuid {
        match self {
            TrackerEvent::RecordStored { session_id, .. }
            | TrackerEvent::RecordMerged { session_id, .. }
            | TrackerEvent::ControlAttached { session_id, .. }
            | TrackerEvent::ControlStateChanged { session_id, .. }
            | TrackerEvent::ControlDiscarded { session_id, .. }
            | TrackerEvent::ResolutionMissed { session_id, .. } => *session_id,
        }
    }
}

/// Event distribution bus for tracker events
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the tracker)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TrackerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TrackerEvent,
    ) -> Result<usize, broadcast::error::SendError<TrackerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: TrackerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_state_display() {
        assert_eq!(OverlayState::Attached.to_string(), "Attached");
        assert_eq!(OverlayState::Working.to_string(), "Working");
        assert_ne!(OverlayState::Succeeded, OverlayState::Failed);
    }

    #[test]
    fn test_state_changed_serialization() {
        let session_id = Uuid::from_u128(0x1234);
        let event = TrackerEvent::ControlStateChanged {
            session_id,
            host_node: 7,
            control_node: 8,
            old_state: OverlayState::Attached,
            new_state: OverlayState::Working,
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(event.event_type(), "ControlStateChanged");

        let json = serde_json::to_string(&event).expect("Serialization should succeed");
        assert!(json.contains("\"type\":\"ControlStateChanged\""));
        assert!(json.contains("\"new_state\":\"Working\""));

        let back: TrackerEvent = serde_json::from_str(&json).expect("Deserialization should succeed");
        assert_eq!(back.session_id(), session_id);
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(16);
        assert_eq!(bus.capacity(), 16);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(4);
        let event = TrackerEvent::RecordStored {
            session_id: Uuid::new_v4(),
            primary_key: "abc123".to_string(),
            timestamp: chrono::Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        // Lossy emit must not panic either
        bus.emit_lossy(event);
    }

    #[tokio::test]
    async fn test_emit_delivers_to_subscriber() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        bus.emit(TrackerEvent::ControlDiscarded {
            session_id: Uuid::new_v4(),
            host_node: 3,
            timestamp: chrono::Utc::now(),
        })
        .unwrap();

        match rx.recv().await.unwrap() {
            TrackerEvent::ControlDiscarded { host_node, .. } => assert_eq!(host_node, 3),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
