//! Event types for the zonemix event system
//!
//! Provides zone/channel event definitions and an `EventBus` for observers
//! (status displays, logging, telemetry). Events are informational: the
//! playback core never depends on a subscriber being present.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Zone and channel events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ZoneEvent {
    /// A transition plan was executed and the current zone/channel committed
    TransitionCommitted {
        from_zone: u32,
        to_zone: u32,
        /// Channel faded out (None when the zones share a track)
        fade_out_channel: Option<usize>,
        fade_in_channel: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A request for the zone already active was rejected
    TransitionRejected {
        zone: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A fade reached its target volume
    FadeCompleted {
        channel: usize,
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A channel started playing (immediately or from a delayed play)
    ChannelStarted {
        channel: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A channel was stopped
    ChannelStopped {
        channel: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A global mixer effect was triggered
    EffectTriggered {
        effect: String,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ZoneEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ZoneEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ZoneEvent) {
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

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ZoneEvent::ChannelStarted {
            channel: 2,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ChannelStarted");
        assert_eq!(json["channel"], 2);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(ZoneEvent::TransitionRejected {
            zone: 1,
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(bus.capacity(), 8);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit_lossy(ZoneEvent::ChannelStopped {
            channel: 0,
            timestamp: chrono::Utc::now(),
        });
        bus.emit_lossy(ZoneEvent::ChannelStarted {
            channel: 1,
            timestamp: chrono::Utc::now(),
        });

        assert!(matches!(
            rx.recv().await.unwrap(),
            ZoneEvent::ChannelStopped { channel: 0, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ZoneEvent::ChannelStarted { channel: 1, .. }
        ));
    }
}
