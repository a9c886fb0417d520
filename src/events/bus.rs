//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]: publishers
//! (supervisor, command runner, signal hooks) never block, and each receiver
//! observes only events sent after it subscribed.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` is a plain channel send.
//! - **Bounded capacity**: one ring buffer of recent events for all receivers.
//! - **Lag handling**: a slow receiver gets `RecvError::Lagged(n)` and skips
//!   the `n` oldest items.
//! - **No persistence**: with no active receiver, events are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (the sender is `Arc`-backed); clones publish into the same
/// channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// Returns immediately; with no receivers the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_events_published_after_subscribe() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::SignalReceived)); // before subscribe, dropped

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::StateChanged).with_reason("running"));

        let got = rx.recv().await.unwrap();
        assert_eq!(got.kind, EventKind::StateChanged);
        assert_eq!(got.reason.as_deref(), Some("running"));
    }

    #[tokio::test]
    async fn test_publish_without_receivers_does_not_block() {
        let bus = Bus::new(1);
        for _ in 0..16 {
            bus.publish(Event::new(EventKind::SignalIgnored));
        }
    }
}
