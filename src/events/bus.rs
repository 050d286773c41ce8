//! # Event bus for broadcasting cache events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from the cache and its subscriber workers.
//!
//! ## Architecture
//! ```text
//! Publishers:                              Receivers:
//!   acquire / detach ──┐
//!   grace timers     ──┼──► Bus ──► subscriber listener ──► SubscriberSet
//!   remove           ──┤  (broadcast)
//!   subscriber workers ┘           └──► ControllerCache::events() receivers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`,
//!   so it is safe to call while a cache lock is held.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for cache events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test(flavor = "current_thread")]
    async fn receiver_sees_events_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::Attached).with_key("lost"));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::Detached).with_key("Counter-a"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::Detached);
        assert_eq!(ev.key.as_deref(), Some("Counter-a"));
    }
}
