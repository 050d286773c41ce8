//! # Events emitted by the controller cache.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Registry events**: a controller was created, reused, removed, or failed to construct
//! - **Reference events**: a consumer attached or detached
//! - **Eviction events**: grace timers scheduled, canceled, fired or skipped
//!
//! The [`Event`] struct carries the key, the live count after the operation,
//! the grace delay and an optional reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use ctrlcache::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::EvictionScheduled)
//!     .with_key("Counter-a")
//!     .with_delay(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::EvictionScheduled);
//! assert_eq!(ev.key.as_deref(), Some("Counter-a"));
//! assert_eq!(ev.delay_ms, Some(5000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of cache events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A new controller instance was constructed and stored.
    ///
    /// Sets: `key`
    ControllerCreated,

    /// An existing instance was returned; the caller's factory was dropped unused.
    ///
    /// Sets: `key`
    ControllerReused,

    /// The factory failed; nothing was stored and no consumer was counted.
    ///
    /// Sets: `key`, `reason` (factory error)
    ConstructionFailed,

    /// An instance was removed explicitly (not by a grace timer).
    ///
    /// Sets: `key`
    ControllerRemoved,

    // === Reference events ===
    /// A consumer attached.
    ///
    /// Sets: `key`, `count` (live consumers after attaching)
    Attached,

    /// A consumer detached.
    ///
    /// Sets: `key`, `count` (live consumers after detaching; `0` means a grace timer was scheduled)
    Detached,

    // === Eviction events ===
    /// The last consumer left; eviction is scheduled after the grace period.
    ///
    /// Sets: `key`, `delay_ms` (grace period)
    EvictionScheduled,

    /// A consumer attached during the grace period; the pending eviction was canceled.
    ///
    /// Sets: `key`
    EvictionCanceled,

    /// The grace period elapsed with no consumers; the instance was removed.
    ///
    /// Sets: `key`
    Evicted,

    /// The grace timer fired but found nothing to evict (entry already removed).
    ///
    /// Sets: `key`, `reason`
    EvictionSkipped,

    /// Attach/detach pairing was broken (detach of an untracked key, or a
    /// grace timer firing for a key with live consumers). Tolerated as a no-op.
    ///
    /// Sets: `key`, `reason`
    InvariantViolation,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `key` (subscriber name), `reason` (panic message)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `key` (subscriber name), `reason` ("full" or "closed")
    SubscriberOverflow,
}

/// Cache event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Rendered controller key (or subscriber name for subscriber events).
    pub key: Option<Arc<str>>,
    /// Live consumer count after the operation.
    pub count: Option<u32>,
    /// Grace delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, violation details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            key: None,
            count: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a live consumer count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_key(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_key(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::Attached);
        let b = Event::new(EventKind::Detached);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn count_saturates() {
        let ev = Event::new(EventKind::Attached).with_count(usize::MAX);
        assert_eq!(ev.count, Some(u32::MAX));
    }
}
