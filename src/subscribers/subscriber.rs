//! # Cache event subscribers.
//!
//! [`Subscribe`] lets an application observe what the cache does with its
//! controllers: which keys are built or reused, how many consumers hold each
//! key, and when grace timers are armed, canceled or fire. Typical uses are
//! eviction metrics, leak hunting (keys that never reach a count of zero)
//! and debug logging.
//!
//! Subscribers are registered once, with
//! [`CacheBuilder::with_subscribers`](crate::CacheBuilder::with_subscribers)
//! or [`init_with_subscribers`](crate::init_with_subscribers). Each one is
//! fed from its own queue, so a slow subscriber never delays an `acquire`
//! or a lease drop.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use ctrlcache::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct EvictionCounter {
//!     evicted: AtomicU64,
//! }
//!
//! #[async_trait]
//! impl Subscribe for EvictionCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::Evicted {
//!             self.evicted.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "evictions" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of cache events.
///
/// `on_event` runs on a worker task, after the cache has already released
/// its lock, so the cache state may have moved on by the time it is called.
/// Use `Event::seq` to order events and `Event::count` for the live count
/// at the moment the event was recorded.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. A panic here is caught and reported as
    /// `SubscriberPanicked`; the worker keeps running.
    async fn on_event(&self, event: &Event);

    /// Name used as the `key` of this subscriber's own panic/overflow events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length before events are dropped for this subscriber (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
