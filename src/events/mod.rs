//! Cache events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to everything the cache does: constructions, attaches,
//! detaches, scheduled and completed evictions.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ControllerCache` (acquire/detach/eviction/remove) and
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the cache's subscriber listener (fans out to
//!   `SubscriberSet`) and anyone holding a receiver from
//!   [`ControllerCache::events`](crate::ControllerCache::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
