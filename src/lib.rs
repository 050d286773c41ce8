//! # ctrlcache
//!
//! **ctrlcache** is a keyed, reference-counted store of shared controllers
//! for tokio applications.
//!
//! Many independent consumers ask for a controller by `(kind, tag)` and all
//! get the *same* instance. The instance stays alive while at least one
//! consumer holds a [`Lease`], and is evicted only after a grace period once
//! the last lease is dropped. The grace period absorbs asynchronous work that
//! outlives the consumer which started it, and consumers that are torn down
//! and immediately rebuilt.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  consumer 1  │   │  consumer 2  │   │  consumer 3  │
//!     │ ("Counter-a")│   │ ("Counter-a")│   │ ("Counter-b")│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ acquire          ▼ acquire          ▼ acquire
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ControllerCache                                                  │
//! │  - Registry    (key → instance, one per key)                      │
//! │  - RefTracker  (key → live count, key → pending eviction)         │
//! │  - Bus         (broadcast events)                                 │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     Lease<Counter>     Lease<Counter>     Lease<Counter>
//!        └── same instance ─┘              (own instance)
//!
//! last Lease dropped ──► grace timer ──► still unreferenced? ──► evict
//!                           ▲
//!              acquire ─────┘ cancels it
//! ```
//!
//! ### Eviction protocol
//! ```text
//! acquire(k): cancel pending timer(k); count(k) += 1; registry.put(k)
//! drop lease: count(k) -= 1
//!             └─ reaches 0 → forget count(k), arm timer(k, generation)
//! timer fires: count(k) still absent and generation current?
//!             ├─ yes → registry removes k, Controller::on_evict()
//!             └─ no  → no-op
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types / traits                        |
//! |-------------------|---------------------------------------------------------|-------------------------------------------|
//! | **Sharing**       | One instance per key, created on first acquire.         | [`ControllerCache`], [`Lease`], [`Registry`] |
//! | **Controllers**   | Stateful units with an explicit type identifier.        | [`Controller`], [`ControllerKey`]         |
//! | **Observation**   | Single-value broadcast for controller state.            | [`Emitter`], [`Handler`]                  |
//! | **Subscriber API**| Hook into cache events (logging, metrics).              | [`Subscribe`], [`Event`], [`EventKind`]   |
//! | **Errors**        | Typed errors with stable labels.                        | [`CacheError`]                            |
//! | **Configuration** | Grace period and bus capacity.                          | [`CacheConfig`]                           |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::convert::Infallible;
//! use std::time::Duration;
//! use ctrlcache::{CacheConfig, Controller, ControllerCache, Emitter};
//!
//! struct Counter {
//!     value: Emitter<u64>,
//! }
//!
//! impl Controller for Counter {
//!     const KIND: &'static str = "Counter";
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ctrlcache::CacheError> {
//!     let cache = ControllerCache::builder(CacheConfig::default().with_grace(Duration::from_millis(50)))
//!         .build()?;
//!
//!     let a = cache.acquire(Some("a"), || Ok::<_, Infallible>(Counter { value: Emitter::new() }))?;
//!     let b = cache.acquire(Some("a"), || Ok::<_, Infallible>(Counter { value: Emitter::new() }))?;
//!     a.value.emit(1);
//!     assert_eq!(b.value.current_value(), Some(1));
//!
//!     drop(a);
//!     drop(b);
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     assert!(cache.keys().is_empty());
//!     Ok(())
//! }
//! ```
mod controllers;
mod core;
mod emitter;
mod error;
mod events;
mod subscribers;
mod sync;

// ---- Public re-exports ----

pub use controllers::{Controller, ControllerKey};
pub use core::{
    CacheBuilder, CacheConfig, ControllerCache, Lease, Put, Registry, global, init,
    init_with_subscribers,
};
pub use emitter::{Emitter, Handler};
pub use error::{BoxError, CacheError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
