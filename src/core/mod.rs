//! Cache core: registry, reference tracking and eviction.
//!
//! The public API from this module is [`ControllerCache`] (with its
//! [`CacheBuilder`] and [`CacheConfig`]), the [`Lease`] consumers hold, the
//! standalone [`Registry`], and the process-wide [`init`] / [`global`].
//!
//! Internal modules:
//! - [`registry`]: keyed store of type-erased controllers;
//! - [`tracker`]: live counts and pending evictions (pure state machine);
//! - [`cache`]: serializes registry + tracker, arms grace timers, publishes events;
//! - [`lease`]: RAII consumer handle;
//! - [`global`]: the process-wide instance.

mod builder;
mod cache;
mod config;
mod global;
mod lease;
mod registry;
mod tracker;


pub use builder::CacheBuilder;
pub use cache::ControllerCache;
pub use config::CacheConfig;
pub use global::{global, init, init_with_subscribers};
pub use lease::Lease;
pub use registry::{Put, Registry};
