//! # Event subscribers for the controller cache.
//!
//! Subscribers observe the [`Event`](crate::Event) stream without slowing the
//! cache down: each one gets its own bounded queue and worker task.
//!
//! ## Architecture
//! ```text
//! ControllerCache ── publish(Event) ──► Bus ──► subscriber listener
//!                                                    │
//!                                                    ▼
//!                                              SubscriberSet
//!                                          ┌─────────┼─────────┐
//!                                          ▼         ▼         ▼
//!                                       LogWriter  Metrics   Custom
//! ```
//!
//! ## Contents
//! - [`Subscribe`] extension trait
//! - [`SubscriberSet`] fan-out with overflow and panic isolation
//! - `LogWriter` (feature `logging`) prints one line per event

mod embedded;
mod set;
mod subscriber;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
