//! # Controller abstraction.
//!
//! A controller is any stateful unit that several consumers want to share.
//! It is identified by its [`KIND`](Controller::KIND) plus an optional tag
//! supplied at acquire time (see [`ControllerKey`](crate::ControllerKey)).
//!
//! Controllers usually expose one or more [`Emitter`](crate::Emitter)s so
//! consumers can observe state changes.

/// # Shared, keyed stateful unit.
///
/// `KIND` is the stable type identifier used as the first half of the key.
/// It must be unique per Rust type within one cache.
///
/// Constructors passed to [`ControllerCache::acquire`](crate::ControllerCache::acquire)
/// run while the cache is locked. A controller that needs another controller
/// must acquire it before (or after) its own acquire, not from inside its
/// factory; the cache panics on such a nested call.
///
/// # Example
/// ```
/// use ctrlcache::{Controller, Emitter};
///
/// struct Counter {
///     value: Emitter<u64>,
/// }
///
/// impl Controller for Counter {
///     const KIND: &'static str = "Counter";
/// }
/// ```
pub trait Controller: Send + Sync + 'static {
    /// Stable type identifier (first half of the key).
    const KIND: &'static str;

    /// Called once after the cache drops this instance from its registry,
    /// either because the grace period elapsed or because it was removed
    /// explicitly.
    ///
    /// Consumers that still hold a clone of the instance keep it alive; use
    /// this hook to stop background work (cancel tokens, close channels).
    fn on_evict(&self) {}
}
