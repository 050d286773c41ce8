//! # Single-value broadcast primitive.
//!
//! [`Emitter`] keeps the last emitted value and a list of handlers.
//! [`emit`](Emitter::emit) stores the value and calls every handler
//! synchronously, in subscription order. Nothing is queued or replayed:
//! a handler subscribed after an emit only sees later emits.
//!
//! ## Rules
//! - Handler identity is the `Arc` allocation: subscribing the same
//!   [`Handler`] twice is a no-op.
//! - Handlers run outside the internal lock, so they may emit, subscribe or
//!   unsubscribe re-entrantly. Changes made during an emit apply to the next one.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use ctrlcache::{Emitter, Handler};
//!
//! let emitter = Emitter::new();
//! assert_eq!(emitter.current_value(), None);
//!
//! let seen = Arc::new(AtomicU64::new(0));
//! let sink = Arc::clone(&seen);
//! let handler: Handler<u64> = Arc::new(move |v: &u64| sink.store(*v, Ordering::SeqCst));
//!
//! emitter.subscribe(handler.clone());
//! emitter.emit(7);
//! assert_eq!(seen.load(Ordering::SeqCst), 7);
//! assert_eq!(emitter.current_value(), Some(7));
//!
//! emitter.unsubscribe(&handler);
//! emitter.emit(8);
//! assert_eq!(seen.load(Ordering::SeqCst), 7);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::sync::lock;

/// Callback invoked with every emitted value.
pub type Handler<V> = Arc<dyn Fn(&V) + Send + Sync>;

struct Inner<V> {
    current: Option<V>,
    handlers: Vec<Handler<V>>,
}

/// Thread-safe single-value broadcaster.
pub struct Emitter<V> {
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> Emitter<V> {
    /// Creates an emitter with no value and no handlers.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: None,
                handlers: Vec::new(),
            }),
        }
    }

    /// Stores `value` as current and calls every handler with it.
    pub fn emit(&self, value: V) {
        let handlers = {
            let mut inner = lock(&self.inner);
            inner.current = Some(value.clone());
            inner.handlers.clone()
        };
        for handler in &handlers {
            handler(&value);
        }
    }

    /// Registers `handler`; no-op if it is already registered.
    pub fn subscribe(&self, handler: Handler<V>) {
        let mut inner = lock(&self.inner);
        if !inner.handlers.iter().any(|h| same_handler(h, &handler)) {
            inner.handlers.push(handler);
        }
    }

    /// Removes `handler`; no-op if it is not registered.
    pub fn unsubscribe(&self, handler: &Handler<V>) {
        lock(&self.inner).handlers.retain(|h| !same_handler(h, handler));
    }

    /// Returns the last emitted value, or `None` if nothing was emitted yet.
    pub fn current_value(&self) -> Option<V> {
        lock(&self.inner).current.clone()
    }

    /// Returns the number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).handlers.len()
    }
}

impl<V: Clone> Default for Emitter<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Emitter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Emitter")
            .field("current", &inner.current)
            .field("handlers", &inner.handlers.len())
            .finish()
    }
}

// Compare data pointers only: vtable pointers for the same closure may differ
// between codegen units.
fn same_handler<V>(a: &Handler<V>, b: &Handler<V>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Handler<i32>, Arc<Mutex<Vec<i32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Handler<i32> = Arc::new(move |v: &i32| sink.lock().unwrap().push(*v));
        (handler, seen)
    }

    #[test]
    fn current_value_is_none_before_emit() {
        let emitter: Emitter<i32> = Emitter::new();
        assert_eq!(emitter.current_value(), None);
        emitter.emit(3);
        assert_eq!(emitter.current_value(), Some(3));
    }

    #[test]
    fn subscribed_handler_receives_exactly_one_call() {
        let emitter = Emitter::new();
        let (handler, seen) = recorder();
        emitter.subscribe(handler.clone());
        emitter.subscribe(handler);
        assert_eq!(emitter.subscriber_count(), 1);

        emitter.emit(5);
        assert_eq!(*seen.lock().unwrap(), vec![5]);
    }

    #[test]
    fn unsubscribed_handler_receives_nothing() {
        let emitter = Emitter::new();
        let (handler, seen) = recorder();
        emitter.subscribe(handler.clone());
        emitter.unsubscribe(&handler);
        emitter.unsubscribe(&handler);

        emitter.emit(1);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(emitter.subscriber_count(), 0);
    }

    #[test]
    fn late_subscriber_gets_no_replay() {
        let emitter = Emitter::new();
        emitter.emit(1);
        let (handler, seen) = recorder();
        emitter.subscribe(handler);
        assert!(seen.lock().unwrap().is_empty());
        emitter.emit(2);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let emitter: Emitter<i32> = Emitter::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            let order = Arc::clone(&order);
            emitter.subscribe(Arc::new(move |_: &i32| order.lock().unwrap().push(id)));
        }
        emitter.emit(0);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let emitter: Arc<Emitter<i32>> = Arc::new(Emitter::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Handler<i32>>>> = Arc::new(Mutex::new(None));

        let handler: Handler<i32> = {
            let emitter = Arc::clone(&emitter);
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            Arc::new(move |_: &i32| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(me) = slot.lock().unwrap().take() {
                    emitter.unsubscribe(&me);
                }
            })
        };
        *slot.lock().unwrap() = Some(handler.clone());
        emitter.subscribe(handler);

        emitter.emit(1);
        emitter.emit(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
