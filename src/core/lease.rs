//! # Lease: one consumer's hold on a shared controller.
//!
//! A [`Lease`] is returned by [`ControllerCache::acquire`]. While it lives,
//! the controller is counted as referenced and is never evicted. Dropping it
//! releases the reference exactly once; when it was the last one, eviction
//! is scheduled after the grace period.
//!
//! [`Lease::watch`] subscribes a handler to one of the controller's
//! [`Emitter`]s for the lifetime of the lease: the handler is unsubscribed
//! on drop, before the reference is released.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::controllers::{Controller, ControllerKey};
use crate::core::cache::ControllerCache;
use crate::emitter::{Emitter, Handler};

type Unwatch = Box<dyn FnOnce() + Send + Sync>;

/// RAII consumer reference to a shared controller.
#[must_use = "dropping a lease releases the controller immediately"]
pub struct Lease<T: Controller> {
    cache: Arc<ControllerCache>,
    key: ControllerKey,
    controller: Arc<T>,
    unwatch: Vec<Unwatch>,
}

impl<T: Controller> Lease<T> {
    pub(crate) fn new(cache: Arc<ControllerCache>, key: ControllerKey, controller: Arc<T>) -> Self {
        Self {
            cache,
            key,
            controller,
            unwatch: Vec::new(),
        }
    }

    /// Returns the key this lease holds.
    pub fn key(&self) -> &ControllerKey {
        &self.key
    }

    /// Returns a clone of the shared instance.
    ///
    /// The clone does not count as a consumer: it keeps the value alive but
    /// does not prevent eviction from the cache.
    pub fn controller(&self) -> Arc<T> {
        Arc::clone(&self.controller)
    }

    /// Subscribes `handler` to the emitter picked by `select` until this lease is dropped.
    ///
    /// # Example
    /// ```rust,ignore
    /// let mut lease = cache.acquire(Some("a"), || Ok::<_, Infallible>(Counter::new()))?;
    /// lease.watch(|c| &c.value, Arc::new(|v: &u64| println!("value={v}")));
    /// ```
    pub fn watch<V, S>(&mut self, select: S, handler: Handler<V>)
    where
        V: Clone + Send + Sync + 'static,
        S: Fn(&T) -> &Emitter<V> + Send + Sync + 'static,
    {
        select(self.controller.as_ref()).subscribe(Arc::clone(&handler));
        let controller = Arc::clone(&self.controller);
        self.unwatch.push(Box::new(move || {
            select(controller.as_ref()).unsubscribe(&handler);
        }));
    }
}

impl<T: Controller> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.controller
    }
}

impl<T: Controller> Drop for Lease<T> {
    fn drop(&mut self) {
        for unwatch in self.unwatch.drain(..) {
            unwatch();
        }
        self.cache.detach(&self.key);
    }
}

impl<T: Controller> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("key", &self.key)
            .field("watches", &self.unwatch.len())
            .finish()
    }
}
