//! # Controller registry - keyed store of shared instances.
//!
//! The registry owns one type-erased instance per [`ControllerKey`]:
//! - `put` → return the existing instance, or build one with the caller's factory
//! - `delete` → drop the entry unconditionally
//!
//! ## Rules
//! - At most one entry per key; when two `put`s race on an empty key, the
//!   first insert wins and the loser's freshly built instance is dropped.
//! - Factories run outside the registry lock (they may use the registry for
//!   other keys).
//! - A factory error leaves the registry untouched.
//! - The registry never calls [`Controller::on_evict`]; eviction cleanup is
//!   driven by the cache.
//!
//! The registry knows nothing about consumers. Pair it with the cache's
//! reference tracking unless you manage lifetimes yourself.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

use crate::controllers::{Controller, ControllerKey};
use crate::error::{BoxError, CacheError};
use crate::sync::lock;

/// Object-safe view of a stored controller.
pub(crate) trait ErasedController: Send + Sync {
    fn on_evict(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Controller> ErasedController for T {
    fn on_evict(&self) {
        Controller::on_evict(self);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub(crate) type Instance = Arc<dyn ErasedController>;

/// Result of [`Registry::put`].
#[derive(Debug)]
pub enum Put<T> {
    /// The factory ran and its instance was stored.
    Created(Arc<T>),
    /// An instance already existed; the factory was dropped unused.
    Existing(Arc<T>),
}

impl<T> Put<T> {
    /// Returns the instance regardless of how it was obtained.
    pub fn into_inner(self) -> Arc<T> {
        match self {
            Put::Created(c) | Put::Existing(c) => c,
        }
    }

    /// Returns true if this call constructed the instance.
    pub fn is_created(&self) -> bool {
        matches!(self, Put::Created(_))
    }
}

/// Keyed store of controller instances.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<ControllerKey, Instance>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the instance stored under `T`'s key with `tag`, creating it
    /// with `factory` if absent.
    ///
    /// On a hit the factory (and whatever construction arguments it
    /// captured) is dropped without being called.
    pub fn put<T, F, E>(&self, tag: Option<&str>, factory: F) -> Result<Put<T>, CacheError>
    where
        T: Controller,
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        self.put_keyed(&ControllerKey::of::<T>(tag), factory)
    }

    pub(crate) fn put_keyed<T, F, E>(
        &self,
        key: &ControllerKey,
        factory: F,
    ) -> Result<Put<T>, CacheError>
    where
        T: Controller,
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        if let Some(existing) = lock(&self.entries).get(key) {
            return downcast(key, existing).map(Put::Existing);
        }

        let fresh = factory().map_err(|e| CacheError::Construction {
            key: key.clone(),
            source: e.into(),
        })?;
        let fresh = Arc::new(fresh);

        match lock(&self.entries).entry(key.clone()) {
            Entry::Occupied(o) => downcast(key, o.get()).map(Put::Existing),
            Entry::Vacant(v) => {
                v.insert(fresh.clone());
                Ok(Put::Created(fresh))
            }
        }
    }

    /// Returns the instance stored under `T`'s key with `tag`, if any.
    pub fn get<T: Controller>(&self, tag: Option<&str>) -> Result<Option<Arc<T>>, CacheError> {
        let key = ControllerKey::of::<T>(tag);
        lock(&self.entries)
            .get(&key)
            .map(|inst| downcast(&key, inst))
            .transpose()
    }

    /// Removes the entry for `key`. Returns true if one was present.
    pub fn delete(&self, key: &ControllerKey) -> bool {
        self.take(key).is_some()
    }

    /// Removes and returns the entry for `key`.
    pub(crate) fn take(&self, key: &ControllerKey) -> Option<Instance> {
        lock(&self.entries).remove(key)
    }

    /// Returns true if an entry exists for `key`.
    pub fn contains(&self, key: &ControllerKey) -> bool {
        lock(&self.entries).contains_key(key)
    }

    /// Returns the sorted list of stored keys.
    pub fn keys(&self) -> Vec<ControllerKey> {
        let mut keys: Vec<ControllerKey> = lock(&self.entries).keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the number of stored instances.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

fn downcast<T: Controller>(key: &ControllerKey, inst: &Instance) -> Result<Arc<T>, CacheError> {
    Arc::clone(inst)
        .into_any()
        .downcast::<T>()
        .map_err(|_| CacheError::TypeMismatch {
            key: key.clone(),
            expected: std::any::type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counter {
        start: u64,
    }

    impl Controller for Counter {
        const KIND: &'static str = "Counter";
    }

    #[derive(Debug)]
    struct Impostor;

    impl Controller for Impostor {
        const KIND: &'static str = "Counter";
    }

    fn counter(start: u64) -> impl FnOnce() -> Result<Counter, Infallible> {
        move || Ok(Counter { start })
    }

    #[test]
    fn first_put_creates_later_puts_reuse() {
        let reg = Registry::new();
        let first = reg.put(Some("a"), counter(1)).unwrap();
        assert!(first.is_created());

        let second = reg.put(Some("a"), counter(99)).unwrap();
        assert!(!second.is_created());

        let (first, second) = (first.into_inner(), second.into_inner());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.start, 1, "construction args only apply on first creation");
    }

    #[test]
    fn tags_separate_instances() {
        let reg = Registry::new();
        let a = reg.put(Some("a"), counter(1)).unwrap().into_inner();
        let b = reg.put(Some("b"), counter(1)).unwrap().into_inner();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(
            reg.keys(),
            vec![
                ControllerKey::new("Counter", Some("a")),
                ControllerKey::new("Counter", Some("b"))
            ]
        );
    }

    #[test]
    fn factory_error_stores_nothing() {
        let reg = Registry::new();
        let err = reg
            .put::<Counter, _, _>(Some("a"), || Err("no backend"))
            .unwrap_err();
        assert!(matches!(err, CacheError::Construction { .. }));
        assert!(reg.is_empty());
    }

    #[test]
    fn same_kind_different_type_is_a_mismatch() {
        let reg = Registry::new();
        reg.put(None, counter(0)).unwrap();
        let err = reg
            .put::<Impostor, _, _>(None, || Ok::<_, Infallible>(Impostor))
            .unwrap_err();
        assert!(matches!(err, CacheError::TypeMismatch { .. }));
    }

    #[test]
    fn delete_is_unconditional_and_idempotent() {
        let reg = Registry::new();
        reg.put(Some("a"), counter(0)).unwrap();
        let key = ControllerKey::new("Counter", Some("a"));
        assert!(reg.delete(&key));
        assert!(!reg.delete(&key));
        assert!(reg.get::<Counter>(Some("a")).unwrap().is_none());
    }

    #[test]
    fn concurrent_puts_share_one_instance() {
        let reg = Arc::new(Registry::new());
        let built = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let built = Arc::clone(&built);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    reg.put(Some("shared"), move || {
                        built.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Infallible>(Counter { start: 0 })
                    })
                    .unwrap()
                    .into_inner()
                })
            })
            .collect();

        let instances: Vec<Arc<Counter>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(reg.len(), 1);
        assert!(built.load(Ordering::SeqCst) >= 1);
    }
}
