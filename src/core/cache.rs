//! # ControllerCache: shared instances with grace-period eviction.
//!
//! The [`ControllerCache`] owns the [`Registry`], the reference tracker and
//! the event [`Bus`]. It is the only place where registry and tracker state
//! change, and every change happens inside one critical section guarded by
//! the tracker lock (lock order: tracker → registry).
//!
//! ## Lifecycle of one key
//! ```text
//! acquire(k) ──► registry.put(k)  ──Err──► ConstructionFailed (no count)
//!                     │ Ok
//!                     ▼
//!                tracker.attach(k) ──► cancel pending timer (EvictionCanceled)
//!                     │                 count += 1 (Attached)
//!                     ▼
//!                  Lease<T>
//!                     │ drop
//!                     ▼
//!                tracker.detach(k) ──► count > 0: Detached
//!                     │ count == 0      shut down: Detached, no timer
//!                     ▼
//!                spawn timer(k, generation) ──► EvictionScheduled
//!                     │
//!        ┌────────────┴─────────────┐
//!   attach(k) first            grace elapsed
//!   token cancelled            tracker.fire(k, generation)
//!   (timer exits)                 ├─ Evict → registry.take(k), on_evict() → Evicted
//!                                 ├─ Stale → no-op
//!                                 └─ Live  → InvariantViolation
//! ```
//!
//! ## Rules
//! - Factories run inside the critical section and must not call back into
//!   the same cache; doing so panics instead of deadlocking.
//! - Events are published inside the critical section, so `seq` order and
//!   delivery order both match the order of state changes.
//! - `Controller::on_evict` runs after the lock is released.
//! - Timers run on the runtime captured at build time, so leases may be
//!   dropped from any thread.

use std::cell::Cell;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::controllers::{Controller, ControllerKey};
use crate::core::config::CacheConfig;
use crate::core::lease::Lease;
use crate::core::registry::{Put, Registry};
use crate::core::tracker::{Detached, Fired, RefTracker};
use crate::error::{BoxError, CacheError};
use crate::events::{Bus, Event, EventKind};
use crate::sync::lock;

thread_local! {
    // Address of the cache whose factory is running on this thread (0 = none).
    static BUILDING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running a factory for one cache.
struct BuildScope {
    prev: usize,
}

impl BuildScope {
    fn enter(cache: &ControllerCache) -> Self {
        let prev = BUILDING.with(|b| b.replace(cache.addr()));
        Self { prev }
    }
}

impl Drop for BuildScope {
    fn drop(&mut self) {
        BUILDING.with(|b| b.set(self.prev));
    }
}

/// Keyed, reference-counted store of shared controllers.
pub struct ControllerCache {
    cfg: CacheConfig,
    bus: Bus,
    registry: Registry,
    tracker: Mutex<RefTracker>,
    runtime: Handle,
    runtime_token: CancellationToken,
    me: Weak<ControllerCache>,
}

impl ControllerCache {
    /// Returns a builder for a scoped cache.
    ///
    /// Most applications use the process-wide instance from [`init`](crate::init) instead.
    pub fn builder(cfg: CacheConfig) -> super::builder::CacheBuilder {
        super::builder::CacheBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: CacheConfig,
        bus: Bus,
        runtime: Handle,
        runtime_token: CancellationToken,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            cfg,
            bus,
            registry: Registry::new(),
            tracker: Mutex::new(RefTracker::new()),
            runtime,
            runtime_token,
            me: me.clone(),
        })
    }

    /// Returns the configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.cfg
    }

    /// Subscribes to the event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Obtains the shared `T` for `tag` and registers one consumer.
    ///
    /// If no instance exists, `factory` builds it; otherwise the factory is
    /// dropped unused and the existing instance is returned (first caller's
    /// construction arguments win, a `ControllerReused` event is published).
    ///
    /// The consumer is released when the returned [`Lease`] is dropped.
    ///
    /// # Panics
    /// If `factory` calls back into this cache (acquiring another controller,
    /// dropping a lease, querying counts). The factory runs while the cache
    /// is locked, so such a call could never complete.
    pub fn acquire<T, F, E>(
        self: &Arc<Self>,
        tag: Option<&str>,
        factory: F,
    ) -> Result<Lease<T>, CacheError>
    where
        T: Controller,
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        let key = ControllerKey::of::<T>(tag);
        let controller = self.attach_keyed(&key, factory)?;
        Ok(Lease::new(Arc::clone(self), key, controller))
    }

    /// Like [`acquire`](Self::acquire), but the caller is responsible for
    /// calling [`detach`](Self::detach) exactly once with
    /// `ControllerKey::of::<T>(tag)`.
    pub fn attach_with<T, F, E>(&self, tag: Option<&str>, factory: F) -> Result<Arc<T>, CacheError>
    where
        T: Controller,
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        self.attach_keyed(&ControllerKey::of::<T>(tag), factory)
    }

    fn attach_keyed<T, F, E>(&self, key: &ControllerKey, factory: F) -> Result<Arc<T>, CacheError>
    where
        T: Controller,
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        let mut tracker = self.lock_tracker();
        let put = self.registry.put_keyed::<T, _, E>(key, || {
            let _scope = BuildScope::enter(self);
            factory()
        });
        let put = match put {
            Ok(put) => put,
            Err(err) => {
                self.publish_construction_failure(key, &err);
                return Err(err);
            }
        };

        let attached = tracker.attach(key);
        let kind = match put {
            Put::Created(_) => EventKind::ControllerCreated,
            Put::Existing(_) => EventKind::ControllerReused,
        };
        self.bus.publish(Event::new(kind).with_key(key.to_string()));
        if attached.canceled {
            self.bus
                .publish(Event::new(EventKind::EvictionCanceled).with_key(key.to_string()));
        }
        self.bus.publish(
            Event::new(EventKind::Attached)
                .with_key(key.to_string())
                .with_count(attached.count),
        );
        Ok(put.into_inner())
    }

    /// Registers one more consumer of an instance that is already stored.
    ///
    /// Returns false (and records nothing) if no instance exists for `key`,
    /// so counts never outlive their registry entry.
    pub fn attach(&self, key: &ControllerKey) -> bool {
        let mut tracker = self.lock_tracker();
        if !self.registry.contains(key) {
            return false;
        }
        let attached = tracker.attach(key);
        if attached.canceled {
            self.bus
                .publish(Event::new(EventKind::EvictionCanceled).with_key(key.to_string()));
        }
        self.bus.publish(
            Event::new(EventKind::Attached)
                .with_key(key.to_string())
                .with_count(attached.count),
        );
        true
    }

    /// Releases one consumer of `key`; schedules eviction if it was the last.
    ///
    /// Detaching a key with no recorded consumers is tolerated as a no-op
    /// and reported as an `InvariantViolation` event.
    pub fn detach(&self, key: &ControllerKey) {
        let mut tracker = self.lock_tracker();
        match tracker.detach(key, &self.runtime_token) {
            Detached::Remaining(n) => {
                self.bus.publish(
                    Event::new(EventKind::Detached)
                        .with_key(key.to_string())
                        .with_count(n),
                );
            }
            Detached::Scheduled {
                generation,
                cancel,
                replaced,
            } => {
                if replaced {
                    tracing::warn!(%key, "replaced an eviction timer that should not exist");
                }
                self.bus.publish(
                    Event::new(EventKind::Detached)
                        .with_key(key.to_string())
                        .with_count(0),
                );
                self.bus.publish(
                    Event::new(EventKind::EvictionScheduled)
                        .with_key(key.to_string())
                        .with_delay(self.cfg.grace),
                );
                self.spawn_eviction(key.clone(), generation, cancel);
            }
            Detached::Released => {
                tracing::debug!(%key, "last consumer left after shutdown; entry kept");
                self.bus.publish(
                    Event::new(EventKind::Detached)
                        .with_key(key.to_string())
                        .with_count(0),
                );
            }
            Detached::Untracked => {
                tracing::warn!(%key, "detach for a key with no recorded consumers");
                self.bus.publish(
                    Event::new(EventKind::InvariantViolation)
                        .with_key(key.to_string())
                        .with_reason("detach_untracked_key"),
                );
            }
        }
    }

    /// Removes the instance for `T` with `tag` immediately, regardless of consumers.
    ///
    /// Consumers that still hold a lease keep their `Arc`; their later
    /// detaches follow the normal protocol. Returns true if an entry was removed.
    pub fn remove<T: Controller>(&self, tag: Option<&str>) -> bool {
        let key = ControllerKey::of::<T>(tag);
        let tracker = self.lock_tracker();
        let Some(instance) = self.registry.take(&key) else {
            return false;
        };
        self.bus
            .publish(Event::new(EventKind::ControllerRemoved).with_key(key.to_string()));
        drop(tracker);

        instance.on_evict();
        true
    }

    /// Returns the stored `T` for `tag` without registering a consumer.
    pub fn peek<T: Controller>(&self, tag: Option<&str>) -> Result<Option<Arc<T>>, CacheError> {
        self.registry.get::<T>(tag)
    }

    /// Returns true if an instance is stored for `key`.
    pub fn contains(&self, key: &ControllerKey) -> bool {
        self.registry.contains(key)
    }

    /// Returns the sorted list of stored keys.
    pub fn keys(&self) -> Vec<ControllerKey> {
        self.registry.keys()
    }

    /// Returns the number of live consumers of `key`.
    pub fn ref_count(&self, key: &ControllerKey) -> usize {
        self.lock_tracker().count(key)
    }

    /// Returns true if at least one consumer holds `key`.
    pub fn is_referenced(&self, key: &ControllerKey) -> bool {
        self.lock_tracker().is_tracked(key)
    }

    /// Returns true if an eviction is scheduled for `key`.
    pub fn is_eviction_pending(&self, key: &ControllerKey) -> bool {
        self.lock_tracker().is_pending(key)
    }

    /// Returns the number of scheduled evictions.
    pub fn pending_evictions(&self) -> usize {
        self.lock_tracker().pending_len()
    }

    /// Cancels every pending eviction and stops background listeners.
    ///
    /// Stored instances stay in place; detaches after shutdown no longer
    /// lead to eviction.
    pub fn shutdown(&self) {
        let canceled = {
            let mut tracker = self.lock_tracker();
            self.runtime_token.cancel();
            tracker.cancel_all()
        };
        tracing::debug!(canceled, "controller cache shut down");
    }

    /// Returns true once [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    pub(super) fn bus(&self) -> &Bus {
        &self.bus
    }

    pub(super) fn runtime_token(&self) -> &CancellationToken {
        &self.runtime_token
    }

    fn lock_tracker(&self) -> MutexGuard<'_, RefTracker> {
        let building = BUILDING.with(|b| b.get() == self.addr());
        assert!(
            !building,
            "controller factory called back into the cache that is building it"
        );
        lock(&self.tracker)
    }

    fn addr(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }

    fn spawn_eviction(&self, key: ControllerKey, generation: u64, cancel: CancellationToken) {
        let deadline = tokio::time::Instant::now() + self.cfg.grace;
        let me = self.me.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    if let Some(cache) = me.upgrade() {
                        cache.on_grace_elapsed(&key, generation);
                    }
                }
            }
        });
    }

    fn on_grace_elapsed(&self, key: &ControllerKey, generation: u64) {
        let evicted = {
            let mut tracker = self.lock_tracker();
            match tracker.fire(key, generation) {
                Fired::Evict => match self.registry.take(key) {
                    Some(instance) => {
                        self.bus
                            .publish(Event::new(EventKind::Evicted).with_key(key.to_string()));
                        Some(instance)
                    }
                    None => {
                        self.bus.publish(
                            Event::new(EventKind::EvictionSkipped)
                                .with_key(key.to_string())
                                .with_reason("entry_absent"),
                        );
                        None
                    }
                },
                Fired::Live => {
                    tracing::warn!(%key, generation, "grace timer fired for a referenced key");
                    self.bus.publish(
                        Event::new(EventKind::InvariantViolation)
                            .with_key(key.to_string())
                            .with_reason("timer_fired_while_referenced"),
                    );
                    None
                }
                Fired::Stale => {
                    tracing::debug!(%key, generation, "stale grace timer ignored");
                    None
                }
            }
        };

        if let Some(instance) = evicted {
            instance.on_evict();
        }
    }

    fn publish_construction_failure(&self, key: &ControllerKey, err: &CacheError) {
        let CacheError::Construction { source, .. } = err else {
            return;
        };
        self.bus.publish(
            Event::new(EventKind::ConstructionFailed)
                .with_key(key.to_string())
                .with_reason(source.to_string()),
        );
    }
}

impl Drop for ControllerCache {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}
