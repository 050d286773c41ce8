use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::cache::ControllerCache;
use crate::{
    core::CacheConfig,
    error::CacheError,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`ControllerCache`] with optional subscribers.
pub struct CacheBuilder {
    cfg: CacheConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl CacheBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: CacheConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive cache events (constructions, attaches, evictions)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the cache.
    ///
    /// Must be called from within a tokio runtime: grace timers and
    /// subscriber workers are spawned on it.
    pub fn build(self) -> Result<Arc<ControllerCache>, CacheError> {
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();

        let cache = ControllerCache::new_internal(self.cfg, bus.clone(), runtime, runtime_token);

        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus);
            subscriber_listener(&cache, subs);
        }
        Ok(cache)
    }
}

/// Forwards bus events to the subscriber set until the cache shuts down,
/// then lets the workers drain their queues.
fn subscriber_listener(cache: &ControllerCache, subs: SubscriberSet) {
    let mut rx = cache.bus().subscribe();
    let token = cache.runtime_token().clone();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }
        subs.shutdown().await;
    });
}
