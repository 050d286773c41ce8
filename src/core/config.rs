//! # Cache configuration.
//!
//! Provides [`CacheConfig`], the settings fixed when a
//! [`ControllerCache`](crate::ControllerCache) is built (or when the
//! process-wide instance is created with [`init`](crate::init)).
//!
//! ## Sentinel values
//! - `grace = 0s` → eviction runs on the next timer tick after the last detach
//! - `bus_capacity = 0` → clamped to 1 by the bus

use std::time::Duration;

/// Configuration for the controller cache.
///
/// ## Field semantics
/// - `grace`: delay between the last consumer detaching and the instance being evicted
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Grace period before an unreferenced controller is evicted.
    ///
    /// Absorbs asynchronous work that outlives the consumer which started it
    /// and fast detach/attach cycles (a consumer being torn down and rebuilt).
    /// It is a tuning knob, not a correctness parameter: only a fresh attach
    /// resets it.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl CacheConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a copy with the given grace period.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl Default for CacheConfig {
    /// Default configuration:
    ///
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(5000),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.grace, Duration::from_secs(5));
        assert_eq!(cfg.bus_capacity_clamped(), 1024);

        let cfg = CacheConfig {
            bus_capacity: 0,
            ..cfg.with_grace(Duration::ZERO)
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.grace, Duration::ZERO);
    }
}
