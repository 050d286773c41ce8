//! # Process-wide cache instance.
//!
//! [`init`] creates the singleton once (with its grace period) and
//! [`global`] returns it. There is no teardown beyond
//! [`ControllerCache::shutdown`]; the instance lives until process exit.

use std::sync::{Arc, OnceLock};

use crate::core::{CacheConfig, ControllerCache};
use crate::error::CacheError;
use crate::subscribers::Subscribe;

static GLOBAL: OnceLock<Arc<ControllerCache>> = OnceLock::new();

/// Creates the process-wide cache.
///
/// Must be called once, from within a tokio runtime that outlives every
/// consumer. A second call returns [`CacheError::AlreadyInitialized`].
pub fn init(cfg: CacheConfig) -> Result<Arc<ControllerCache>, CacheError> {
    init_with_subscribers(cfg, Vec::new())
}

/// Like [`init`], with event subscribers attached.
pub fn init_with_subscribers(
    cfg: CacheConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
) -> Result<Arc<ControllerCache>, CacheError> {
    if GLOBAL.get().is_some() {
        return Err(CacheError::AlreadyInitialized);
    }
    let cache = ControllerCache::builder(cfg)
        .with_subscribers(subscribers)
        .build()?;

    GLOBAL
        .set(Arc::clone(&cache))
        .map_err(|_| CacheError::AlreadyInitialized)?;
    Ok(cache)
}

/// Returns the process-wide cache created by [`init`].
pub fn global() -> Result<Arc<ControllerCache>, CacheError> {
    GLOBAL.get().cloned().ok_or(CacheError::NotInitialized)
}
