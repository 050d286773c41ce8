//! Error types used by the controller cache.
//!
//! [`CacheError`] covers everything a caller can observe as a failure:
//! a controller factory failing, a key occupied by a different Rust type,
//! and misuse of the process-wide instance.
//!
//! Like the runtime events, each variant has a stable snake_case label
//! ([`CacheError::as_label`]) for logs/metrics.

use thiserror::Error;

use crate::controllers::ControllerKey;

/// Boxed error produced by a controller factory.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the controller cache.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CacheError {
    /// The factory for a new controller failed; nothing was stored and no
    /// consumer was counted for the key.
    #[error("failed to construct controller {key}: {source}")]
    Construction {
        /// Key the controller would have been stored under.
        key: ControllerKey,
        /// Error returned by the factory.
        source: BoxError,
    },

    /// The key is occupied by a controller of another Rust type.
    ///
    /// Only reachable when two controller types declare the same `KIND`.
    #[error("controller {key} is registered with a type other than {expected}")]
    TypeMismatch {
        /// Key that was looked up.
        key: ControllerKey,
        /// Rust type the caller asked for.
        expected: &'static str,
    },

    /// [`init`](crate::init) was called more than once.
    #[error("controller cache already initialized")]
    AlreadyInitialized,

    /// [`global`](crate::global) was called before [`init`](crate::init).
    #[error("controller cache not initialized")]
    NotInitialized,

    /// The cache was built outside a tokio runtime; grace timers need one.
    #[error("no tokio runtime available to drive grace timers")]
    NoRuntime,
}

impl CacheError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use ctrlcache::CacheError;
    ///
    /// assert_eq!(CacheError::NotInitialized.as_label(), "cache_not_initialized");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CacheError::Construction { .. } => "controller_construction_failed",
            CacheError::TypeMismatch { .. } => "controller_type_mismatch",
            CacheError::AlreadyInitialized => "cache_already_initialized",
            CacheError::NotInitialized => "cache_not_initialized",
            CacheError::NoRuntime => "cache_no_runtime",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CacheError::Construction { key, source } => format!("construct {key}: {source}"),
            CacheError::TypeMismatch { key, expected } => {
                format!("type mismatch for {key}; expected {expected}")
            }
            CacheError::AlreadyInitialized => "already initialized".to_string(),
            CacheError::NotInitialized => "not initialized".to_string(),
            CacheError::NoRuntime => "no tokio runtime".to_string(),
        }
    }

    /// Returns the key involved, if the error is about a specific controller.
    pub fn key(&self) -> Option<&ControllerKey> {
        match self {
            CacheError::Construction { key, .. } | CacheError::TypeMismatch { key, .. } => {
                Some(key)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_error_keeps_source() {
        let err = CacheError::Construction {
            key: ControllerKey::new("Counter", Some("a")),
            source: "boom".into(),
        };
        assert_eq!(err.as_label(), "controller_construction_failed");
        assert_eq!(err.to_string(), "failed to construct controller Counter-a: boom");
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.key().map(ToString::to_string).as_deref(), Some("Counter-a"));
    }

    #[test]
    fn runtime_errors_have_no_key() {
        assert!(CacheError::NoRuntime.key().is_none());
        assert_eq!(CacheError::AlreadyInitialized.as_message(), "already initialized");
    }
}
