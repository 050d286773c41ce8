//! # Controller identity.
//!
//! A [`ControllerKey`] is the pair `(kind, tag)`. It renders as `kind` or
//! `kind-tag`, but the two halves are compared separately, so
//! `("Counter-a", None)` and `("Counter", Some("a"))` are distinct keys.

use std::fmt;
use std::sync::Arc;

use super::Controller;

/// Identity of one logical controller instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerKey {
    kind: &'static str,
    tag: Option<Arc<str>>,
}

impl ControllerKey {
    /// Creates a key from an explicit kind and tag.
    ///
    /// An empty tag is the same as no tag.
    pub fn new(kind: &'static str, tag: Option<&str>) -> Self {
        Self {
            kind,
            tag: tag.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    /// Creates the key of controller type `T` with the given tag.
    pub fn of<T: Controller>(tag: Option<&str>) -> Self {
        Self::new(T::KIND, tag)
    }

    /// Returns the type identifier.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Returns the tag, if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

impl fmt::Display for ControllerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}-{}", self.kind, tag),
            None => f.write_str(self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_kind_and_tag() {
        assert_eq!(ControllerKey::new("Counter", None).to_string(), "Counter");
        assert_eq!(ControllerKey::new("Counter", Some("a")).to_string(), "Counter-a");
        assert_eq!(ControllerKey::new("Counter", Some("")), ControllerKey::new("Counter", None));
    }

    #[test]
    fn same_rendering_different_identity() {
        let joined = ControllerKey::new("Counter-a", None);
        let split = ControllerKey::new("Counter", Some("a"));
        assert_eq!(joined.to_string(), split.to_string());
        assert_ne!(joined, split);
    }
}
