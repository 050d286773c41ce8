//! Controllers: the shared units the cache hands out.
//!
//! ## Contents
//! - [`Controller`] trait implemented by every cacheable type
//! - [`ControllerKey`] the `(kind, tag)` identity of one instance

mod controller;
mod key;

pub use controller::Controller;
pub use key::ControllerKey;
