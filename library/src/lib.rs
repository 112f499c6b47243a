//! Independent and project agnostic libraries
//!
//! Nothing in this crate knows about the XRT management API. It provides the
//! building blocks to turn an asynchronous, topic based publish/subscribe
//! transport into request/response calls, plus the transports themselves.
//! Everything domain specific lives in the `domain` and `client` crates.

#![deny(missing_docs)]

pub mod communication;
pub mod lifecycle;

/// Generic error type
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;
