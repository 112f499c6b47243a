//! Wire shapes of the XRT management API
//!
//! Every interaction is a JSON [`Request`] published on a request topic, answered by
//! one [`Response`] (or one per node for broadcast requests) on a reply topic. The
//! two are linked by the `request_id` field which doubles as correlation id.

#![deny(missing_docs)]

mod component;
mod device;
mod profile;
mod request;
mod response;
mod schedule;

pub use component::*;
pub use device::*;
pub use profile::*;
pub use request::*;
pub use response::*;
pub use schedule::*;

/// Name under which requests from this crate identify themselves
pub const CLIENT_NAME: &str = "xrt-rust-client";
