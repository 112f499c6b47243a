//! Trait implementations using [`redis`](::redis) publish/subscribe

mod bus;
mod topic;

pub use bus::*;
pub use topic::*;
