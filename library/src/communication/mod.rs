//! Structures to turn an asynchronous message bus into request/response calls
//!
//! The [`bus`] module describes the minimal binary publish/subscribe surface a
//! transport has to offer. Everything in [`request`] builds on top of it to send a
//! message and wait for the replies that reference it, without knowing anything
//! about the transport in use. Concrete transports live in [`implementation`].

pub mod bus;
pub mod implementation;
pub mod request;
