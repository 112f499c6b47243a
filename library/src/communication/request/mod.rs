//! Request/response calls over a publish/subscribe transport
//!
//! A request is registered under its correlation id in the [`CorrelationRegistry`]
//! before it is published. The [`ReplyDispatcher`] listens on the reply topics and
//! forwards every reply to the registration with a matching id, where a
//! [`ResponseCollector`] waits for either exactly one reply or collects all replies
//! arriving within a window. The [`CompositeRequestor`] glues these parts together.

mod collector;
mod dispatcher;
mod registry;
mod requestor;

pub use collector::*;
pub use dispatcher::*;
pub use registry::*;
pub use requestor::*;
