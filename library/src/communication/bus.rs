//! Raw publish/subscribe contract every transport has to fulfil

use super::super::BoxedError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Name of a channel on the message bus
pub type Topic = String;

/// Stream of messages received on a single subscribed topic
pub type MessageStream = BoxStream<'static, BusMessage>;

/// Channel into which transports push failures that are not tied to a single message
pub type ErrorSink = mpsc::UnboundedSender<BusError>;

/// Receiving side of an [`ErrorSink`]
pub type ErrorStream = mpsc::UnboundedReceiver<BusError>;

/// Creates a linked [`ErrorSink`] and [`ErrorStream`]
pub fn error_channel() -> (ErrorSink, ErrorStream) {
    mpsc::unbounded_channel()
}

/// Opaque payload together with the topic it has been received on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Concrete topic the message arrived on (may differ from a wildcard subscription)
    pub received_topic: Topic,
    /// Raw message content
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Creates a new message from raw parts
    pub fn new(received_topic: impl Into<Topic>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            received_topic: received_topic.into(),
            payload: payload.into(),
        }
    }
}

/// Failures reported by [`MessageBus`] implementations
#[derive(Debug, Error)]
pub enum BusError {
    /// The transport does not provide binary publish/subscribe
    #[error("operation {0} is not supported by this transport")]
    Unsupported(&'static str),
    /// Topic name rejected by the transport
    #[error("invalid topic '{0}'")]
    InvalidTopic(Topic),
    /// Subscription stream of a topic ended unexpectedly
    #[error("subscription to '{0}' has been closed")]
    StreamClosed(Topic),
    /// The bus has been disconnected and can not be used anymore
    #[error("message bus has been disconnected")]
    Disconnected,
    /// Underlying transport failed
    #[error("transport failure")]
    Transport(#[source] BoxedError),
}

impl BusError {
    /// Wraps an arbitrary transport error
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(error))
    }
}

/// Binary publish/subscribe transport
///
/// This is the minimum surface the request/response layer requires from a
/// transport. Payloads are opaque bytes, serialization happens further up.
#[async_trait]
pub trait MessageBus {
    /// Publishes an opaque payload to a topic
    async fn publish_raw(&self, topic: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Subscribes to the given topics and returns one stream per topic in the same order.
    ///
    /// Failures which occur after the subscription has been established are pushed into
    /// the `errors` sink instead of terminating the call.
    async fn subscribe_raw(
        &self,
        topics: &[Topic],
        errors: ErrorSink,
    ) -> Result<Vec<MessageStream>, BusError>;

    /// Tears down all connections held by the transport
    async fn disconnect(&self) -> Result<(), BusError>;
}

#[async_trait]
impl<B> MessageBus for Arc<B>
where
    B: MessageBus + Send + Sync + ?Sized,
{
    async fn publish_raw(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        (**self).publish_raw(topic, payload).await
    }

    async fn subscribe_raw(
        &self,
        topics: &[Topic],
        errors: ErrorSink,
    ) -> Result<Vec<MessageStream>, BusError> {
        (**self).subscribe_raw(topics, errors).await
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        (**self).disconnect().await
    }
}
