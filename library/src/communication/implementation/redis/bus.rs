use super::super::super::super::lifecycle::{shutdown_channel, ShutdownTrigger};
use super::super::super::bus::{BusError, BusMessage, ErrorSink, MessageBus, MessageStream, Topic};
use super::topic::{from_redis_channel, is_pattern, to_redis_channel};
use async_trait::async_trait;
use futures::{future, stream, StreamExt};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace};

/// [`MessageBus`] implementation using [Redis Pub/Sub](https://redis.io/topics/pubsub)
///
/// Messages are published through one lazily established multiplexed connection.
/// Every subscribed topic gets a dedicated connection since Redis does not permit
/// regular commands on a connection in subscriber mode. Once [`disconnect`](MessageBus::disconnect)
/// has been called, all subscription streams end and every further publish or
/// subscribe fails with [`BusError::Disconnected`].
pub struct RedisBus {
    client: Client,
    publisher: Mutex<Option<MultiplexedConnection>>,
    closed: ShutdownTrigger,
}

impl RedisBus {
    /// Creates a new bus for the given redis URL without connecting yet
    pub fn open(url: &str) -> Result<Self, BusError> {
        let client = Client::open(url).map_err(BusError::transport)?;
        Ok(Self::new(client))
    }

    /// Creates a new bus from an existing client
    pub fn new(client: Client) -> Self {
        let (closed, _) = shutdown_channel();

        Self {
            client,
            publisher: Mutex::new(None),
            closed,
        }
    }

    async fn publisher(&self) -> Result<MultiplexedConnection, BusError> {
        let mut slot = self.publisher.lock().await;

        // Checked under the lock so a concurrent disconnect can not be followed by a reconnect
        if self.closed.signal().is_triggered() {
            return Err(BusError::Disconnected);
        }

        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone());
        }

        let connection = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(BusError::transport)?;

        debug!("Established publishing connection");
        *slot = Some(connection.clone());

        Ok(connection)
    }

    #[instrument(skip(self, errors))]
    async fn subscribe_topic(&self, topic: &str, errors: ErrorSink) -> Result<MessageStream, BusError> {
        let channel = to_redis_channel(topic);
        let mut pubsub = self
            .client
            .get_async_connection()
            .await
            .map_err(BusError::transport)?
            .into_pubsub();

        if is_pattern(&channel) {
            pubsub.psubscribe(&channel).await
        } else {
            pubsub.subscribe(&channel).await
        }
        .map_err(BusError::transport)?;

        debug!(%channel, "Subscribed to redis channel");

        let mut until_closed = self.closed.signal();
        let closed = until_closed.clone();
        let topic = topic.to_owned();

        let messages = pubsub
            .into_on_message()
            .map(|message| {
                BusMessage::new(
                    from_redis_channel(message.get_channel_name()),
                    message.get_payload_bytes(),
                )
            })
            .take_until(async move { until_closed.triggered().await });

        // A stream ending without a prior disconnect means the connection died
        let end_of_stream = stream::once(async move {
            if !closed.is_triggered() {
                errors.send(BusError::StreamClosed(topic)).ok();
            }
        })
        .filter_map(|_| future::ready(None::<BusMessage>));

        Ok(messages.chain(end_of_stream).boxed())
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn publish_raw(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        if topic.is_empty() {
            return Err(BusError::InvalidTopic(topic.to_owned()));
        }

        let channel = to_redis_channel(topic);
        let mut connection = self.publisher().await?;

        let receivers: usize = connection
            .publish(&channel, payload)
            .await
            .map_err(BusError::transport)?;

        trace!(%channel, receivers, "Published message");

        Ok(())
    }

    async fn subscribe_raw(
        &self,
        topics: &[Topic],
        errors: ErrorSink,
    ) -> Result<Vec<MessageStream>, BusError> {
        if topics.is_empty() {
            return Err(BusError::InvalidTopic(String::new()));
        }

        if let Some(topic) = topics.iter().find(|t| t.is_empty()) {
            return Err(BusError::InvalidTopic(topic.clone()));
        }

        if self.closed.signal().is_triggered() {
            return Err(BusError::Disconnected);
        }

        let mut streams = Vec::with_capacity(topics.len());
        for topic in topics {
            streams.push(self.subscribe_topic(topic, errors.clone()).await?);
        }

        Ok(streams)
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        let mut publisher = self.publisher.lock().await;
        self.closed.trigger();
        publisher.take();
        debug!("Disconnected from redis");
        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::communication::bus::error_channel;

    fn unconnected() -> RedisBus {
        RedisBus::open("redis://127.0.0.1:1/").unwrap()
    }

    #[test]
    fn reject_malformed_urls() {
        assert!(matches!(
            RedisBus::open("definitely not a url"),
            Err(BusError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn reject_empty_topics_before_connecting() {
        let bus = unconnected();
        let (errors, _) = error_channel();

        assert!(matches!(
            bus.publish_raw("", b"data").await,
            Err(BusError::InvalidTopic(_))
        ));
        assert!(matches!(
            bus.subscribe_raw(&[], errors.clone()).await,
            Err(BusError::InvalidTopic(_))
        ));
        assert!(matches!(
            bus.subscribe_raw(&["".into()], errors).await,
            Err(BusError::InvalidTopic(_))
        ));
    }

    #[tokio::test]
    async fn disconnect_without_connection() {
        assert!(unconnected().disconnect().await.is_ok());
    }

    #[tokio::test]
    async fn refuse_reconnecting_after_disconnect() {
        let bus = unconnected();
        let (errors, _) = error_channel();

        bus.disconnect().await.unwrap();

        assert!(matches!(
            bus.publish_raw("xrt/request", b"data").await,
            Err(BusError::Disconnected)
        ));
        assert!(matches!(
            bus.subscribe_raw(&["xrt/reply".into()], errors).await,
            Err(BusError::Disconnected)
        ));
    }
}
