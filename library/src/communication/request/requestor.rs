use super::super::super::BoxedError;
use super::super::bus::{BusError, MessageBus};
use super::{CorrelationRegistry, RegistryError, ResponseCollector, WaitError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Error type for sending requests
#[derive(Error, Debug)]
pub enum RequestError {
    /// The request could not be serialized
    #[error("unable to encode request")]
    EncodingFailure(#[source] BoxedError),
    /// Another request with the same correlation id is still in flight
    #[error("unable to register request")]
    RegistrationFailure(#[from] RegistryError),
    /// Publishing of the request failed
    #[error("sending of request failed")]
    SendingFailure(#[source] BusError),
    /// No usable response arrived
    #[error("unable to collect responses")]
    ResponseCollectionFailed(#[from] WaitError),
    /// A response was received but could not be parsed
    #[error("response not decodable")]
    ReceptionFailed(#[source] BoxedError),
}

impl RequestError {
    /// Whether the request failed because no response arrived in time
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ResponseCollectionFailed(WaitError::Timeout { .. })
        )
    }
}

/// Outgoing message which carries its own correlation id
pub trait CorrelatedRequest {
    /// Correlation id replies to this request will reference
    fn request_id(&self) -> &str;
}

/// Sends raw payloads and waits for raw replies
///
/// A return value of `Ok(None)` indicates that the wait has been cancelled by a shutdown.
#[async_trait]
pub trait RawRequestor {
    /// Publishes `payload` to `topic` and waits up to `timeout` for exactly one reply
    async fn request_raw(
        &self,
        topic: &str,
        request_id: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, RequestError>;

    /// Publishes `payload` to `topic` and decodes every reply received within `window`
    async fn collect_raw<T, E, D>(
        &self,
        topic: &str,
        request_id: &str,
        payload: &[u8],
        window: Duration,
        decode: D,
    ) -> Result<Option<Vec<T>>, RequestError>
    where
        T: Send,
        E: Into<BoxedError> + Send,
        D: FnMut(&[u8]) -> Result<T, E> + Send;
}

/// Strongly typed request/response calls
#[async_trait]
pub trait Requestor {
    /// Sends a request and awaits its single response
    async fn request<Q, R>(
        &self,
        topic: &str,
        request: &Q,
        timeout: Duration,
    ) -> Result<Option<R>, RequestError>
    where
        Q: CorrelatedRequest + Serialize + Send + Sync,
        R: DeserializeOwned + Send;

    /// Sends a request and collects all responses arriving within `window`
    ///
    /// Receiving no response at all is not an error.
    async fn request_many<Q, R>(
        &self,
        topic: &str,
        request: &Q,
        window: Duration,
    ) -> Result<Option<Vec<R>>, RequestError>
    where
        Q: CorrelatedRequest + Serialize + Send + Sync,
        R: DeserializeOwned + Send;
}

/// [`RawRequestor`] implementation by combining a [`MessageBus`], [`CorrelationRegistry`] and [`ResponseCollector`]
///
/// Replies only reach the registry if a [`ReplyDispatcher`](super::ReplyDispatcher)
/// for the reply topic is running on the same registry.
pub struct CompositeRequestor<B> {
    bus: B,
    registry: CorrelationRegistry,
    collector: ResponseCollector,
}

impl<B> CompositeRequestor<B>
where
    B: MessageBus,
{
    /// Creates a new instance from raw parts
    pub fn new(bus: B, registry: CorrelationRegistry, collector: ResponseCollector) -> Self {
        Self {
            bus,
            registry,
            collector,
        }
    }

    /// Underlying message bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Registry shared with the reply dispatcher
    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }
}

#[async_trait]
impl<B> RawRequestor for CompositeRequestor<B>
where
    B: MessageBus + Send + Sync,
{
    #[instrument(skip(self, payload, timeout), fields(bytes = payload.len()))]
    async fn request_raw(
        &self,
        topic: &str,
        request_id: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, RequestError> {
        // Registered ahead of publishing so that an early reply can not get lost
        let pending = self.registry.register(request_id)?;

        self.bus
            .publish_raw(topic, payload)
            .await
            .map_err(RequestError::SendingFailure)?;

        debug!(?timeout, "Awaiting response");

        Ok(self.collector.collect_one(pending, timeout).await?)
    }

    #[instrument(skip(self, payload, window, decode), fields(bytes = payload.len()))]
    async fn collect_raw<T, E, D>(
        &self,
        topic: &str,
        request_id: &str,
        payload: &[u8],
        window: Duration,
        decode: D,
    ) -> Result<Option<Vec<T>>, RequestError>
    where
        T: Send,
        E: Into<BoxedError> + Send,
        D: FnMut(&[u8]) -> Result<T, E> + Send,
    {
        let pending = self.registry.register(request_id)?;

        self.bus
            .publish_raw(topic, payload)
            .await
            .map_err(RequestError::SendingFailure)?;

        debug!(?window, "Collecting responses");

        Ok(self.collector.collect_many(pending, window, decode).await?)
    }
}

impl<B> super::super::implementation::json::JsonRequestor for CompositeRequestor<B> where
    B: MessageBus + Send + Sync
{
}
