use super::error::{ErrorKind, XrtError};
use super::options::ClientOptions;
use super::{ComponentClient, DeviceClient, DiscoveryClient, ProfileClient, ScheduleClient};
use async_trait::async_trait;
use domain::{CommonResponse, Request, Response};
use library::communication::bus::{MessageBus, Topic};
use library::communication::request::{
    CompositeRequestor, CorrelationRegistry, ReplyDispatcher, Requestor, ResponseCollector,
    Subscription,
};
use library::lifecycle::{shutdown_channel, ShutdownTrigger};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Message bus shared between the client and its listeners
pub type SharedBus = Arc<dyn MessageBus + Send + Sync>;

/// Result of a management call
///
/// `Ok(None)` means the call has been cancelled by a shutdown of the client before
/// a reply arrived. This is not considered a failure.
pub type Outcome<T> = Result<Option<T>, XrtError>;

/// Client for the XRT management API
#[async_trait]
pub trait XrtClient:
    DeviceClient + ProfileClient + ScheduleClient + DiscoveryClient + ComponentClient
{
    /// Changes the deadline of subsequent requests
    fn set_response_timeout(&self, timeout: Duration);

    /// Cancels all pending calls, stops every listener and disconnects the message bus
    async fn close(&self) -> Result<(), XrtError>;
}

/// How a request is routed and how long it may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    /// Regular request on the request topic
    Plain,
    /// Request which makes the node run a discovery before replying
    Discovery,
    /// Component management request on the command topic
    Command,
}

/// [`XrtClient`] implementation on top of a [`MessageBus`]
pub struct MessageBusClient {
    requestor: CompositeRequestor<SharedBus>,
    request_topic: Topic,
    reply_topic: Topic,
    response_timeout: RwLock<Duration>,
    options: ClientOptions,
    shutdown: ShutdownTrigger,
    dispatcher: Mutex<Option<ReplyDispatcher>>,
}

impl MessageBusClient {
    /// Subscribes the reply topic (and configured auxiliary topics) and returns a ready client
    ///
    /// Must be called from within a tokio runtime as the listeners are spawned right away.
    #[instrument(skip_all)]
    pub async fn new(
        bus: SharedBus,
        request_topic: impl Into<Topic>,
        reply_topic: impl Into<Topic>,
        response_timeout: Duration,
        options: ClientOptions,
    ) -> Result<Self, XrtError> {
        let request_topic = request_topic.into();
        let reply_topic = reply_topic.into();

        let (shutdown, signal) = shutdown_channel();
        let registry = CorrelationRegistry::new();

        let mut subscriptions = vec![Subscription::replies(reply_topic.clone())];
        subscriptions.extend(options.auxiliary_subscriptions());

        let dispatcher =
            ReplyDispatcher::start(&bus, registry.clone(), subscriptions, signal.clone())
                .await
                .map_err(|e| {
                    XrtError::with_source(
                        ErrorKind::Communication,
                        "failed to init subscriptions",
                        e,
                    )
                })?;

        info!(%request_topic, %reply_topic, "Client ready");

        Ok(Self {
            requestor: CompositeRequestor::new(bus, registry, ResponseCollector::new(signal)),
            request_topic,
            reply_topic,
            response_timeout: RwLock::new(response_timeout),
            options,
            shutdown,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Deadline currently applied to plain requests
    pub fn response_timeout(&self) -> Duration {
        *self
            .response_timeout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Topic replies are expected on
    pub fn reply_topic(&self) -> &str {
        &self.reply_topic
    }

    /// Cancels all pending calls and stops the listeners without disconnecting
    ///
    /// Pending calls return `Ok(None)`. Calls made afterwards return `Ok(None)` as well
    /// without publishing anything.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Topic and deadline for a request of the given kind
    pub(crate) fn route(&self, kind: RequestKind) -> Result<(&str, Duration), XrtError> {
        let timeout = self.response_timeout();

        match kind {
            RequestKind::Plain => Ok((self.request_topic.as_str(), timeout)),
            RequestKind::Discovery => {
                let discovery = self.options.discovery.as_ref().ok_or_else(|| {
                    XrtError::new(
                        ErrorKind::ContractInvalid,
                        "please provide DiscoveryOptions for the discovery request",
                    )
                })?;

                let deadline = timeout
                    .checked_add(discovery.duration)
                    .and_then(|t| t.checked_add(discovery.timeout))
                    .ok_or_else(|| {
                        XrtError::new(
                            ErrorKind::ContractInvalid,
                            "discovery duration and timeout exceed the supported deadline",
                        )
                    })?;

                Ok((self.request_topic.as_str(), deadline))
            }
            RequestKind::Command => {
                let command = self.options.command.as_ref().ok_or_else(|| {
                    XrtError::new(
                        ErrorKind::ContractInvalid,
                        "please provide CommandOptions for the command request",
                    )
                })?;

                Ok((command.topic.as_str(), timeout))
            }
        }
    }

    fn is_shut_down(&self) -> bool {
        self.shutdown.signal().is_triggered()
    }

    pub(crate) fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends a request and decodes the body of its reply
    ///
    /// A reply carrying a failure status is reported as [`ErrorKind::Remote`].
    #[instrument(skip(self, request), fields(op = %request.op, request_id = %request.request_id))]
    pub(crate) async fn send<T>(&self, kind: RequestKind, request: &Request) -> Outcome<T>
    where
        T: DeserializeOwned + Send,
    {
        let (topic, timeout) = self.route(kind)?;

        if self.is_shut_down() {
            debug!("Client shut down, not sending request");
            return Ok(None);
        }

        debug!(%topic, ?timeout, "Sending request");

        let reply: Value = match self.requestor.request(topic, request, timeout).await? {
            Some(reply) => reply,
            None => return Ok(None),
        };

        let common = CommonResponse::deserialize(&reply).map_err(|e| {
            XrtError::with_source(ErrorKind::ServerError, "failed to decode the response", e)
        })?;

        if let Some(error) = common.result.error() {
            return Err(error.into());
        }

        let response = Response::<T>::deserialize(reply).map_err(|e| {
            XrtError::with_source(ErrorKind::ServerError, "failed to decode the response", e)
        })?;

        Ok(Some(response.result.body))
    }

    /// Sends a request on the request topic and collects every reply within `window`
    #[instrument(skip(self, request), fields(op = %request.op, request_id = %request.request_id))]
    pub(crate) async fn collect<T>(&self, request: &Request, window: Duration) -> Outcome<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        if self.is_shut_down() {
            debug!("Client shut down, not sending request");
            return Ok(None);
        }

        debug!(topic = %self.request_topic, ?window, "Sending broadcast request");

        Ok(self
            .requestor
            .request_many(&self.request_topic, request, window)
            .await?)
    }
}

#[async_trait]
impl XrtClient for MessageBusClient {
    fn set_response_timeout(&self, timeout: Duration) {
        *self
            .response_timeout
            .write()
            .unwrap_or_else(PoisonError::into_inner) = timeout;
    }

    async fn close(&self) -> Result<(), XrtError> {
        self.shutdown.trigger();

        if let Some(dispatcher) = self.dispatcher.lock().await.take() {
            dispatcher.join().await;
        }

        self.requestor.bus().disconnect().await.map_err(|e| {
            XrtError::with_source(ErrorKind::Communication, "failed to disconnect", e)
        })?;

        info!("Client closed");
        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::super::options::{CommandOptions, DiscoveryOptions};
    use super::*;
    use library::communication::implementation::memory::MemoryBus;
    use pretty_assertions::assert_eq;

    async fn client(options: ClientOptions) -> MessageBusClient {
        MessageBusClient::new(
            Arc::new(MemoryBus::new()),
            "requests",
            "replies",
            Duration::from_millis(100),
            options,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn route_plain_requests_with_response_timeout() {
        let client = client(ClientOptions::default()).await;

        assert_eq!(
            client.route(RequestKind::Plain).unwrap(),
            ("requests", Duration::from_millis(100))
        );
    }

    #[tokio::test]
    async fn extend_deadline_of_discovery_requests() {
        let discovery = DiscoveryOptions::new(Duration::from_millis(300), Duration::from_millis(200));
        let client = client(ClientOptions::new(None, Some(discovery), None)).await;

        assert_eq!(
            client.route(RequestKind::Discovery).unwrap(),
            ("requests", Duration::from_millis(600))
        );
    }

    #[tokio::test]
    async fn reject_discovery_deadlines_beyond_duration_range() {
        let discovery = DiscoveryOptions::new(Duration::MAX, Duration::from_secs(1));
        let client = client(ClientOptions::new(None, Some(discovery), None)).await;

        let error = client.route(RequestKind::Discovery).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::ContractInvalid);
    }

    #[tokio::test]
    async fn route_commands_to_command_topic() {
        let command = CommandOptions::new("commands");
        let client = client(ClientOptions::new(Some(command), None, None)).await;

        assert_eq!(
            client.route(RequestKind::Command).unwrap(),
            ("commands", Duration::from_millis(100))
        );
    }

    #[tokio::test]
    async fn reject_requests_without_required_options() {
        let client = client(ClientOptions::default()).await;

        for kind in [RequestKind::Discovery, RequestKind::Command] {
            let error = client.route(kind).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::ContractInvalid);
        }
    }

    #[tokio::test]
    async fn apply_changed_response_timeout() {
        let discovery = DiscoveryOptions::new(Duration::from_secs(1), Duration::from_secs(1));
        let client = client(ClientOptions::new(None, Some(discovery), None)).await;

        client.set_response_timeout(Duration::from_secs(5));

        assert_eq!(client.response_timeout(), Duration::from_secs(5));
        assert_eq!(
            client.route(RequestKind::Discovery).unwrap().1,
            Duration::from_secs(7)
        );
    }

    #[tokio::test]
    async fn close_idempotently() {
        let client = client(ClientOptions::default()).await;

        client.close().await.unwrap();
        client.close().await.unwrap();
    }
}
