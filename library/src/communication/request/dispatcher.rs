use super::super::super::lifecycle::ShutdownSignal;
use super::super::bus::{error_channel, BusError, BusMessage, ErrorStream, MessageBus, MessageStream, Topic};
use super::CorrelationRegistry;
use futures::StreamExt;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, trace, warn};

/// Callback invoked for every message received on an auxiliary topic
pub type MessageHandler = Arc<dyn Fn(BusMessage) + Send + Sync>;

/// Minimal header every reply carries
#[derive(Deserialize)]
struct ReplyEnvelope {
    #[serde(alias = "RequestId")]
    request_id: String,
}

/// What happens with messages received on a subscribed topic
#[derive(Clone)]
pub enum SubscriptionHandler {
    /// Routes replies to the pending request with a matching correlation id
    Replies,
    /// Passes every message unchanged to a custom callback
    Custom(MessageHandler),
}

impl fmt::Debug for SubscriptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replies => write!(f, "Replies"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Topic together with the handler for its messages
#[derive(Debug, Clone)]
pub struct Subscription {
    topic: Topic,
    handler: SubscriptionHandler,
}

impl Subscription {
    /// Subscription which routes replies into the [`CorrelationRegistry`]
    pub fn replies(topic: impl Into<Topic>) -> Self {
        Self {
            topic: topic.into(),
            handler: SubscriptionHandler::Replies,
        }
    }

    /// Subscription which hands every message to `handler`
    pub fn custom<F>(topic: impl Into<Topic>, handler: F) -> Self
    where
        F: Fn(BusMessage) + Send + Sync + 'static,
    {
        Self {
            topic: topic.into(),
            handler: SubscriptionHandler::Custom(Arc::new(handler)),
        }
    }

    /// Subscription which hands every message to an already shared `handler`
    pub fn shared(topic: impl Into<Topic>, handler: MessageHandler) -> Self {
        Self {
            topic: topic.into(),
            handler: SubscriptionHandler::Custom(handler),
        }
    }

    /// Topic this subscription listens on
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Supervised group of listeners routing inbound messages
///
/// One task runs per subscription plus one draining the transport error stream.
/// All of them stop once the [`ShutdownSignal`] fires or when the dispatcher is dropped.
pub struct ReplyDispatcher {
    tasks: JoinSet<()>,
}

impl ReplyDispatcher {
    /// Subscribes every topic on the bus and spawns the listeners
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start<B>(
        bus: &B,
        registry: CorrelationRegistry,
        subscriptions: Vec<Subscription>,
        shutdown: ShutdownSignal,
    ) -> Result<Self, BusError>
    where
        B: MessageBus + ?Sized,
    {
        let topics = subscriptions
            .iter()
            .map(|s| s.topic.clone())
            .collect::<Vec<_>>();

        let (error_sink, error_stream) = error_channel();
        let streams = bus.subscribe_raw(&topics, error_sink).await?;

        if streams.len() != subscriptions.len() {
            return Err(BusError::transport(MismatchedStreams {
                expected: subscriptions.len(),
                received: streams.len(),
            }));
        }

        let mut tasks = JoinSet::new();

        for (subscription, stream) in subscriptions.into_iter().zip(streams) {
            debug!(topic = %subscription.topic, "Subscription established");
            tasks.spawn(listen(
                subscription,
                stream,
                registry.clone(),
                shutdown.clone(),
            ));
        }

        tasks.spawn(drain_errors(error_stream, shutdown));

        Ok(Self { tasks })
    }

    /// Number of listener tasks which have not yet terminated (including the error drain)
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Waits for every listener to terminate
    ///
    /// Only returns once the shutdown signal has fired or all subscription
    /// streams have ended.
    pub async fn join(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Listener task failed");
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("transport returned {received} streams for {expected} topics")]
struct MismatchedStreams {
    expected: usize,
    received: usize,
}

#[instrument(skip_all, fields(topic = %subscription.topic))]
async fn listen(
    subscription: Subscription,
    mut stream: MessageStream,
    registry: CorrelationRegistry,
    mut shutdown: ShutdownSignal,
) {
    info!("Listening for messages");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.triggered() => break,
            message = stream.next() => match message {
                Some(message) => match &subscription.handler {
                    SubscriptionHandler::Replies => route_reply(&registry, message),
                    SubscriptionHandler::Custom(handler) => handler(message),
                },
                None => {
                    warn!("Subscription stream ended");
                    break;
                }
            }
        }
    }

    info!("Stopped listening");
}

fn route_reply(registry: &CorrelationRegistry, message: BusMessage) {
    let envelope = match serde_json::from_slice::<ReplyEnvelope>(&message.payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(topic = %message.received_topic, error = %e, "Unable to decode reply envelope");
            return;
        }
    };

    let request_id = envelope.request_id;

    match registry.lookup(&request_id) {
        Some(tx) => {
            if tx.send(message.payload).is_err() {
                debug!(%request_id, "Discarding reply to request that stopped waiting");
            } else {
                trace!(%request_id, "Forwarded reply");
            }
        }
        None => debug!(%request_id, "Discarding reply without pending request"),
    }
}

#[instrument(skip_all)]
async fn drain_errors(mut errors: ErrorStream, mut shutdown: ShutdownSignal) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown.triggered() => break,
            failure = errors.recv() => match failure {
                Some(failure) => error!(error = %failure, "Message bus reported a failure"),
                None => break,
            }
        }
    }

    trace!("Stopped draining transport errors");
}

#[cfg(test)]
mod does {
    use super::super::super::bus::ErrorSink;
    use super::*;
    use crate::lifecycle::shutdown_channel;
    use async_trait::async_trait;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Bus handing out manually fed streams
    struct ScriptedBus {
        feeds: Mutex<Vec<mpsc::UnboundedReceiver<BusMessage>>>,
        errors: Mutex<Option<ErrorSink>>,
    }

    impl ScriptedBus {
        fn new(topics: usize) -> (Self, Vec<mpsc::UnboundedSender<BusMessage>>) {
            let (senders, receivers): (Vec<_>, Vec<_>) =
                (0..topics).map(|_| mpsc::unbounded_channel()).unzip();
            let bus = Self {
                feeds: Mutex::new(receivers),
                errors: Mutex::new(None),
            };
            (bus, senders)
        }
    }

    #[async_trait]
    impl MessageBus for ScriptedBus {
        async fn publish_raw(&self, _topic: &str, _payload: &[u8]) -> Result<(), BusError> {
            Ok(())
        }

        async fn subscribe_raw(
            &self,
            _topics: &[Topic],
            errors: ErrorSink,
        ) -> Result<Vec<MessageStream>, BusError> {
            *self.errors.lock().unwrap() = Some(errors);
            Ok(self
                .feeds
                .lock()
                .unwrap()
                .drain(..)
                .map(|rx| {
                    stream::unfold(rx, |mut rx| async move {
                        rx.recv().await.map(|message| (message, rx))
                    })
                    .boxed()
                })
                .collect())
        }

        async fn disconnect(&self) -> Result<(), BusError> {
            Ok(())
        }
    }

    fn reply(id: &str, body: &str) -> BusMessage {
        BusMessage::new(
            "replies",
            format!(r#"{{"RequestId":"{}","Result":"{}"}}"#, id, body),
        )
    }

    #[tokio::test]
    async fn route_replies_by_correlation_id() {
        let (bus, feeds) = ScriptedBus::new(1);
        let (trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();

        let dispatcher = ReplyDispatcher::start(
            &bus,
            registry.clone(),
            vec![Subscription::replies("replies")],
            shutdown,
        )
        .await
        .unwrap();

        let mut first = registry.register("r1").unwrap();
        let mut second = registry.register("r2").unwrap();

        feeds[0].send(reply("r2", "two")).unwrap();
        feeds[0].send(reply("r1", "one")).unwrap();

        assert_eq!(first.recv().await, Some(reply("r1", "one").payload));
        assert_eq!(second.recv().await, Some(reply("r2", "two").payload));

        trigger.trigger();
        dispatcher.join().await;
    }

    #[tokio::test]
    async fn accept_snake_case_envelope() {
        let (bus, feeds) = ScriptedBus::new(1);
        let (_trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();

        let _dispatcher = ReplyDispatcher::start(
            &bus,
            registry.clone(),
            vec![Subscription::replies("replies")],
            shutdown,
        )
        .await
        .unwrap();

        let mut pending = registry.register("r1").unwrap();
        let payload = br#"{"request_id":"r1","result":{"status":"ok"}}"#.to_vec();
        feeds[0].send(BusMessage::new("replies", payload.clone())).unwrap();

        assert_eq!(pending.recv().await, Some(payload));
    }

    #[tokio::test]
    async fn survive_malformed_and_unsolicited_replies() {
        let (bus, feeds) = ScriptedBus::new(1);
        let (_trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();

        let _dispatcher = ReplyDispatcher::start(
            &bus,
            registry.clone(),
            vec![Subscription::replies("replies")],
            shutdown,
        )
        .await
        .unwrap();

        let mut pending = registry.register("r1").unwrap();

        feeds[0].send(BusMessage::new("replies", "not json")).unwrap();
        feeds[0].send(BusMessage::new("replies", r#"{"Result":"ok"}"#)).unwrap();
        feeds[0].send(reply("unknown", "stale")).unwrap();
        feeds[0].send(reply("r1", "ok")).unwrap();

        assert_eq!(pending.recv().await, Some(reply("r1", "ok").payload));
    }

    #[tokio::test]
    async fn discard_replies_after_release() {
        let (bus, feeds) = ScriptedBus::new(1);
        let (_trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();

        let _dispatcher = ReplyDispatcher::start(
            &bus,
            registry.clone(),
            vec![Subscription::replies("replies")],
            shutdown,
        )
        .await
        .unwrap();

        registry.register("r1").unwrap().release();
        feeds[0].send(reply("r1", "late")).unwrap();

        let mut fresh = registry.register("r2").unwrap();
        feeds[0].send(reply("r2", "ok")).unwrap();

        assert_eq!(fresh.recv().await, Some(reply("r2", "ok").payload));
        assert!(!registry.contains("r1"));
    }

    #[tokio::test]
    async fn pass_auxiliary_messages_to_handler() {
        let (bus, feeds) = ScriptedBus::new(2);
        let (_trigger, shutdown) = shutdown_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _dispatcher = ReplyDispatcher::start(
            &bus,
            CorrelationRegistry::new(),
            vec![
                Subscription::replies("replies"),
                Subscription::custom("status", move |message| {
                    tx.send(message).ok();
                }),
            ],
            shutdown,
        )
        .await
        .unwrap();

        let status = BusMessage::new("status/node-1", "online");
        feeds[1].send(status.clone()).unwrap();

        assert_eq!(rx.recv().await, Some(status));
    }

    #[tokio::test]
    async fn stop_every_task_on_shutdown() {
        let (bus, _feeds) = ScriptedBus::new(2);
        let (trigger, shutdown) = shutdown_channel();

        let dispatcher = ReplyDispatcher::start(
            &bus,
            CorrelationRegistry::new(),
            vec![
                Subscription::replies("replies"),
                Subscription::custom("status", |_| {}),
            ],
            shutdown,
        )
        .await
        .unwrap();

        assert_eq!(dispatcher.active_tasks(), 3);

        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), dispatcher.join())
            .await
            .expect("listeners did not stop");
    }

    #[tokio::test]
    async fn reject_mismatched_stream_count() {
        struct ShortBus;

        #[async_trait]
        impl MessageBus for ShortBus {
            async fn publish_raw(&self, _: &str, _: &[u8]) -> Result<(), BusError> {
                Ok(())
            }

            async fn subscribe_raw(
                &self,
                _: &[Topic],
                _: ErrorSink,
            ) -> Result<Vec<MessageStream>, BusError> {
                Ok(vec![stream::empty().boxed()])
            }

            async fn disconnect(&self) -> Result<(), BusError> {
                Ok(())
            }
        }

        let (_trigger, shutdown) = shutdown_channel();
        let result = ReplyDispatcher::start(
            &ShortBus,
            CorrelationRegistry::new(),
            vec![Subscription::replies("a"), Subscription::replies("b")],
            shutdown,
        )
        .await;

        assert!(matches!(result, Err(BusError::Transport(_))));
    }
}
