//! Optional client capabilities
//!
//! A client constructed with [`ClientOptions::default`] can only issue plain requests.
//! Command requests require [`CommandOptions`], discovery requests require
//! [`DiscoveryOptions`]. Calls lacking their options fail before anything is published.

use library::communication::bus::{BusMessage, Topic};
use library::communication::request::{MessageHandler, Subscription};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Optional capabilities of a client
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Topic override for component management requests
    pub command: Option<CommandOptions>,
    /// Settings for discovery requests and discovery notifications
    pub discovery: Option<DiscoveryOptions>,
    /// Subscription to node status notifications
    pub status: Option<StatusOptions>,
}

impl ClientOptions {
    /// Bundles the given options
    pub fn new(
        command: Option<CommandOptions>,
        discovery: Option<DiscoveryOptions>,
        status: Option<StatusOptions>,
    ) -> Self {
        Self {
            command,
            discovery,
            status,
        }
    }

    /// Auxiliary subscriptions which have both a topic and a handler configured
    pub(crate) fn auxiliary_subscriptions(&self) -> Vec<Subscription> {
        let discovery = self
            .discovery
            .as_ref()
            .and_then(|d| subscription(&d.topic, d.handler.as_ref()));
        let status = self
            .status
            .as_ref()
            .and_then(|s| subscription(&s.topic, s.handler.as_ref()));

        discovery.into_iter().chain(status).collect()
    }
}

fn subscription(topic: &str, handler: Option<&MessageHandler>) -> Option<Subscription> {
    match handler {
        Some(handler) if !topic.is_empty() => Some(Subscription::shared(topic, handler.clone())),
        _ => None,
    }
}

/// Settings for requests that manage components
#[derive(Debug, Clone)]
pub struct CommandOptions {
    /// Topic component management requests are published on
    pub topic: Topic,
}

impl CommandOptions {
    /// Publishes component management requests on `topic`
    pub fn new(topic: impl Into<Topic>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

/// Settings for requests that trigger a discovery run on the node
#[derive(Clone)]
pub struct DiscoveryOptions {
    /// Topic on which the node announces discovered devices
    pub topic: Topic,
    /// Receives every discovery announcement
    pub handler: Option<MessageHandler>,
    /// How long the node searches for devices
    pub duration: Duration,
    /// Additional time the node may take to finish a discovery run
    pub timeout: Duration,
    /// Extra options sent along with a discovery trigger
    pub extended: Map<String, Value>,
}

impl DiscoveryOptions {
    /// Creates options without a discovery subscription
    pub fn new(duration: Duration, timeout: Duration) -> Self {
        Self {
            topic: Topic::new(),
            handler: None,
            duration,
            timeout,
            extended: Map::new(),
        }
    }

    /// Subscribes `topic` and passes each announcement to `handler`
    pub fn with_subscription<F>(mut self, topic: impl Into<Topic>, handler: F) -> Self
    where
        F: Fn(BusMessage) + Send + Sync + 'static,
    {
        self.topic = topic.into();
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Adds an option to every discovery trigger
    pub fn with_extended_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extended.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for DiscoveryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryOptions")
            .field("topic", &self.topic)
            .field("handler", &self.handler.is_some())
            .field("duration", &self.duration)
            .field("timeout", &self.timeout)
            .field("extended", &self.extended)
            .finish()
    }
}

/// Subscription to status notifications of nodes
#[derive(Clone)]
pub struct StatusOptions {
    /// Topic on which nodes publish their status
    pub topic: Topic,
    /// Receives every status notification
    pub handler: Option<MessageHandler>,
}

impl StatusOptions {
    /// Subscribes `topic` and passes each notification to `handler`
    pub fn new<F>(topic: impl Into<Topic>, handler: F) -> Self
    where
        F: Fn(BusMessage) + Send + Sync + 'static,
    {
        Self {
            topic: topic.into(),
            handler: Some(Arc::new(handler)),
        }
    }
}

impl fmt::Debug for StatusOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusOptions")
            .field("topic", &self.topic)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    fn topics(options: &ClientOptions) -> Vec<String> {
        options
            .auxiliary_subscriptions()
            .iter()
            .map(|s| s.topic().to_owned())
            .collect()
    }

    #[test]
    fn subscribe_nothing_by_default() {
        assert!(topics(&ClientOptions::default()).is_empty());
    }

    #[test]
    fn subscribe_topics_with_handlers() {
        let options = ClientOptions::new(
            Some(CommandOptions::new("commands")),
            Some(
                DiscoveryOptions::new(Duration::from_secs(1), Duration::from_secs(1))
                    .with_subscription("discovery", |_| {}),
            ),
            Some(StatusOptions::new("status", |_| {})),
        );

        assert_eq!(topics(&options), vec!["discovery".to_owned(), "status".to_owned()]);
    }

    #[test]
    fn skip_incomplete_subscriptions() {
        let mut status = StatusOptions::new("status", |_| {});
        status.handler = None;

        let options = ClientOptions::new(
            None,
            Some(
                DiscoveryOptions::new(Duration::from_secs(1), Duration::from_secs(1))
                    .with_subscription("", |_| {}),
            ),
            Some(status),
        );

        assert!(topics(&options).is_empty());
    }
}
