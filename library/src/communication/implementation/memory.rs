//! In-process transport backed by [`tokio::sync::broadcast`] channels

use super::super::bus::{BusError, BusMessage, ErrorSink, MessageBus, MessageStream, Topic};
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 1024;

/// Loopback [`MessageBus`] delivering every published message to all current subscribers of its topic
///
/// Topics are matched exactly. Messages published to a topic nobody subscribed to are dropped.
#[derive(Debug)]
pub struct MemoryBus {
    capacity: usize,
    channels: Mutex<HashMap<Topic, broadcast::Sender<BusMessage>>>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryBus {
    /// Creates a new bus with a default per-topic buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new bus which buffers at most `capacity` messages per topic and slow subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<Topic, broadcast::Sender<BusMessage>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe_topic(&self, topic: &str, errors: ErrorSink) -> MessageStream {
        let rx = self
            .channels()
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        stream::unfold((rx, errors), |(mut rx, errors)| async move {
            loop {
                match rx.recv().await {
                    Ok(message) => return Some((message, (rx, errors))),
                    Err(RecvError::Lagged(skipped)) => {
                        errors.send(BusError::transport(RecvError::Lagged(skipped))).ok();
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish_raw(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        if topic.is_empty() {
            return Err(BusError::InvalidTopic(topic.to_owned()));
        }

        let channels = self.channels();
        match channels.get(topic) {
            Some(tx) => {
                let receivers = tx.send(BusMessage::new(topic, payload)).unwrap_or(0);
                trace!(topic, receivers, "Published message");
            }
            None => trace!(topic, "Dropped message without subscribers"),
        }

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

        Ok(topics
            .iter()
            .map(|topic| self.subscribe_topic(topic, errors.clone()))
            .collect())
    }

    /// Closes every topic, ending all subscription streams
    async fn disconnect(&self) -> Result<(), BusError> {
        self.channels().clear();
        Ok(())
    }
}
