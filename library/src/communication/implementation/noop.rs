//! Transport without binary publish/subscribe capabilities

use super::super::bus::{BusError, ErrorSink, MessageBus, MessageStream, Topic};
use async_trait::async_trait;

/// [`MessageBus`] which rejects every binary operation
///
/// Stands in for transports that only offer structured messaging. Calls fail loudly
/// with [`BusError::Unsupported`] instead of silently dropping data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBus;

#[async_trait]
impl MessageBus for NoopBus {
    async fn publish_raw(&self, _topic: &str, _payload: &[u8]) -> Result<(), BusError> {
        Err(BusError::Unsupported("publish_raw"))
    }

    async fn subscribe_raw(
        &self,
        _topics: &[Topic],
        _errors: ErrorSink,
    ) -> Result<Vec<MessageStream>, BusError> {
        Err(BusError::Unsupported("subscribe_raw"))
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        Ok(())
    }
}
