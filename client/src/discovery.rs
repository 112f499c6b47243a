use super::client::{MessageBusClient, Outcome, RequestKind};
use super::error::{ErrorKind, XrtError};
use async_trait::async_trait;
use domain::{Empty, Request, CLIENT_NAME, DISCOVERY_DURATION_OPTION};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Device discovery operations
#[async_trait]
pub trait DiscoveryClient {
    /// Makes the node search for new devices
    ///
    /// Requires [`DiscoveryOptions`](super::DiscoveryOptions). Discovered devices are
    /// announced on the discovery topic, not in the reply.
    async fn trigger_discovery(&self) -> Outcome<()>;
}

#[async_trait]
impl DiscoveryClient for MessageBusClient {
    async fn trigger_discovery(&self) -> Outcome<()> {
        let discovery = self.options().discovery.as_ref().ok_or_else(|| {
            XrtError::new(
                ErrorKind::ContractInvalid,
                "please provide DiscoveryOptions for the discovery request",
            )
        })?;

        let mut options = Map::new();
        options.insert(
            DISCOVERY_DURATION_OPTION.to_owned(),
            Value::from(millis(discovery.duration)),
        );
        options.extend(discovery.extended.clone());

        debug!(?options, "Triggering discovery");
        let request = Request::discovery(CLIENT_NAME, options);

        self.send::<Empty>(RequestKind::Discovery, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap("failed to trigger discovery", e))
    }
}

/// Whole milliseconds of `duration`, saturating at [`u64::MAX`]
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
