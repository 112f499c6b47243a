use super::super::super::lifecycle::ShutdownSignal;
use super::super::super::BoxedError;
use super::{CorrelationId, PendingResponse};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, trace};

/// Reasons why waiting for a response did not yield one
#[derive(Debug, Error)]
pub enum WaitError {
    /// No response arrived before the deadline
    #[error("timed out after {after:?} waiting for a response to '{request_id}'")]
    Timeout {
        /// Request which did not receive a reply
        request_id: CorrelationId,
        /// Deadline that elapsed
        after: Duration,
    },
    /// The registry entry vanished while waiting
    #[error("pending request '{0}' was released before a response arrived")]
    Released(CorrelationId),
    /// One of the collected responses could not be decoded
    #[error("unable to decode response to '{request_id}'")]
    Decode {
        /// Request whose reply was malformed
        request_id: CorrelationId,
        /// Decoder failure
        #[source]
        source: BoxedError,
    },
}

/// Waits for replies routed to a [`PendingResponse`]
///
/// Both strategies release the registration exactly once when they return and
/// treat a shutdown as a clean, empty outcome (`Ok(None)`). When several events
/// are ready at the same time, shutdown takes precedence over the deadline, which
/// in turn takes precedence over a delivery.
#[derive(Debug, Clone)]
pub struct ResponseCollector {
    shutdown: ShutdownSignal,
}

impl ResponseCollector {
    /// Creates a new collector that observes the given shutdown signal
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self { shutdown }
    }

    /// Waits for exactly one reply, bounded by `deadline`
    pub async fn collect_one(
        &self,
        mut pending: PendingResponse,
        deadline: Duration,
    ) -> Result<Option<Vec<u8>>, WaitError> {
        let mut shutdown = self.shutdown.clone();
        let timeout = sleep(deadline);
        tokio::pin!(timeout);

        let outcome = tokio::select! {
            biased;

            _ = shutdown.triggered() => {
                debug!(request_id = pending.id(), "Shutdown while waiting for response");
                Ok(None)
            }
            _ = &mut timeout => Err(WaitError::Timeout {
                request_id: pending.id().to_owned(),
                after: deadline,
            }),
            payload = pending.recv() => match payload {
                Some(payload) => {
                    trace!(request_id = pending.id(), bytes = payload.len(), "Received response");
                    Ok(Some(payload))
                }
                None => Err(WaitError::Released(pending.id().to_owned())),
            },
        };

        pending.release();
        outcome
    }

    /// Collects every reply that arrives within `window`, in arrival order
    ///
    /// Each payload is decoded as it arrives. A single decode failure aborts the whole
    /// call and discards everything collected so far. An empty window is not an error.
    pub async fn collect_many<T, E, D>(
        &self,
        mut pending: PendingResponse,
        window: Duration,
        mut decode: D,
    ) -> Result<Option<Vec<T>>, WaitError>
    where
        D: FnMut(&[u8]) -> Result<T, E>,
        E: Into<BoxedError>,
    {
        let mut shutdown = self.shutdown.clone();
        let timeout = sleep(window);
        tokio::pin!(timeout);

        let mut collected = Vec::new();

        let outcome = loop {
            tokio::select! {
                biased;

                _ = shutdown.triggered() => {
                    debug!(request_id = pending.id(), "Shutdown while collecting responses");
                    break Ok(None);
                }
                _ = &mut timeout => break Ok(Some(std::mem::take(&mut collected))),
                payload = pending.recv() => match payload {
                    Some(payload) => match decode(&payload) {
                        Ok(item) => collected.push(item),
                        Err(e) => {
                            break Err(WaitError::Decode {
                                request_id: pending.id().to_owned(),
                                source: e.into(),
                            })
                        }
                    },
                    // Released from the outside, nothing more will arrive
                    None => break Ok(Some(std::mem::take(&mut collected))),
                },
            }
        };

        trace!(
            request_id = pending.id(),
            collected = outcome.as_ref().map(|o| o.as_ref().map(Vec::len)).ok().flatten(),
            "Finished collecting responses"
        );

        pending.release();
        outcome
    }
}

#[cfg(test)]
mod does {
    use super::super::CorrelationRegistry;
    use super::*;
    use crate::lifecycle::shutdown_channel;
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    fn deliver_after(registry: &CorrelationRegistry, id: &'static str, schedule: Vec<(u64, &'static str)>) {
        let registry = registry.clone();
        tokio::spawn(async move {
            let start = Instant::now();
            for (at, payload) in schedule {
                tokio::time::sleep_until(start + Duration::from_millis(at)).await;
                if let Some(tx) = registry.lookup(id) {
                    tx.send(payload.as_bytes().to_vec()).ok();
                }
            }
        });
    }

    fn parse(bytes: &[u8]) -> Result<String, std::str::Utf8Error> {
        std::str::from_utf8(bytes).map(ToOwned::to_owned)
    }

    #[tokio::test(start_paused = true)]
    async fn return_the_delivered_payload() {
        let (_trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();
        let collector = ResponseCollector::new(shutdown);

        let pending = registry.register("r1").unwrap();
        let reply = r#"{"RequestId":"r1","Result":"ok"}"#;
        deliver_after(&registry, "r1", vec![(10, reply)]);

        let payload = collector
            .collect_one(pending, Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(payload, Some(reply.as_bytes().to_vec()));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn time_out_without_reply() {
        let (_trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();
        let collector = ResponseCollector::new(shutdown);

        let pending = registry.register("r2").unwrap();
        let start = Instant::now();

        let error = collector
            .collect_one(pending, Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(error, WaitError::Timeout { ref request_id, .. } if request_id == "r2"));
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(!registry.contains("r2"));
    }

    #[tokio::test(start_paused = true)]
    async fn return_nothing_on_shutdown() {
        let (trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();
        let collector = ResponseCollector::new(shutdown);

        let pending = registry.register("r3").unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.trigger();
        });

        let payload = collector
            .collect_one(pending, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(payload, None);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn prefer_shutdown_over_timeout_and_delivery() {
        let (trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();
        let collector = ResponseCollector::new(shutdown);

        let pending = registry.register("r4").unwrap();
        registry.lookup("r4").unwrap().send(b"ready".to_vec()).unwrap();
        trigger.trigger();

        let payload = collector
            .collect_one(pending, Duration::from_millis(10))
            .await
            .unwrap();

        assert_eq!(payload, None);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn report_external_release() {
        let (_trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();
        let collector = ResponseCollector::new(shutdown);

        let pending = registry.register("r6").unwrap();
        registry.release("r6");

        let result = collector.collect_one(pending, Duration::from_secs(1)).await;

        assert!(matches!(result, Err(WaitError::Released(id)) if id == "r6"));
    }

    #[tokio::test(start_paused = true)]
    async fn collect_replies_in_arrival_order() {
        let (_trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();
        let collector = ResponseCollector::new(shutdown);

        let pending = registry.register("d1").unwrap();
        deliver_after(
            &registry,
            "d1",
            vec![(50, "first"), (120, "second"), (400, "third"), (600, "late")],
        );

        let start = Instant::now();
        let collected = collector
            .collect_many(pending, Duration::from_millis(500), parse)
            .await
            .unwrap();

        assert_eq!(
            collected,
            Some(vec!["first".to_owned(), "second".to_owned(), "third".to_owned()])
        );
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn collect_nothing_within_quiet_window() {
        let (_trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();
        let collector = ResponseCollector::new(shutdown);

        let pending = registry.register("d2").unwrap();

        let collected = collector
            .collect_many(pending, Duration::from_millis(200), parse)
            .await
            .unwrap();

        assert_eq!(collected, Some(Vec::new()));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abort_collection_on_malformed_reply() {
        let (_trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();
        let collector = ResponseCollector::new(shutdown);

        let pending = registry.register("d3").unwrap();
        let tx = registry.lookup("d3").unwrap();
        tx.send(b"valid".to_vec()).unwrap();
        tx.send(vec![0xff, 0xfe]).unwrap();

        let result = collector
            .collect_many(pending, Duration::from_millis(200), parse)
            .await;

        assert!(matches!(result, Err(WaitError::Decode { ref request_id, .. }) if request_id == "d3"));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_collecting_on_shutdown() {
        let (trigger, shutdown) = shutdown_channel();
        let registry = CorrelationRegistry::new();
        let collector = ResponseCollector::new(shutdown);

        let pending = registry.register("d4").unwrap();
        deliver_after(&registry, "d4", vec![(10, "first")]);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.trigger();
        });

        let collected = collector
            .collect_many(pending, Duration::from_secs(1), parse)
            .await
            .unwrap();

        assert_eq!(collected, None);
        assert!(registry.is_empty());
    }
}
