//! Serialization and deserialization provided by [`serde_json`] using marker traits
//!
//! Implementors of [`RawRequestor`] only move opaque bytes around. By implementing the
//! [`JsonRequestor`] marker trait they receive a default [`Requestor`] implementation
//! which translates between strongly typed requests/responses and their JSON
//! representation.

use super::super::request::{CorrelatedRequest, RawRequestor, RequestError, Requestor};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Marker trait providing a default [`Requestor`] implementation based on [`serde_json`]
pub trait JsonRequestor: RawRequestor + Send + Sync {}

fn encode<Q: Serialize>(request: &Q) -> Result<Vec<u8>, RequestError> {
    serde_json::to_vec(request).map_err(|e| RequestError::EncodingFailure(e.into()))
}

#[async_trait]
impl<T> Requestor for T
where
    T: JsonRequestor,
{
    /// Serializes the request using [`serde_json::to_vec`] and parses the reply using [`serde_json::from_slice`]
    async fn request<Q, R>(
        &self,
        topic: &str,
        request: &Q,
        timeout: Duration,
    ) -> Result<Option<R>, RequestError>
    where
        Q: CorrelatedRequest + Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let payload = encode(request)?;

        match self
            .request_raw(topic, request.request_id(), &payload, timeout)
            .await?
        {
            Some(reply) => serde_json::from_slice(&reply)
                .map(Some)
                .map_err(|e| RequestError::ReceptionFailed(e.into())),
            None => Ok(None),
        }
    }

    /// Serializes the request using [`serde_json::to_vec`] and parses each reply using [`serde_json::from_slice`]
    async fn request_many<Q, R>(
        &self,
        topic: &str,
        request: &Q,
        window: Duration,
    ) -> Result<Option<Vec<R>>, RequestError>
    where
        Q: CorrelatedRequest + Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let payload = encode(request)?;

        self.collect_raw(
            topic,
            request.request_id(),
            &payload,
            window,
            |reply: &[u8]| serde_json::from_slice::<R>(reply),
        )
        .await
    }
}
