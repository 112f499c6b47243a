use domain::RemoteError;
use library::communication::request::{RequestError, WaitError};
use library::BoxedError;
use std::fmt;
use thiserror::Error;

/// Category of an [`XrtError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The call was made without the options it requires
    ContractInvalid,
    /// A reply could not be decoded or the request could not be processed locally
    ServerError,
    /// No reply arrived before the deadline
    Timeout,
    /// The message bus failed to deliver the request
    Communication,
    /// The node processed the request and reported a failure
    Remote,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContractInvalid => "contract invalid",
            Self::ServerError => "server error",
            Self::Timeout => "timeout",
            Self::Communication => "communication error",
            Self::Remote => "remote error",
        };

        f.write_str(name)
    }
}

/// Failure of an XRT management call
///
/// Wrapping an error with additional context keeps its [`ErrorKind`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct XrtError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxedError>,
}

impl XrtError {
    /// Creates a new error without an underlying cause
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new error caused by `source`
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl Into<BoxedError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Adds context to an existing error while retaining its kind
    pub fn wrap(message: impl Into<String>, inner: XrtError) -> Self {
        Self {
            kind: inner.kind,
            message: message.into(),
            source: Some(Box::new(inner)),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether no reply arrived in time
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }
}

impl From<RequestError> for XrtError {
    fn from(error: RequestError) -> Self {
        let (kind, message) = match &error {
            RequestError::EncodingFailure(_) => (ErrorKind::ServerError, "failed to encode the request"),
            RequestError::RegistrationFailure(_) => {
                (ErrorKind::ContractInvalid, "request id is already in use")
            }
            RequestError::SendingFailure(_) => {
                (ErrorKind::Communication, "failed to send the request")
            }
            RequestError::ResponseCollectionFailed(WaitError::Timeout { .. }) => {
                (ErrorKind::Timeout, "timed out fetching the response")
            }
            RequestError::ResponseCollectionFailed(WaitError::Decode { .. }) => {
                (ErrorKind::ServerError, "failed to decode a response")
            }
            RequestError::ResponseCollectionFailed(WaitError::Released(_)) => {
                (ErrorKind::ServerError, "response channel closed unexpectedly")
            }
            RequestError::ReceptionFailed(_) => {
                (ErrorKind::ServerError, "failed to decode the response")
            }
        };

        Self::with_source(kind, message, error)
    }
}

impl From<RemoteError> for XrtError {
    fn from(error: RemoteError) -> Self {
        Self::with_source(ErrorKind::Remote, "node reported a failure", error)
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use library::communication::bus::BusError;
    use pretty_assertions::assert_eq;
    use std::error::Error;
    use std::time::Duration;

    #[test]
    fn keep_kind_when_wrapped() {
        let inner = XrtError::new(ErrorKind::Timeout, "no reply");
        let outer = XrtError::wrap("failed to query device list", inner);

        assert_eq!(outer.kind(), ErrorKind::Timeout);
        assert_eq!(outer.to_string(), "failed to query device list");
        assert_eq!(outer.source().unwrap().to_string(), "no reply");
    }

    #[test]
    fn identify_timeouts() {
        let error = XrtError::from(RequestError::ResponseCollectionFailed(WaitError::Timeout {
            request_id: "r2".into(),
            after: Duration::from_millis(100),
        }));

        assert!(error.is_timeout());
    }

    #[test]
    fn classify_transport_failures() {
        let error = XrtError::from(RequestError::SendingFailure(BusError::Unsupported(
            "publish_raw",
        )));

        assert_eq!(error.kind(), ErrorKind::Communication);
    }

    #[test]
    fn classify_remote_failures() {
        let error = XrtError::from(RemoteError {
            status: 1,
            message: "nope".into(),
        });

        assert_eq!(error.kind(), ErrorKind::Remote);
        assert_eq!(error.source().unwrap().to_string(), "operation failed with status 1: nope");
    }
}
