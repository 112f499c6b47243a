use super::{ComponentInfo, Device, DeviceProfile, Reading};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Status code of a successful operation
pub const STATUS_OK: i64 = 0;

/// Reply of an XRT node to a [`Request`](super::Request)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    /// Client the reply is addressed to
    #[serde(default)]
    pub client: String,
    /// Correlation id of the originating request
    #[serde(alias = "RequestId")]
    pub request_id: String,
    /// Message type announced by the node
    #[serde(rename = "type", default)]
    pub message_type: String,
    /// Outcome of the operation
    pub result: ResponseResult<T>,
}

/// Outcome of an operation together with its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseResult<T> {
    /// [`STATUS_OK`] on success, anything else on failure
    pub status: i64,
    /// Human readable failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Operation specific payload
    #[serde(flatten)]
    pub body: T,
}

/// Failure reported by the node in an otherwise well-formed reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation failed with status {status}: {message}")]
pub struct RemoteError {
    /// Status code reported by the node
    pub status: i64,
    /// Failure description, empty if the node did not provide one
    pub message: String,
}

impl<T> ResponseResult<T> {
    /// Error reported by the node, if any
    pub fn error(&self) -> Option<RemoteError> {
        if self.status == STATUS_OK {
            return None;
        }

        Some(RemoteError {
            status: self.status,
            message: self.error.clone().unwrap_or_default(),
        })
    }
}

impl<T> Response<T> {
    /// Converts the response into its payload unless the node reported an error
    pub fn into_body(self) -> Result<T, RemoteError> {
        match self.result.error() {
            Some(error) => Err(error),
            None => Ok(self.result.body),
        }
    }
}

/// Payload of replies without content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Reply without content beyond the status
pub type CommonResponse = Response<Empty>;

/// Names of all devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceList {
    /// Device names
    #[serde(default)]
    pub devices: Vec<String>,
}

/// A single device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBody {
    /// Requested device
    pub device: Device,
}

/// Values of device resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingList {
    /// Readings keyed by resource name
    #[serde(default)]
    pub readings: HashMap<String, Reading>,
}

/// Names of all device profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileList {
    /// Profile names
    #[serde(default)]
    pub profiles: Vec<String>,
}

/// A single device profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBody {
    /// Requested profile
    pub profile: DeviceProfile,
}

/// Names of all schedules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleList {
    /// Schedule names
    #[serde(default)]
    pub schedules: Vec<String>,
}

/// Components of a single node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentList {
    /// Components matching the requested category
    #[serde(default)]
    pub components: Vec<ComponentInfo>,
}

/// Reply of one node to a component discovery
pub type MultiComponentsResponse = Response<ComponentList>;

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parse_successful_replies() {
        let response: Response<DeviceList> = serde_json::from_value(json!({
            "client": "xrt-rust-client",
            "request_id": "r1",
            "type": "xrt.reply:1.0",
            "result": { "status": 0, "devices": ["a", "b"] }
        }))
        .unwrap();

        assert_eq!(response.request_id, "r1");
        assert_eq!(
            response.into_body().unwrap().devices,
            vec!["a".to_owned(), "b".to_owned()]
        );
    }

    #[test]
    fn accept_pascal_case_request_id() {
        let response: CommonResponse = serde_json::from_value(json!({
            "RequestId": "r1",
            "result": { "status": 0 }
        }))
        .unwrap();

        assert_eq!(response.request_id, "r1");
        assert!(response.result.error().is_none());
    }

    #[test]
    fn surface_remote_errors() {
        let response: CommonResponse = serde_json::from_value(json!({
            "request_id": "r1",
            "result": { "status": 404, "error": "device not found" }
        }))
        .unwrap();

        assert_eq!(
            response.into_body().unwrap_err(),
            RemoteError {
                status: 404,
                message: "device not found".into()
            }
        );
    }

    #[test]
    fn reject_replies_without_result() {
        let parsed = serde_json::from_value::<CommonResponse>(json!({ "request_id": "r1" }));
        assert!(parsed.is_err());
    }
}
