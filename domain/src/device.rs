use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Device known to an XRT node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Unique name of the device
    pub name: String,
    /// Profile describing the resources of the device
    ///
    /// Discovered devices may be added without one until a scan generated it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Protocol specific connection properties, keyed by protocol name
    #[serde(default)]
    pub protocols: Map<String, Value>,
    /// Additional, driver specific properties
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Device {
    /// Creates a device with the given name and profile but no protocol properties
    pub fn new(name: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile: Some(profile.into()),
            protocols: Map::new(),
            properties: Map::new(),
        }
    }

    /// Adds the properties of one protocol
    pub fn with_protocol(mut self, protocol: impl Into<String>, properties: Value) -> Self {
        self.protocols.insert(protocol.into(), properties);
        self
    }
}

/// Value of a single device resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Data type of the value, e.g. `Int32` or `String`
    #[serde(rename = "type")]
    pub value_type: String,
    /// Raw value as reported by the device
    pub value: Value,
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn omit_missing_profile() {
        let device = Device {
            profile: None,
            ..Device::new("sensor", "ignored")
        };

        assert_eq!(
            serde_json::to_value(&device).unwrap(),
            json!({ "name": "sensor", "protocols": {} })
        );
    }

    #[test]
    fn parse_device_without_optional_sections() {
        let device: Device = serde_json::from_value(json!({
            "name": "sensor",
            "profile": "thermometer",
            "protocols": { "modbus-tcp": { "Address": "10.0.0.1" } }
        }))
        .unwrap();

        assert_eq!(
            device,
            Device::new("sensor", "thermometer")
                .with_protocol("modbus-tcp", json!({ "Address": "10.0.0.1" }))
        );
    }
}
