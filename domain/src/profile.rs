use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Description of the resources a class of devices offers
///
/// Only the name is interpreted, the remaining definition is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Unique name of the profile
    pub name: String,
    /// Resources, commands and any further profile content
    #[serde(flatten)]
    pub definition: Map<String, Value>,
}

impl DeviceProfile {
    /// Creates a profile without any definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: Map::new(),
        }
    }
}
