use serde::{Deserialize, Serialize};

/// Periodic read of device resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique name of the schedule
    pub name: String,
    /// Device whose resources are read
    pub device: String,
    /// Resources read on every tick
    pub resources: Vec<String>,
    /// Time between two reads in microseconds
    pub interval: u64,
    /// Offset of the first read in microseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
}
