use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Component of the Lua transformation, which receives the script through its configuration
pub const LUA_TRANSFORM_COMPONENT: &str = "lua";

/// Configuration key holding the Lua script
pub const COMPONENT_CONFIG_SCRIPT: &str = "Script";

/// Component running inside an XRT node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Name of the component instance
    pub name: String,
    /// Category the component belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Anything else the node reports about the component
    #[serde(flatten)]
    pub details: Map<String, Value>,
}
