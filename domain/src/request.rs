use super::{
    Device, DeviceProfile, Schedule, COMPONENT_CONFIG_SCRIPT, LUA_TRANSFORM_COMPONENT,
};
use library::communication::request::CorrelatedRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Message type announced by every request
pub const REQUEST_TYPE: &str = "xrt.request:1.0";

/// Option carrying the discovery duration in milliseconds
pub const DISCOVERY_DURATION_OPTION: &str = "DiscoveryDuration";

/// Operation requested from an XRT node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// List the names of all devices
    #[serde(rename = "device:list")]
    DeviceList,
    /// Fetch a single device
    #[serde(rename = "device:get")]
    DeviceGet,
    /// Add a new device
    #[serde(rename = "device:add")]
    DeviceAdd,
    /// Replace an existing device
    #[serde(rename = "device:update")]
    DeviceUpdate,
    /// Remove a device
    #[serde(rename = "device:delete")]
    DeviceDelete,
    /// Add a discovered device which has no profile yet
    #[serde(rename = "device:add_discovered")]
    DeviceAddDiscovered,
    /// Generate or refresh the profile of a device
    #[serde(rename = "device:scan")]
    DeviceScan,
    /// Read device resources
    #[serde(rename = "device:read")]
    DeviceRead,
    /// Write device resources
    #[serde(rename = "device:write")]
    DeviceWrite,
    /// List the names of all device profiles
    #[serde(rename = "profile:list")]
    ProfileList,
    /// Fetch a single device profile
    #[serde(rename = "profile:get")]
    ProfileGet,
    /// Add a new device profile
    #[serde(rename = "profile:add")]
    ProfileAdd,
    /// Replace an existing device profile
    #[serde(rename = "profile:update")]
    ProfileUpdate,
    /// Remove a device profile
    #[serde(rename = "profile:delete")]
    ProfileDelete,
    /// List the names of all schedules
    #[serde(rename = "schedule:list")]
    ScheduleList,
    /// Add a new schedule
    #[serde(rename = "schedule:add")]
    ScheduleAdd,
    /// Remove a schedule
    #[serde(rename = "schedule:delete")]
    ScheduleDelete,
    /// Start a device discovery run
    #[serde(rename = "discovery:trigger")]
    DiscoveryTrigger,
    /// Reconfigure a running component
    #[serde(rename = "component:update")]
    ComponentUpdate,
    /// Enumerate components of every reachable node
    #[serde(rename = "component:discover")]
    ComponentDiscover,
}

impl Operation {
    /// Name of the operation on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceList => "device:list",
            Self::DeviceGet => "device:get",
            Self::DeviceAdd => "device:add",
            Self::DeviceUpdate => "device:update",
            Self::DeviceDelete => "device:delete",
            Self::DeviceAddDiscovered => "device:add_discovered",
            Self::DeviceScan => "device:scan",
            Self::DeviceRead => "device:read",
            Self::DeviceWrite => "device:write",
            Self::ProfileList => "profile:list",
            Self::ProfileGet => "profile:get",
            Self::ProfileAdd => "profile:add",
            Self::ProfileUpdate => "profile:update",
            Self::ProfileDelete => "profile:delete",
            Self::ScheduleList => "schedule:list",
            Self::ScheduleAdd => "schedule:add",
            Self::ScheduleDelete => "schedule:delete",
            Self::DiscoveryTrigger => "discovery:trigger",
            Self::ComponentUpdate => "component:update",
            Self::ComponentDiscover => "component:discover",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device referenced by name or given in full
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceArgument {
    /// Existing device
    Name(String),
    /// Complete device definition
    Definition(Device),
}

/// Device profile referenced by name or given in full
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileArgument {
    /// Existing profile
    Name(String),
    /// Complete profile definition
    Definition(DeviceProfile),
}

/// Schedule referenced by name or given in full
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleArgument {
    /// Existing schedule
    Name(String),
    /// Complete schedule definition
    Definition(Schedule),
}

/// Request sent to an XRT node
///
/// Only the arguments relevant to the [`Operation`] are set, the rest is left
/// out of the serialized message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Name of the requesting client
    pub client: String,
    /// Correlation id replies will carry
    pub request_id: String,
    /// Requested operation
    pub op: Operation,
    /// Message type, always [`REQUEST_TYPE`]
    #[serde(rename = "type")]
    pub message_type: String,
    /// Device the operation applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceArgument>,
    /// Device profile the operation applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileArgument>,
    /// Schedule the operation applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleArgument>,
    /// Resources to read
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readings: Vec<String>,
    /// Resource values to write
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub values: Map<String, Value>,
    /// Operation specific options
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    /// Component to reconfigure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// New component configuration
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
    /// Category of components to discover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl CorrelatedRequest for Request {
    fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Request {
    /// Creates a request without arguments and a fresh random request id
    pub fn new(op: Operation, client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            request_id: Uuid::new_v4().to_string(),
            op,
            message_type: REQUEST_TYPE.to_owned(),
            device: None,
            profile: None,
            schedule: None,
            readings: Vec::new(),
            values: Map::new(),
            options: Map::new(),
            component: None,
            config: Map::new(),
            category: None,
        }
    }

    fn with_device(mut self, device: DeviceArgument) -> Self {
        self.device = Some(device);
        self
    }

    fn with_profile(mut self, profile: ProfileArgument) -> Self {
        self.profile = Some(profile);
        self
    }

    fn with_schedule(mut self, schedule: ScheduleArgument) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Lists all device names
    pub fn all_devices(client: &str) -> Self {
        Self::new(Operation::DeviceList, client)
    }

    /// Fetches one device
    pub fn device_get(name: impl Into<String>, client: &str) -> Self {
        Self::new(Operation::DeviceGet, client).with_device(DeviceArgument::Name(name.into()))
    }

    /// Adds a device
    pub fn device_add(device: Device, client: &str) -> Self {
        Self::new(Operation::DeviceAdd, client).with_device(DeviceArgument::Definition(device))
    }

    /// Replaces a device
    pub fn device_update(device: Device, client: &str) -> Self {
        Self::new(Operation::DeviceUpdate, client).with_device(DeviceArgument::Definition(device))
    }

    /// Removes a device
    pub fn device_delete(name: impl Into<String>, client: &str) -> Self {
        Self::new(Operation::DeviceDelete, client).with_device(DeviceArgument::Name(name.into()))
    }

    /// Adds a discovered device which has no profile yet
    pub fn discovered_device_add(device: Device, client: &str) -> Self {
        Self::new(Operation::DeviceAddDiscovered, client)
            .with_device(DeviceArgument::Definition(device))
    }

    /// Generates or refreshes the profile of a device
    pub fn device_scan(device: Device, client: &str) -> Self {
        Self::new(Operation::DeviceScan, client).with_device(DeviceArgument::Definition(device))
    }

    /// Reads the given resources of a device
    pub fn device_resource_get(
        device: impl Into<String>,
        client: &str,
        resources: Vec<String>,
    ) -> Self {
        let mut request =
            Self::new(Operation::DeviceRead, client).with_device(DeviceArgument::Name(device.into()));
        request.readings = resources;
        request
    }

    /// Writes resource values of a device
    pub fn device_resource_set(
        device: impl Into<String>,
        client: &str,
        values: Map<String, Value>,
        options: Map<String, Value>,
    ) -> Self {
        let mut request =
            Self::new(Operation::DeviceWrite, client).with_device(DeviceArgument::Name(device.into()));
        request.values = values;
        request.options = options;
        request
    }

    /// Lists all device profile names
    pub fn all_profiles(client: &str) -> Self {
        Self::new(Operation::ProfileList, client)
    }

    /// Fetches one device profile
    pub fn profile_get(name: impl Into<String>, client: &str) -> Self {
        Self::new(Operation::ProfileGet, client).with_profile(ProfileArgument::Name(name.into()))
    }

    /// Adds a device profile
    pub fn profile_add(profile: DeviceProfile, client: &str) -> Self {
        Self::new(Operation::ProfileAdd, client).with_profile(ProfileArgument::Definition(profile))
    }

    /// Replaces a device profile
    pub fn profile_update(profile: DeviceProfile, client: &str) -> Self {
        Self::new(Operation::ProfileUpdate, client)
            .with_profile(ProfileArgument::Definition(profile))
    }

    /// Removes a device profile
    pub fn profile_delete(name: impl Into<String>, client: &str) -> Self {
        Self::new(Operation::ProfileDelete, client).with_profile(ProfileArgument::Name(name.into()))
    }

    /// Lists all schedule names
    pub fn all_schedules(client: &str) -> Self {
        Self::new(Operation::ScheduleList, client)
    }

    /// Adds a schedule
    pub fn schedule_add(schedule: Schedule, client: &str) -> Self {
        Self::new(Operation::ScheduleAdd, client)
            .with_schedule(ScheduleArgument::Definition(schedule))
    }

    /// Removes a schedule
    pub fn schedule_delete(name: impl Into<String>, client: &str) -> Self {
        Self::new(Operation::ScheduleDelete, client)
            .with_schedule(ScheduleArgument::Name(name.into()))
    }

    /// Starts a discovery run with the given options
    pub fn discovery(client: &str, options: Map<String, Value>) -> Self {
        let mut request = Self::new(Operation::DiscoveryTrigger, client);
        request.options = options;
        request
    }

    /// Reconfigures a component
    pub fn component_update(
        component: impl Into<String>,
        client: &str,
        config: Map<String, Value>,
    ) -> Self {
        let mut request = Self::new(Operation::ComponentUpdate, client);
        request.component = Some(component.into());
        request.config = config;
        request
    }

    /// Replaces the script of the Lua transformation component
    pub fn lua_script_update(script: impl Into<String>, client: &str) -> Self {
        let mut config = Map::new();
        config.insert(COMPONENT_CONFIG_SCRIPT.to_owned(), Value::String(script.into()));
        Self::component_update(LUA_TRANSFORM_COMPONENT, client, config)
    }

    /// Enumerates components of a category on every node
    pub fn component_discover(client: &str, category: impl Into<String>) -> Self {
        let mut request = Self::new(Operation::ComponentDiscover, client);
        request.category = Some(category.into());
        request
    }
}
