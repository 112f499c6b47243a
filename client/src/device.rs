use super::client::{MessageBusClient, Outcome, RequestKind};
use super::error::XrtError;
use async_trait::async_trait;
use domain::{DeviceBody, DeviceList, Empty, ReadingList, Request, CLIENT_NAME};
use domain::{Device, Reading};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Device management operations
#[async_trait]
pub trait DeviceClient {
    /// Names of all devices
    async fn all_devices(&self) -> Outcome<Vec<String>>;

    /// Device with the given name
    async fn device_by_name(&self, name: &str) -> Outcome<Device>;

    /// Adds a new device
    async fn add_device(&self, device: Device) -> Outcome<()>;

    /// Replaces an existing device
    async fn update_device(&self, device: Device) -> Outcome<()>;

    /// Removes a device
    async fn delete_device_by_name(&self, name: &str) -> Outcome<()>;

    /// Adds a discovered device without profile
    ///
    /// The device is not usable until a profile has been set or generated by [`scan_device`](DeviceClient::scan_device).
    async fn add_discovered_device(&self, device: Device) -> Outcome<()>;

    /// Generates or refreshes the profile of a device
    async fn scan_device(&self, device: Device) -> Outcome<()>;

    /// Reads the current values of device resources
    async fn read_device_resources(
        &self,
        device: &str,
        resources: Vec<String>,
    ) -> Outcome<HashMap<String, Reading>>;

    /// Writes values to device resources
    async fn write_device_resources(
        &self,
        device: &str,
        values: Map<String, Value>,
        options: Map<String, Value>,
    ) -> Outcome<()>;
}

#[async_trait]
impl DeviceClient for MessageBusClient {
    async fn all_devices(&self) -> Outcome<Vec<String>> {
        let request = Request::all_devices(CLIENT_NAME);

        self.send::<DeviceList>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(|b| b.devices))
            .map_err(|e| XrtError::wrap("failed to query device list", e))
    }

    async fn device_by_name(&self, name: &str) -> Outcome<Device> {
        let request = Request::device_get(name, CLIENT_NAME);

        self.send::<DeviceBody>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(|b| b.device))
            .map_err(|e| XrtError::wrap("failed to query device", e))
    }

    async fn add_device(&self, device: Device) -> Outcome<()> {
        let request = Request::device_add(device, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap("failed to add device", e))
    }

    async fn update_device(&self, device: Device) -> Outcome<()> {
        let request = Request::device_update(device, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap("failed to update device", e))
    }

    async fn delete_device_by_name(&self, name: &str) -> Outcome<()> {
        let request = Request::device_delete(name, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap(format!("failed to delete device {}", name), e))
    }

    async fn add_discovered_device(&self, device: Device) -> Outcome<()> {
        let request = Request::discovered_device_add(device, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap("failed to add discovered device", e))
    }

    async fn scan_device(&self, device: Device) -> Outcome<()> {
        let request = Request::device_scan(device, CLIENT_NAME);

        // Scanning may generate a profile, which takes as long as a discovery run
        self.send::<Empty>(RequestKind::Discovery, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap("failed to scan device", e))
    }

    async fn read_device_resources(
        &self,
        device: &str,
        resources: Vec<String>,
    ) -> Outcome<HashMap<String, Reading>> {
        let request = Request::device_resource_get(device, CLIENT_NAME, resources);

        self.send::<ReadingList>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(|b| b.readings))
            .map_err(|e| XrtError::wrap("failed to read device resources", e))
    }

    async fn write_device_resources(
        &self,
        device: &str,
        values: Map<String, Value>,
        options: Map<String, Value>,
    ) -> Outcome<()> {
        let request = Request::device_resource_set(device, CLIENT_NAME, values, options);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap("failed to write device resources", e))
    }
}
