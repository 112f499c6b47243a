use super::client::{MessageBusClient, Outcome, RequestKind};
use super::error::XrtError;
use async_trait::async_trait;
use domain::{DeviceProfile, Empty, ProfileBody, ProfileList, Request, CLIENT_NAME};

/// Device profile management operations
#[async_trait]
pub trait ProfileClient {
    /// Names of all device profiles
    async fn all_device_profiles(&self) -> Outcome<Vec<String>>;

    /// Device profile with the given name
    async fn device_profile_by_name(&self, name: &str) -> Outcome<DeviceProfile>;

    /// Adds a new device profile
    async fn add_device_profile(&self, profile: DeviceProfile) -> Outcome<()>;

    /// Replaces an existing device profile
    async fn update_device_profile(&self, profile: DeviceProfile) -> Outcome<()>;

    /// Removes a device profile
    async fn delete_device_profile_by_name(&self, name: &str) -> Outcome<()>;
}

#[async_trait]
impl ProfileClient for MessageBusClient {
    async fn all_device_profiles(&self) -> Outcome<Vec<String>> {
        let request = Request::all_profiles(CLIENT_NAME);

        self.send::<ProfileList>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(|b| b.profiles))
            .map_err(|e| XrtError::wrap("failed to query profile list", e))
    }

    async fn device_profile_by_name(&self, name: &str) -> Outcome<DeviceProfile> {
        let request = Request::profile_get(name, CLIENT_NAME);

        self.send::<ProfileBody>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(|b| b.profile))
            .map_err(|e| XrtError::wrap("failed to query profile", e))
    }

    async fn add_device_profile(&self, profile: DeviceProfile) -> Outcome<()> {
        let request = Request::profile_add(profile, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap("failed to add profile", e))
    }

    async fn update_device_profile(&self, profile: DeviceProfile) -> Outcome<()> {
        let request = Request::profile_update(profile, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap("failed to update profile", e))
    }

    async fn delete_device_profile_by_name(&self, name: &str) -> Outcome<()> {
        let request = Request::profile_delete(name, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap(format!("failed to delete profile {}", name), e))
    }
}
