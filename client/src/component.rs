use super::client::{MessageBusClient, Outcome, RequestKind};
use super::error::XrtError;
use async_trait::async_trait;
use domain::{Empty, MultiComponentsResponse, Request, CLIENT_NAME};
use std::time::Duration;

/// Component management operations
#[async_trait]
pub trait ComponentClient {
    /// Replaces the script of the Lua transformation component
    ///
    /// Requires [`CommandOptions`](super::CommandOptions).
    async fn update_lua_script(&self, script: &str) -> Outcome<()>;

    /// Collects the components of `category` from every node replying within `window`
    ///
    /// Each reply is returned as-is, failures reported by individual nodes included.
    async fn discover_components(
        &self,
        category: &str,
        window: Duration,
    ) -> Outcome<Vec<MultiComponentsResponse>>;
}

#[async_trait]
impl ComponentClient for MessageBusClient {
    async fn update_lua_script(&self, script: &str) -> Outcome<()> {
        let request = Request::lua_script_update(script, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Command, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| {
                XrtError::wrap("failed to update the Lua script of the Lua transform component", e)
            })
    }

    async fn discover_components(
        &self,
        category: &str,
        window: Duration,
    ) -> Outcome<Vec<MultiComponentsResponse>> {
        let request = Request::component_discover(CLIENT_NAME, category);

        self.collect::<MultiComponentsResponse>(&request, window)
            .await
            .map_err(|e| XrtError::wrap("failed to discover the xrt components", e))
    }
}
