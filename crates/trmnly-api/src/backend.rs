// Capability interface over the two backend flavors.
//
// Every server supports the device-level operations in `TrmnlBackend`.
// Richer surfaces are exposed as optional capabilities: callers ask for
// `management()` or `plugins()` and handle `None`, instead of checking
// which flavor is active.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::BackendFlavor;
use crate::error::Error;
use crate::models::{
    Device, DevicePatch, DisplayContent, Model, ModelPatch, NewDevice, NewModel, NewScreen, Screen,
    ScreenPatch, resolve_device,
};

/// Operations every backend flavor supports.
#[async_trait]
pub trait TrmnlBackend: Send + Sync {
    /// Which API shape this client speaks.
    fn flavor(&self) -> BackendFlavor;

    /// List all devices visible to these credentials.
    ///
    /// Best-effort: a missing or malformed `data` envelope yields an empty
    /// list, while transport and status errors still propagate.
    async fn list_devices(&self) -> Result<Vec<Device>, Error>;

    /// Find a device by friendly id or numeric id. `None` is not an error.
    async fn find_device(&self, id: &str) -> Result<Option<Device>, Error> {
        let devices = self.list_devices().await?;
        Ok(resolve_device(&devices, id).cloned())
    }

    /// Apply a partial update to a device.
    async fn update_device(&self, id: &str, patch: &DevicePatch) -> Result<(), Error>;

    /// Write only the device's refresh rate (seconds).
    async fn set_refresh_rate(&self, id: &str, secs: u32) -> Result<(), Error> {
        self.update_device(id, &DevicePatch::refresh_rate(secs))
            .await
    }

    /// Fetch what the server would currently hand this device.
    async fn display_content(&self, id: &str) -> Result<DisplayContent, Error>;

    /// Cheap liveness probe. Never fails: any error yields `false`.
    async fn test_connection(&self) -> bool;

    /// Device/screen/model management, when the server offers it.
    fn management(&self) -> Option<&dyn ManagementApi> {
        None
    }

    /// Plugin and notification actions, when the server offers them.
    fn plugins(&self) -> Option<&dyn PluginApi> {
        None
    }
}

/// Full resource management (self-hosted servers).
#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn create_device(&self, device: &NewDevice) -> Result<Device, Error>;
    async fn delete_device(&self, id: &str) -> Result<(), Error>;

    async fn list_screens(&self) -> Result<Vec<Screen>, Error>;
    async fn create_screen(&self, screen: &NewScreen) -> Result<Screen, Error>;
    async fn update_screen(&self, key: &str, patch: &ScreenPatch) -> Result<(), Error>;
    async fn delete_screen(&self, key: &str) -> Result<(), Error>;

    async fn list_models(&self) -> Result<Vec<Model>, Error>;
    async fn create_model(&self, model: &NewModel) -> Result<Model, Error>;
    async fn update_model(&self, key: &str, patch: &ModelPatch) -> Result<(), Error>;
    async fn delete_model(&self, key: &str) -> Result<(), Error>;

    /// Model id to display name (label, then description, then generated).
    async fn model_names(&self) -> Result<BTreeMap<u64, String>, Error> {
        Ok(self
            .list_models()
            .await?
            .into_iter()
            .map(|m| (m.id, m.display_name()))
            .collect())
    }
}

/// Content actions (hosted service).
#[async_trait]
pub trait PluginApi: Send + Sync {
    /// Make a plugin the device's current content.
    async fn switch_plugin(&self, plugin_id: &str) -> Result<(), Error>;

    /// Push merge variables into a private plugin.
    async fn push_plugin_data(&self, plugin_uuid: &str, merge_variables: Value)
    -> Result<(), Error>;

    /// Show a short message through a notification plugin.
    async fn send_notification(
        &self,
        plugin_uuid: &str,
        title: &str,
        message: &str,
    ) -> Result<(), Error> {
        let vars = serde_json::json!({
            "title": title,
            "message": message,
            "sent_at": chrono::Utc::now().to_rfc3339(),
        });
        self.push_plugin_data(plugin_uuid, vars).await
    }
}
