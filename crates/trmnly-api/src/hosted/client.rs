// Hosted HTTP client

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{BackendFlavor, Credentials};
use crate::backend::{PluginApi, TrmnlBackend};
use crate::error::Error;
use crate::models::{Device, DevicePatch, DisplayContent};
use crate::transport::{Transport, TransportConfig};

/// Default base URL of the hosted service.
pub const DEFAULT_BASE_URL: &str = "https://usetrmnl.com";

// The hosted display endpoint carries no telemetry; these stand in for it.
pub const SIMULATED_BATTERY_VOLTAGE: f64 = 4.0;
pub const SIMULATED_WIFI_RSSI: i32 = -50;
pub const SIMULATED_FIRMWARE_VERSION: &str = "unknown";
pub const SIMULATED_UPTIME_SECS: u64 = 0;

/// Client for the hosted service, bound to a single device.
#[derive(Debug, Clone)]
pub struct HostedClient {
    transport: Transport,
    device_mac: String,
}

impl HostedClient {
    pub fn new(
        base_url: Url,
        access_token: secrecy::SecretString,
        device_mac: impl Into<String>,
        config: &TransportConfig,
    ) -> Result<Self, Error> {
        let device_mac = device_mac.into();
        let headers = Credentials::AccessToken {
            token: access_token,
            device_mac: device_mac.clone(),
        }
        .headers()?;
        let transport = Transport::new(base_url, config, headers)?;
        Ok(Self {
            transport,
            device_mac,
        })
    }

    pub fn device_mac(&self) -> &str {
        &self.device_mac
    }

    /// `GET /api/display`
    pub async fn fetch_display(&self) -> Result<DisplayContent, Error> {
        debug!(mac = %self.device_mac, "fetching display content");
        self.transport.get("/api/display").await?.into_typed()
    }

    fn synthesize_device(&self, display: &DisplayContent) -> Device {
        Device {
            id: 0,
            friendly_id: Some(self.device_mac.clone()),
            label: Some("TRMNL".into()),
            mac_address: Some(self.device_mac.clone()),
            api_key: None,
            model_id: None,
            refresh_rate: display.refresh_rate,
            image_timeout: None,
            firmware_update: display.update_firmware,
            sleep_start_at: None,
            sleep_stop_at: None,
            battery: Some(SIMULATED_BATTERY_VOLTAGE),
            wifi: Some(SIMULATED_WIFI_RSSI),
            firmware_version: Some(SIMULATED_FIRMWARE_VERSION.into()),
            uptime: Some(SIMULATED_UPTIME_SECS),
            status: Some("online".into()),
            last_seen: Some(Utc::now().to_rfc3339()),
            extra: Map::new(),
        }
    }
}

#[async_trait]
impl TrmnlBackend for HostedClient {
    fn flavor(&self) -> BackendFlavor {
        BackendFlavor::Hosted
    }

    async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        let display = self.fetch_display().await?;
        Ok(vec![self.synthesize_device(&display)])
    }

    async fn update_device(&self, id: &str, _patch: &DevicePatch) -> Result<(), Error> {
        debug!(id, "device updates are not offered by the hosted service");
        Err(Error::Unsupported("device updates"))
    }

    async fn display_content(&self, id: &str) -> Result<DisplayContent, Error> {
        let device = self.synthesize_device(&DisplayContent::default());
        if !device.matches(id) {
            return Err(Error::NotFound {
                path: format!("/api/display ({id})"),
            });
        }
        self.fetch_display().await
    }

    async fn test_connection(&self) -> bool {
        match self.transport.get("/api/display").await {
            Ok(_) => {
                info!("hosted display endpoint reachable");
                true
            }
            Err(e) => {
                warn!(error = %e, "hosted connection test failed");
                false
            }
        }
    }

    fn plugins(&self) -> Option<&dyn PluginApi> {
        Some(self)
    }
}

#[async_trait]
impl PluginApi for HostedClient {
    /// `POST /api/display/current` with `{"plugin_setting_id": ...}`
    async fn switch_plugin(&self, plugin_id: &str) -> Result<(), Error> {
        debug!(plugin_id, "switching plugin");
        let id: Value = plugin_id
            .parse::<u64>()
            .map_or_else(|_| json!(plugin_id), |n| json!(n));
        self.transport
            .post("/api/display/current", &json!({ "plugin_setting_id": id }))
            .await?;
        Ok(())
    }

    /// `POST /api/custom_plugins/{uuid}` with `{"merge_variables": {...}}`
    async fn push_plugin_data(
        &self,
        plugin_uuid: &str,
        merge_variables: Value,
    ) -> Result<(), Error> {
        debug!(plugin_uuid, "pushing plugin data");
        self.transport
            .post(
                &format!("/api/custom_plugins/{plugin_uuid}"),
                &json!({ "merge_variables": merge_variables }),
            )
            .await?;
        Ok(())
    }
}
