// Self-hosted device endpoints
//
// Listing, registration, partial updates, and the device-facing display
// endpoint. Writes address devices by numeric id, so every write resolves
// the caller's id (friendly or numeric) against the current listing first.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::{header_value, sensitive_value};
use crate::error::Error;
use crate::models::{Device, DevicePatch, DisplayContent, NewDevice, resolve_device};
use crate::self_hosted::client::{SelfHostedClient, lenient_list};

impl SelfHostedClient {
    /// List all devices.
    ///
    /// `GET /api/devices`
    pub async fn fetch_devices(&self) -> Result<Vec<Device>, Error> {
        debug!("listing devices");
        let raw = self.transport.get("/api/devices").await?;
        Ok(lenient_list(&raw, "devices"))
    }

    /// Resolve a friendly or numeric id to the full device record.
    pub(crate) async fn require_device(&self, id: &str) -> Result<Device, Error> {
        let devices = self.fetch_devices().await?;
        resolve_device(&devices, id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                path: format!("/api/devices/{id}"),
            })
    }

    /// Apply a partial update.
    ///
    /// `PATCH /api/devices/{id}` with `{"device": {...}}`
    pub async fn patch_device(&self, id: &str, patch: &DevicePatch) -> Result<(), Error> {
        let device = self.require_device(id).await?;
        debug!(id, numeric_id = device.id, ?patch, "updating device");
        self.transport
            .patch(
                &format!("/api/devices/{}", device.id),
                &json!({ "device": patch }),
            )
            .await?;
        Ok(())
    }

    /// Register a new device.
    ///
    /// `POST /api/devices` with `{"device": {...}}`. When the server answers
    /// without a usable body the device is looked up by MAC afterwards.
    pub async fn post_device(&self, device: &NewDevice) -> Result<Device, Error> {
        debug!(mac = %device.mac_address, "creating device");
        let raw = self
            .transport
            .post("/api/devices", &json!({ "device": device }))
            .await?;

        if !raw.is_marker() {
            match raw.into_data::<Device>() {
                Ok(created) => return Ok(created),
                Err(e) => warn!(error = %e, "create response did not decode, re-listing"),
            }
        }

        let mac = device.mac_address.to_lowercase();
        self.fetch_devices()
            .await?
            .into_iter()
            .find(|d| {
                d.mac_address
                    .as_deref()
                    .is_some_and(|m| m.to_lowercase() == mac)
            })
            .ok_or_else(|| Error::NotFound {
                path: format!("/api/devices?mac={}", device.mac_address),
            })
    }

    /// Remove a device.
    ///
    /// `DELETE /api/devices/{id}`
    pub async fn remove_device(&self, id: &str) -> Result<(), Error> {
        let device = self.require_device(id).await?;
        debug!(id, numeric_id = device.id, "deleting device");
        self.transport
            .delete(&format!("/api/devices/{}", device.id))
            .await?;
        Ok(())
    }

    /// Fetch what the server would hand this device on its next poll.
    ///
    /// `GET /api/display` identified by the device's MAC (`ID` header) and
    /// its own API key (`Access-Token`), exactly as the hardware calls it.
    pub async fn fetch_display(&self, id: &str) -> Result<DisplayContent, Error> {
        let device = self.require_device(id).await?;
        let mac = device
            .mac_address
            .as_deref()
            .ok_or_else(|| Error::InvalidHeader(format!("device {id} has no MAC address")))?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("id"), header_value(mac)?);
        if let Some(key) = device.api_key.as_deref() {
            headers.insert(HeaderName::from_static("access-token"), sensitive_value(key)?);
        }

        debug!(id, mac, "fetching display content");
        self.transport
            .execute(Method::GET, "/api/display", headers, None)
            .await?
            .into_typed()
    }
}
