// ── API-to-domain conversion ──
//
// Bridges raw `trmnly_api::Device` records into `DeviceSnapshot`s,
// percentage-izing battery and defaulting missing telemetry.

use chrono::{DateTime, Utc};
use trmnly_api::{BackendFlavor, Device};

use crate::model::{
    DEFAULT_FIRMWARE_VERSION, DEFAULT_WIFI_RSSI, DeviceSnapshot, DeviceStatus, battery_percentage,
};

/// Parse an ISO-8601 timestamp, accepting a trailing `Z`.
fn parse_datetime(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_status(raw: Option<&str>) -> DeviceStatus {
    raw.and_then(|s| s.parse().ok()).unwrap_or_default()
}

impl DeviceSnapshot {
    pub(crate) fn from_device(device: Device, flavor: BackendFlavor, fetched_at: DateTime<Utc>) -> Self {
        let name = device.display_name();
        let battery_voltage = device.battery.unwrap_or(0.0);

        Self {
            id: device.id,
            name,
            friendly_id: device.friendly_id,
            mac: device.mac_address,
            model_id: device.model_id,
            refresh_rate_secs: device.refresh_rate,
            image_timeout_secs: device.image_timeout,
            firmware_update: device.firmware_update.unwrap_or(false),
            sleep_start: device.sleep_start_at,
            sleep_stop: device.sleep_stop_at,
            battery_voltage,
            battery_pct: battery_percentage(battery_voltage),
            wifi_rssi: device.wifi.unwrap_or(DEFAULT_WIFI_RSSI),
            firmware_version: device
                .firmware_version
                .unwrap_or_else(|| DEFAULT_FIRMWARE_VERSION.into()),
            uptime_secs: device.uptime,
            status: parse_status(device.status.as_deref()),
            last_seen: parse_datetime(device.last_seen.as_deref()),
            fetched_at,
            flavor,
        }
    }
}
