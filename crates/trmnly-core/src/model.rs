// ── Consumer-facing device model ──
//
// A `DeviceSnapshot` is the normalized, cached view of one device. Telemetry
// the server did not report is defaulted here so readers never deal with
// missing fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trmnly_api::BackendFlavor;

/// WiFi signal reported when the server omits it.
pub const DEFAULT_WIFI_RSSI: i32 = -100;

/// Firmware version reported when the server omits it.
pub const DEFAULT_FIRMWARE_VERSION: &str = "Unknown";

/// Refresh rate assumed when a device reports none.
pub const DEFAULT_REFRESH_RATE_SECS: u32 = 900;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

/// Last-known state of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub id: u64,
    pub friendly_id: Option<String>,
    pub name: String,
    pub mac: Option<String>,
    pub model_id: Option<u64>,

    // Settings
    pub refresh_rate_secs: Option<u32>,
    pub image_timeout_secs: Option<u32>,
    pub firmware_update: bool,
    pub sleep_start: Option<String>,
    pub sleep_stop: Option<String>,

    // Telemetry
    pub battery_voltage: f64,
    pub battery_pct: u8,
    pub wifi_rssi: i32,
    pub firmware_version: String,
    pub uptime_secs: Option<u64>,
    pub status: DeviceStatus,
    pub last_seen: Option<DateTime<Utc>>,

    /// When this snapshot was taken.
    pub fetched_at: DateTime<Utc>,
    /// Backend the data came from. Hosted telemetry is simulated.
    pub flavor: BackendFlavor,
}

impl DeviceSnapshot {
    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }
}

/// Map a battery voltage onto 0-100%.
///
/// Linear between 3.7 V (empty) and 4.0 V (full), truncated.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
pub fn battery_percentage(voltage: f64) -> u8 {
    if voltage > 4.0 {
        100
    } else if voltage > 3.7 {
        (((voltage - 3.7) / 0.3) * 100.0).clamp(0.0, 100.0) as u8
    } else {
        0
    }
}
