// Wire types shared by both backend flavors.
//
// Fields are optional wherever the server schema has been seen to vary;
// unknown members are preserved in `extra` so nothing is silently lost.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Device ───────────────────────────────────────────────────────────

/// A display device as reported by the server.
///
/// `id` (numeric) and `friendly_id` are aliases for the same device; see
/// [`Device::matches`] and [`resolve_device`].
///
/// Servers name several telemetry fields differently and sometimes send
/// more than one spelling at once. Decoding takes the first present
/// spelling; the others are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DeviceWire")]
pub struct Device {
    pub id: u64,
    pub friendly_id: Option<String>,
    pub label: Option<String>,
    pub mac_address: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model_id: Option<u64>,
    /// Seconds between device polls.
    pub refresh_rate: Option<u32>,
    pub image_timeout: Option<u32>,
    pub firmware_update: Option<bool>,
    pub sleep_start_at: Option<String>,
    pub sleep_stop_at: Option<String>,
    /// Battery voltage.
    pub battery: Option<f64>,
    /// WiFi signal in dBm.
    pub wifi: Option<i32>,
    pub firmware_version: Option<String>,
    pub uptime: Option<u64>,
    pub status: Option<String>,
    pub last_seen: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Device as it arrives on the wire, every spelling in its own slot.
#[derive(Deserialize)]
struct DeviceWire {
    id: u64,
    #[serde(default)]
    friendly_id: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    mac_address: Option<String>,
    #[serde(default)]
    mac: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    model_id: Option<u64>,
    #[serde(default)]
    refresh_rate: Option<u32>,
    #[serde(default)]
    image_timeout: Option<u32>,
    #[serde(default)]
    firmware_update: Option<bool>,
    #[serde(default)]
    sleep_start_at: Option<String>,
    #[serde(default)]
    sleep_stop_at: Option<String>,
    #[serde(default)]
    battery: Option<f64>,
    #[serde(default)]
    battery_voltage: Option<f64>,
    #[serde(default)]
    wifi: Option<i32>,
    #[serde(default)]
    rssi: Option<i32>,
    #[serde(default)]
    wifi_signal: Option<i32>,
    #[serde(default)]
    firmware_version: Option<String>,
    #[serde(default)]
    firmware: Option<String>,
    #[serde(default)]
    uptime: Option<u64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    device_status: Option<String>,
    #[serde(default)]
    last_seen: Option<String>,
    #[serde(default)]
    last_seen_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<DeviceWire> for Device {
    fn from(w: DeviceWire) -> Self {
        let mut extra = w.extra;
        let mac_address = first_of(&mut extra, [("mac_address", w.mac_address), ("mac", w.mac)]);
        let battery = first_of(
            &mut extra,
            [("battery", w.battery), ("battery_voltage", w.battery_voltage)],
        );
        let wifi = first_of(
            &mut extra,
            [("wifi", w.wifi), ("rssi", w.rssi), ("wifi_signal", w.wifi_signal)],
        );
        let firmware_version = first_of(
            &mut extra,
            [("firmware_version", w.firmware_version), ("firmware", w.firmware)],
        );
        let status = first_of(
            &mut extra,
            [("status", w.status), ("device_status", w.device_status)],
        );
        let last_seen = first_of(
            &mut extra,
            [
                ("last_seen", w.last_seen),
                ("last_seen_at", w.last_seen_at),
                ("updated_at", w.updated_at),
            ],
        );

        Self {
            id: w.id,
            friendly_id: w.friendly_id,
            label: w.label,
            mac_address,
            api_key: w.api_key,
            model_id: w.model_id,
            refresh_rate: w.refresh_rate,
            image_timeout: w.image_timeout,
            firmware_update: w.firmware_update,
            sleep_start_at: w.sleep_start_at,
            sleep_stop_at: w.sleep_stop_at,
            battery,
            wifi,
            firmware_version,
            uptime: w.uptime,
            status,
            last_seen,
            extra,
        }
    }
}

/// First present value in priority order. Later values go to `extra`.
fn first_of<T: Into<Value>, const N: usize>(
    extra: &mut Map<String, Value>,
    candidates: [(&str, Option<T>); N],
) -> Option<T> {
    let mut chosen = None;
    for (key, value) in candidates {
        match value {
            Some(v) if chosen.is_none() => chosen = Some(v),
            Some(v) => {
                extra.insert(key.to_owned(), v.into());
            }
            None => {}
        }
    }
    chosen
}

impl Device {
    /// Whether `id` names this device, by friendly id or numeric id.
    pub fn matches(&self, id: &str) -> bool {
        self.friendly_id.as_deref() == Some(id) || self.id.to_string() == id
    }

    /// Best human-facing name.
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .or_else(|| self.friendly_id.clone())
            .unwrap_or_else(|| format!("Device {}", self.id))
    }
}

/// Find a device by friendly id or numeric id.
///
/// A friendly-id match wins over a numeric match so a device whose
/// friendly id happens to look numeric still resolves to itself.
pub fn resolve_device<'a>(devices: &'a [Device], id: &str) -> Option<&'a Device> {
    devices
        .iter()
        .find(|d| d.friendly_id.as_deref() == Some(id))
        .or_else(|| devices.iter().find(|d| d.id.to_string() == id))
}

/// Fields for registering a new device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDevice {
    pub label: String,
    pub mac_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<u32>,
}

/// Partial update of a device. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_update: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_start_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_stop_at: Option<String>,
    /// Fields outside the known schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DevicePatch {
    pub fn refresh_rate(secs: u32) -> Self {
        Self {
            refresh_rate: Some(secs),
            ..Self::default()
        }
    }

    /// Add a field outside the known schema.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ── Screen ───────────────────────────────────────────────────────────

/// A renderable content unit stored on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub model_id: Option<u64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Screen {
    /// Whether `key` names this screen, by numeric id or name.
    pub fn matches(&self, key: &str) -> bool {
        self.id.to_string() == key || self.name.as_deref() == Some(key)
    }
}

/// Image payload of a screen, base64 encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenImage {
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ScreenImage {
    /// Encode raw image bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            ..Self::default()
        }
    }

    /// Wrap an already base64-encoded payload.
    pub fn from_base64(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewScreen {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<u64>,
    pub image: ScreenImage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ScreenImage>,
}

// ── Model ────────────────────────────────────────────────────────────

/// A device hardware profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Model {
    /// Label, then description, then a generated name.
    pub fn display_name(&self) -> String {
        self.label
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.description.as_deref().filter(|s| !s.is_empty()))
            .map_or_else(|| format!("Model {}", self.id), str::to_owned)
    }

    pub fn matches(&self, key: &str) -> bool {
        self.id.to_string() == key || self.name.as_deref() == Some(key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewModel {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

// ── Display content ──────────────────────────────────────────────────

/// What the server would hand a device on its next poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayContent {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub refresh_rate: Option<u32>,
    #[serde(default)]
    pub update_firmware: Option<bool>,
    #[serde(default)]
    pub firmware_url: Option<String>,
    #[serde(default)]
    pub reset_firmware: Option<bool>,
    #[serde(default)]
    pub special_function: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn device(id: u64, friendly: &str) -> Device {
        serde_json::from_value(json!({ "id": id, "friendly_id": friendly })).unwrap()
    }

    #[test]
    fn device_decodes_with_aliases_and_extra() {
        let d: Device = serde_json::from_value(json!({
            "id": 7,
            "friendly_id": "ABC123",
            "mac_address": "AA:BB:CC:00:11:22",
            "battery_voltage": 3.85,
            "rssi": -61,
            "refresh_rate": 900,
            "proxy": true
        }))
        .unwrap();
        assert_eq!(d.battery, Some(3.85));
        assert_eq!(d.wifi, Some(-61));
        assert_eq!(d.refresh_rate, Some(900));
        assert_eq!(d.extra.get("proxy"), Some(&json!(true)));
    }

    #[test]
    fn coexisting_spellings_decode_by_priority() {
        let d: Device = serde_json::from_value(json!({
            "id": 7,
            "friendly_id": "ABC",
            "last_seen_at": "2026-03-01T10:00:00Z",
            "updated_at": "2026-03-02T09:00:00Z",
            "battery": 3.95,
            "battery_voltage": 3.7,
            "wifi": -50,
            "rssi": -70,
            "mac": "AA:BB:CC:00:11:22"
        }))
        .unwrap();

        assert_eq!(d.last_seen.as_deref(), Some("2026-03-01T10:00:00Z"));
        assert_eq!(d.battery, Some(3.95));
        assert_eq!(d.wifi, Some(-50));
        assert_eq!(d.mac_address.as_deref(), Some("AA:BB:CC:00:11:22"));
        assert_eq!(d.extra.get("updated_at"), Some(&json!("2026-03-02T09:00:00Z")));
        assert_eq!(d.extra.get("rssi"), Some(&json!(-70)));
    }

    #[test]
    fn updated_at_alone_fills_last_seen() {
        let d: Device = serde_json::from_value(json!({
            "id": 1,
            "updated_at": "2026-03-02T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(d.last_seen.as_deref(), Some("2026-03-02T09:00:00Z"));
        assert!(d.extra.is_empty());
    }

    #[test]
    fn serialized_device_decodes_back() {
        let d: Device = serde_json::from_value(json!({
            "id": 3,
            "friendly_id": "QRS",
            "rssi": -61,
            "last_seen_at": "2026-03-01T10:00:00Z",
            "updated_at": "2026-03-02T09:00:00Z"
        }))
        .unwrap();
        let again: Device = serde_json::from_value(serde_json::to_value(&d).unwrap()).unwrap();
        assert_eq!(again, d);
    }

    #[test]
    fn api_key_is_never_serialized() {
        let d: Device =
            serde_json::from_value(json!({ "id": 1, "api_key": "secret" })).unwrap();
        assert_eq!(d.api_key.as_deref(), Some("secret"));
        let out = serde_json::to_value(&d).unwrap();
        assert!(out.get("api_key").is_none());
    }

    #[test]
    fn friendly_and_numeric_ids_resolve_to_same_device() {
        let devices = vec![device(1, "ALPHA"), device(2, "BRAVO")];
        for d in &devices {
            let by_friendly = resolve_device(&devices, d.friendly_id.as_deref().unwrap());
            let by_numeric = resolve_device(&devices, &d.id.to_string());
            assert_eq!(by_friendly, by_numeric);
            assert_eq!(by_friendly, Some(d));
        }
        assert!(resolve_device(&devices, "CHARLIE").is_none());
    }

    #[test]
    fn friendly_match_beats_numeric_match() {
        let devices = vec![device(2, "X"), device(9, "2")];
        assert_eq!(resolve_device(&devices, "2").unwrap().id, 9);
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = DevicePatch::refresh_rate(10).with_field("screen_id", 4);
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "refresh_rate": 10, "screen_id": 4 })
        );
        assert!(DevicePatch::default().is_empty());
        assert!(!patch.is_empty());
    }

    #[test]
    fn model_name_priority() {
        let mut m: Model = serde_json::from_value(json!({ "id": 3 })).unwrap();
        assert_eq!(m.display_name(), "Model 3");
        m.description = Some("Seven point five".into());
        assert_eq!(m.display_name(), "Seven point five");
        m.label = Some("OG".into());
        assert_eq!(m.display_name(), "OG");
    }

    #[test]
    fn screen_image_encodes_bytes() {
        assert_eq!(ScreenImage::from_bytes(b"hi").data, "aGk=");
    }
}
