// Hosted service API
//
// The hosted service exposes the device-facing display endpoint plus plugin
// actions, authenticated with an access token and the device MAC on every
// call. There is no device listing, so the one configured device is
// synthesized from its display response.

pub mod client;

pub use client::{
    HostedClient, SIMULATED_BATTERY_VOLTAGE, SIMULATED_FIRMWARE_VERSION, SIMULATED_UPTIME_SECS,
    SIMULATED_WIFI_RSSI,
};
