// ── Runtime sync configuration ──
//
// These types describe *how* to reach a display server and how the sync
// engine paces itself. They carry credential data and timing, but never
// touch disk. The CLI constructs a `SyncConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use trmnly_api::BackendFlavor;
use url::Url;

/// How to authenticate with a display server.
///
/// The variant also selects the backend flavor.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// Self-hosted server, optionally behind a bearer token.
    SelfHosted { token: Option<SecretString> },
    /// Hosted service, bound to one device.
    Hosted {
        access_token: SecretString,
        device_mac: String,
    },
}

impl AuthCredentials {
    pub fn flavor(&self) -> BackendFlavor {
        match self {
            Self::SelfHosted { .. } => BackendFlavor::SelfHosted,
            Self::Hosted { .. } => BackendFlavor::Hosted,
        }
    }
}

/// Pacing of the forced-refresh heuristic.
///
/// The settle delay is a guess at one device poll cycle, not a protocol
/// guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTiming {
    /// Short refresh rate written while forcing a refresh (seconds).
    pub temporary_rate_secs: u32,
    /// How long the temporary rate stays in effect.
    pub settle_delay: Duration,
    /// Pause before the single restore retry.
    pub restore_retry_delay: Duration,
    /// Warm the server's display cache before switching rates.
    pub prefetch: bool,
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self {
            temporary_rate_secs: 10,
            settle_delay: Duration::from_secs(15),
            restore_retry_delay: Duration::from_secs(2),
            prefetch: true,
        }
    }
}

/// Configuration for syncing with a single display server.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Server base URL (e.g., `http://192.168.1.20:2300`).
    pub url: Url,
    /// Authentication shape and credentials.
    pub auth: AuthCredentials,
    /// Total timeout for each HTTP request.
    pub timeout: Duration,
    /// Interval between background polls. Zero disables the timer;
    /// on-demand polls still run.
    pub poll_interval: Duration,
    /// Devices to track, by friendly or numeric id. Empty tracks every
    /// device the server lists.
    pub devices: Vec<String>,
    pub refresh: RefreshTiming,
}

impl SyncConfig {
    /// A config with default timing for the given server.
    pub fn new(url: Url, auth: AuthCredentials) -> Self {
        Self {
            url,
            auth,
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(60),
            devices: Vec::new(),
            refresh: RefreshTiming::default(),
        }
    }

    pub fn flavor(&self) -> BackendFlavor {
        self.auth.flavor()
    }
}
