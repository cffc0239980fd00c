//! Configuration for the trmnly CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `trmnly_core::SyncConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use trmnly_core::{AuthCredentials, BackendFlavor, RefreshTiming, SyncConfig};

/// Keyring service name for stored tokens.
pub const KEYRING_SERVICE: &str = "trmnly";

/// Environment variable consulted for a token after the profile's own.
pub const TOKEN_ENV: &str = "TRMNLY_TOKEN";

pub const DEFAULT_SELF_HOSTED_URL: &str = "http://localhost:2300";
pub const DEFAULT_HOSTED_URL: &str = "https://usetrmnl.com";
pub const DEFAULT_SCREENSHOT_URL: &str = "http://localhost:3001";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Background poll interval in seconds (0 disables the timer).
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    60
}

/// A named server profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL. Defaults by flavor.
    pub url: Option<String>,

    /// `self-hosted` or `hosted`.
    #[serde(default)]
    pub flavor: BackendFlavor,

    /// Token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Device MAC address (hosted flavor only).
    pub device_mac: Option<String>,

    /// Devices to track. Empty tracks every device.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,

    /// Screenshot renderer base URL for dashboard publishing.
    pub screenshot_url: Option<String>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override poll interval (seconds).
    pub poll_interval: Option<u64>,

    /// Override the temporary refresh rate used to force a refresh.
    pub refresh_rate_override: Option<u32>,

    /// Override how long the temporary rate stays in effect (seconds).
    pub refresh_settle: Option<u64>,
}

impl Profile {
    /// Base URL, falling back to the flavor's default.
    pub fn url_or_default(&self) -> &str {
        self.url.as_deref().unwrap_or(match self.flavor {
            BackendFlavor::SelfHosted => DEFAULT_SELF_HOSTED_URL,
            BackendFlavor::Hosted => DEFAULT_HOSTED_URL,
        })
    }

    pub fn screenshot_url_or_default(&self) -> &str {
        self.screenshot_url
            .as_deref()
            .unwrap_or(DEFAULT_SCREENSHOT_URL)
    }
}

impl Config {
    /// Look up a profile by name, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|p| (name.clone(), p))
            .ok_or(ConfigError::UnknownProfile { name })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "trmnly", "trmnly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("trmnly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment (`TRMNLY_` prefix, `__` nesting,
/// e.g. `TRMNLY_DEFAULTS__TIMEOUT=30`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TRMNLY_").split("__").ignore(&["token"]));

    Ok(figment.extract()?)
}

/// Load config, returning a default if the file is missing or invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a token from the credential chain: the profile's named env var,
/// `TRMNLY_TOKEN`, the system keyring, then plaintext. `None` when nothing
/// is configured.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. Global env var
    if let Ok(val) = std::env::var(TOKEN_ENV) {
        return Some(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token")) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    profile.token.clone().map(SecretString::from)
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
        .and_then(|entry| entry.set_password(token))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve `AuthCredentials` for the profile's flavor.
pub fn resolve_auth(
    profile: &Profile,
    profile_name: &str,
    token: Option<SecretString>,
) -> Result<AuthCredentials, ConfigError> {
    let token = token.or_else(|| resolve_token(profile, profile_name));
    match profile.flavor {
        BackendFlavor::SelfHosted => Ok(AuthCredentials::SelfHosted { token }),
        BackendFlavor::Hosted => {
            let access_token = token.ok_or_else(|| ConfigError::NoCredentials {
                profile: profile_name.into(),
            })?;
            let device_mac = profile
                .device_mac
                .clone()
                .ok_or_else(|| ConfigError::Validation {
                    field: "device_mac".into(),
                    reason: "required for the hosted flavor".into(),
                })?;
            Ok(AuthCredentials::Hosted {
                access_token,
                device_mac,
            })
        }
    }
}

/// Build a `SyncConfig` from a profile and global defaults.
///
/// `token` overrides the credential chain when given (e.g. from a CLI flag).
pub fn profile_to_sync_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    token: Option<SecretString>,
) -> Result<SyncConfig, ConfigError> {
    let raw_url = profile.url_or_default();
    let url: url::Url = raw_url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {raw_url}"),
    })?;

    let auth = resolve_auth(profile, profile_name, token)?;

    let mut refresh = RefreshTiming::default();
    if let Some(rate) = profile.refresh_rate_override {
        refresh.temporary_rate_secs = rate;
    }
    if let Some(secs) = profile.refresh_settle {
        refresh.settle_delay = Duration::from_secs(secs);
    }

    let mut config = SyncConfig::new(url, auth);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.poll_interval =
        Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));
    config.devices.clone_from(&profile.devices);
    config.refresh = refresh;
    Ok(config)
}
