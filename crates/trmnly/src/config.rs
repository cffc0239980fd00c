//! CLI configuration, a thin wrapper around `trmnly_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--url, --token, etc.).

use std::time::Duration;

use secrecy::SecretString;

use trmnly_core::SyncConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use trmnly_config::{
    Config, Profile, config_path, load_config, load_config_or_default, save_config, store_token,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The active profile with CLI flag overrides applied.
///
/// Without a stored profile, `--url` alone is enough to build one.
pub fn effective_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);

    let mut profile = match config.profiles.get(&name) {
        Some(p) => p.clone(),
        None if global.url.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            let mut names: Vec<_> = config.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref url) = global.url {
        profile.url = Some(url.clone());
    }
    if let Some(flavor) = global.flavor {
        profile.flavor = flavor.into();
    }
    if let Some(ref mac) = global.device_mac {
        profile.device_mac = Some(mac.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok((name, profile))
}

/// Build the core `SyncConfig` from config file, profile, and CLI overrides.
///
/// This is the single boundary where CLI config types cross into core types.
pub fn build_sync_config(global: &GlobalOpts) -> Result<SyncConfig, CliError> {
    let cfg = load_config_or_default();
    let (name, profile) = effective_profile(global, &cfg)?;
    let token = global.token.clone().map(SecretString::from);
    Ok(trmnly_config::profile_to_sync_config(
        &profile,
        &name,
        &cfg.defaults,
        token,
    )?)
}

/// Screenshot renderer URL: flag, then profile, then the default.
pub fn screenshot_url(global: &GlobalOpts, flag: Option<&str>) -> Result<url::Url, CliError> {
    let raw = match flag {
        Some(url) => url.to_owned(),
        None => {
            let cfg = load_config_or_default();
            effective_profile(global, &cfg).map_or_else(
                |_| trmnly_config::DEFAULT_SCREENSHOT_URL.to_owned(),
                |(_, p)| p.screenshot_url_or_default().to_owned(),
            )
        }
    };
    raw.parse().map_err(|_| CliError::Validation {
        field: "screenshot-url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Override the poll interval for long-running commands.
pub fn with_poll_interval(mut config: SyncConfig, secs: Option<u64>) -> SyncConfig {
    if let Some(secs) = secs {
        config.poll_interval = Duration::from_secs(secs);
    }
    config
}
