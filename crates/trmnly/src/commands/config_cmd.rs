//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};

use trmnly_core::BackendFlavor;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "poll_interval = {}", cfg.defaults.poll_interval);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.url_or_default());
        let _ = writeln!(out, "flavor = \"{}\"", p.flavor);
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"****\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref mac) = p.device_mac {
            let _ = writeln!(out, "device_mac = \"{mac}\"");
        }
        if !p.devices.is_empty() {
            let quoted: Vec<_> = p.devices.iter().map(|d| format!("\"{d}\"")).collect();
            let _ = writeln!(out, "devices = [{}]", quoted.join(", "));
        }
        if let Some(ref url) = p.screenshot_url {
            let _ = writeln!(out, "screenshot_url = \"{url}\"");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(interval) = p.poll_interval {
            let _ = writeln!(out, "poll_interval = {interval}");
        }
        if let Some(rate) = p.refresh_rate_override {
            let _ = writeln!(out, "refresh_rate_override = {rate}");
        }
        if let Some(settle) = p.refresh_settle {
            let _ = writeln!(out, "refresh_settle = {settle}");
        }
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Offer to store a token in the system keyring or return it for plaintext config.
///
/// Returns `Some(token)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_token_storage(token: &str, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the token?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        config::store_token(profile_name, token)?;
        eprintln!("   ✓ token stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(token.to_owned()))
    }
}

fn load_existing() -> Config {
    config::load_config_or_default()
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("trmnly configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let flavor_choices = &[
                "Self-hosted server (BYOS)",
                "Hosted TRMNL service",
            ];
            let flavor = match Select::new()
                .with_prompt("Server type")
                .items(flavor_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?
            {
                0 => BackendFlavor::SelfHosted,
                _ => BackendFlavor::Hosted,
            };

            let default_url = match flavor {
                BackendFlavor::SelfHosted => trmnly_config::DEFAULT_SELF_HOSTED_URL,
                BackendFlavor::Hosted => trmnly_config::DEFAULT_HOSTED_URL,
            };
            let url: String = Input::new()
                .with_prompt("Server URL")
                .default(default_url.into())
                .interact_text()
                .map_err(prompt_err)?;

            let device_mac = match flavor {
                BackendFlavor::Hosted => Some(
                    Input::<String>::new()
                        .with_prompt("Device MAC address")
                        .interact_text()
                        .map_err(prompt_err)?,
                ),
                BackendFlavor::SelfHosted => None,
            };

            let token = Password::new()
                .with_prompt(match flavor {
                    BackendFlavor::Hosted => "Access token",
                    BackendFlavor::SelfHosted => "Bearer token (empty for none)",
                })
                .allow_empty_password(flavor == BackendFlavor::SelfHosted)
                .interact()
                .map_err(prompt_err)?;

            let token_field = if token.is_empty() {
                None
            } else {
                prompt_token_storage(&token, &profile_name)?
            };

            let profile = Profile {
                url: Some(url),
                flavor,
                token: token_field,
                device_mac,
                ..Profile::default()
            };

            let mut cfg = load_existing();
            cfg.profiles.insert(profile_name.clone(), profile);
            if cfg.profiles.len() == 1 || cfg.default_profile.is_none() {
                cfg.default_profile = Some(profile_name.clone());
            }

            config::save_config(&cfg)?;
            eprintln!("\n   ✓ profile '{profile_name}' written to {}", config_path.display());
            eprintln!("   Try: trmnly ping");
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(&format_config_redacted(&cfg), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = load_existing();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let mut names: Vec<_> = cfg.profiles.keys().collect();
            names.sort();
            let lines: Vec<String> = names
                .into_iter()
                .map(|name| {
                    let marker = if name == default { "*" } else { " " };
                    format!("{marker} {name}")
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = load_existing();
            if !cfg.profiles.contains_key(&name) {
                let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
                names.sort();
                return Err(CliError::ProfileNotFound {
                    name,
                    available: names.join(", "),
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetToken { token } => {
            let cfg = load_existing();
            let profile_name = config::active_profile_name(global, &cfg);
            let token = match token {
                Some(token) => token,
                None => Password::new()
                    .with_prompt(format!("Token for profile '{profile_name}'"))
                    .interact()
                    .map_err(prompt_err)?,
            };
            config::store_token(&profile_name, &token)?;
            if !global.quiet {
                eprintln!("Token stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_config_masks_tokens() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "cloud".into(),
            Profile {
                flavor: BackendFlavor::Hosted,
                token: Some("super-secret".into()),
                device_mac: Some("AA:BB:CC:DD:EE:FF".into()),
                ..Profile::default()
            },
        );

        let out = format_config_redacted(&cfg);
        assert!(!out.contains("super-secret"));
        assert!(out.contains("token = \"****\""));
        assert!(out.contains("flavor = \"hosted\""));
        assert!(out.contains("url = \"https://usetrmnl.com\""));
    }
}
