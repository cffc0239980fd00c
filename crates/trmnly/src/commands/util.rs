//! Shared helpers for command handlers.

use std::path::Path;

use trmnly_core::{BackendFlavor, Controller, ManagementApi, PluginApi};

use crate::error::CliError;

/// Management capability of the active backend, or a usage error naming
/// the operation.
pub fn management<'a>(
    controller: &'a Controller,
    operation: &str,
) -> Result<&'a dyn ManagementApi, CliError> {
    controller
        .backend()
        .management()
        .ok_or_else(|| unsupported(controller.config().flavor(), operation))
}

/// Plugin capability of the active backend.
pub fn plugins<'a>(controller: &'a Controller, operation: &str) -> Result<&'a dyn PluginApi, CliError> {
    controller
        .backend()
        .plugins()
        .ok_or_else(|| unsupported(controller.config().flavor(), operation))
}

fn unsupported(flavor: BackendFlavor, operation: &str) -> CliError {
    CliError::Unsupported {
        operation: operation.into(),
        flavor: flavor.to_string(),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Split a `key=value` pair. The value is parsed as JSON when it can be,
/// so `--set firmware_update=false` sends a boolean.
pub fn parse_field(pair: &str) -> Result<(String, serde_json::Value), CliError> {
    let Some((key, raw)) = pair.split_once('=') else {
        return Err(CliError::Validation {
            field: "set".into(),
            reason: format!("expected KEY=VALUE, got '{pair}'"),
        });
    };
    if key.is_empty() {
        return Err(CliError::Validation {
            field: "set".into(),
            reason: "empty key".into(),
        });
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.into()));
    Ok((key.into(), value))
}

/// Format a duration in seconds as e.g. `15m` or `1h 30m`.
pub fn format_secs(secs: u64) -> String {
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 if secs % 60 == 0 => format!("{}m", secs / 60),
        60..3600 => format!("{}m {}s", secs / 60, secs % 60),
        _ if secs % 3600 == 0 => format!("{}h", secs / 3600),
        _ => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
    }
}
