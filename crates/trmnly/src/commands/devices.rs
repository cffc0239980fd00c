//! Device command handlers.

use std::sync::Arc;

use tabled::Tabled;
use trmnly_core::{Command as CoreCommand, CommandResult, Controller, DevicePatch, DeviceSnapshot, NewDevice};

use crate::cli::{DeviceUpdateArgs, DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Friendly ID")]
    friendly_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "WiFi")]
    wifi: String,
    #[tabled(rename = "Refresh")]
    refresh: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
}

impl DeviceRow {
    fn new(d: &Arc<DeviceSnapshot>, color: bool) -> Self {
        Self {
            id: d.id,
            friendly_id: d.friendly_id.clone().unwrap_or_default(),
            name: d.name.clone(),
            status: output::paint_status(d.status, color),
            battery: output::paint_battery(d.battery_pct, color),
            wifi: format!("{} dBm", d.wifi_rssi),
            refresh: d
                .refresh_rate_secs
                .map(|s| util::format_secs(u64::from(s)))
                .unwrap_or_default(),
            firmware: d.firmware_version.clone(),
        }
    }
}

fn identifier(d: &Arc<DeviceSnapshot>) -> String {
    d.friendly_id.clone().unwrap_or_else(|| d.id.to_string())
}

fn detail(d: &Arc<DeviceSnapshot>) -> String {
    let mut lines = vec![
        format!("ID:          {}", d.id),
        format!("Friendly ID: {}", d.friendly_id.as_deref().unwrap_or("-")),
        format!("Name:        {}", d.name),
        format!("MAC:         {}", d.mac.as_deref().unwrap_or("-")),
        format!("Status:      {}", d.status),
        format!("Battery:     {}% ({:.2} V)", d.battery_pct, d.battery_voltage),
        format!("WiFi:        {} dBm", d.wifi_rssi),
        format!("Firmware:    {}", d.firmware_version),
        format!(
            "Refresh:     {}",
            d.refresh_rate_secs
                .map_or_else(|| "-".into(), |s| util::format_secs(u64::from(s)))
        ),
    ];
    if let Some(timeout) = d.image_timeout_secs {
        lines.push(format!("Img timeout: {}", util::format_secs(u64::from(timeout))));
    }
    if let (Some(start), Some(stop)) = (&d.sleep_start, &d.sleep_stop) {
        lines.push(format!("Sleep:       {start} - {stop}"));
    }
    if let Some(up) = d.uptime_secs {
        lines.push(format!("Uptime:      {}", util::format_secs(up)));
    }
    if let Some(seen) = d.last_seen {
        lines.push(format!("Last seen:   {}", seen.to_rfc3339()));
    }
    lines.push(format!("Backend:     {}", d.flavor));
    lines.join("\n")
}

fn build_patch(args: &DeviceUpdateArgs) -> Result<DevicePatch, CliError> {
    let mut patch = DevicePatch {
        label: args.label.clone(),
        refresh_rate: args.refresh_rate,
        image_timeout: args.image_timeout,
        firmware_update: args.firmware_update,
        sleep_start_at: args.sleep_start.clone(),
        sleep_stop_at: args.sleep_stop.clone(),
        ..DevicePatch::default()
    };
    for pair in &args.fields {
        let (key, value) = util::parse_field(pair)?;
        patch = patch.with_field(key, value);
    }
    if patch.is_empty() {
        return Err(CliError::Validation {
            field: "update".into(),
            reason: "nothing to change; pass at least one setting".into(),
        });
    }
    Ok(patch)
}

/// Warn when the cached view may be stale.
fn warn_if_stale(controller: &Controller, quiet: bool) {
    let cache = controller.cache();
    if !quiet && !cache.last_update_success() {
        let reason = cache.last_error().unwrap_or_else(|| "no successful poll yet".into());
        eprintln!("warning: device data may be stale ({reason})");
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { online } => {
            warn_if_stale(controller, global.quiet);
            let color = output::should_color(&global.color);
            let snap: Vec<_> = controller
                .snapshots()
                .iter()
                .filter(|d| !online || d.is_online())
                .cloned()
                .collect();
            let out = output::render_list(
                &global.output,
                &snap,
                |d| DeviceRow::new(d, color),
                identifier,
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            warn_if_stale(controller, global.quiet);
            let found = controller
                .snapshot(&device)
                .ok_or_else(|| CliError::not_found("Device", &device, "devices list"))?;
            let out = output::render_single(&global.output, &found, detail, identifier);
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Update(update) => {
            let patch = build_patch(&update)?;
            controller
                .execute(CoreCommand::UpdateDevice {
                    id: update.device,
                    patch,
                })
                .await?;
            if !global.quiet {
                eprintln!("Device updated");
            }
            Ok(())
        }

        DevicesCommand::Create {
            label,
            mac,
            friendly_id,
            model_id,
            refresh_rate,
        } => {
            let new = NewDevice {
                label,
                mac_address: mac,
                friendly_id,
                model_id,
                refresh_rate,
            };
            let result = controller.execute(CoreCommand::CreateDevice(new)).await?;
            if let CommandResult::Device(device) = result {
                let out = output::render_single(
                    &global.output,
                    device.as_ref(),
                    |d| format!("Created device {} ({})", d.id, d.display_name()),
                    |d| d.id.to_string(),
                );
                output::print_output(&out, global.quiet);
            }
            Ok(())
        }

        DevicesCommand::Delete { device } => {
            if !util::confirm(&format!("Delete device {device}?"), global.yes)? {
                return Ok(());
            }
            controller
                .execute(CoreCommand::DeleteDevice { id: device })
                .await?;
            if !global.quiet {
                eprintln!("Device deleted");
            }
            Ok(())
        }
    }
}
