//! Live device watch: poll on the configured interval and print changes.

use std::sync::Arc;

use chrono::Local;
use tracing::info;
use trmnly_core::{Controller, DeviceSnapshot, SyncConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

fn summary_line(d: &Arc<DeviceSnapshot>, color: bool) -> String {
    let wifi = format!("{}dBm", d.wifi_rssi);
    format!(
        "{:<12} {:<20} {:<8} {:>5} {:>8} {}",
        d.friendly_id.as_deref().unwrap_or("-"),
        d.name,
        output::paint_status(d.status, color),
        output::paint_battery(d.battery_pct, color),
        wifi,
        d.firmware_version,
    )
}

fn render(devices: &[Arc<DeviceSnapshot>], global: &GlobalOpts, color: bool) -> String {
    match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            let mut lines = vec![format!("── {} ──", Local::now().format("%H:%M:%S"))];
            lines.extend(devices.iter().map(|d| summary_line(d, color)));
            lines.join("\n")
        }
        // One document per update so the stream stays parseable line by line
        _ => output::render_single(&OutputFormat::JsonCompact, devices, |_| String::new(), |_| String::new()),
    }
}

pub async fn handle(config: SyncConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = Controller::new(config)?;
    controller.start().await?;
    info!("watching devices, Ctrl-C to stop");

    let color = output::should_color(&global.color);
    let mut stream = controller.subscribe();
    let mut health = controller.cache().subscribe_health();

    output::print_output(&render(stream.current(), global, color), global.quiet);

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            update = stream.changed() => {
                let Some(devices) = update else { break };
                output::print_output(&render(&devices, global, color), global.quiet);
            }
            changed = health.changed() => {
                if changed.is_err() {
                    break;
                }
                let h = health.borrow_and_update().clone();
                if !h.last_update_success && !global.quiet {
                    eprintln!(
                        "poll failed ({} in a row): {}",
                        h.consecutive_failures,
                        h.last_error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}
