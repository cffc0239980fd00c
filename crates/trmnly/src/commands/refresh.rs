//! Forced refresh handler.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use trmnly_core::{Controller, RefreshOutcome, RestoreStatus, SyncConfig};

use crate::cli::{GlobalOpts, RefreshArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// Apply per-invocation timing flags before the controller is built.
pub fn apply_timing(config: &mut SyncConfig, args: &RefreshArgs) {
    if let Some(secs) = args.settle {
        config.refresh.settle_delay = Duration::from_secs(secs);
    }
    if args.no_prefetch {
        config.refresh.prefetch = false;
    }
}

fn spinner(message: String, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn detail(o: &RefreshOutcome) -> String {
    let name = o
        .friendly_id
        .clone()
        .unwrap_or_else(|| o.device_id.to_string());
    let restore = match &o.restore {
        RestoreStatus::Restored => format!("restored to {}", util::format_secs(u64::from(o.restore_value))),
        RestoreStatus::RestoredOnRetry => format!(
            "restored to {} (after retry)",
            util::format_secs(u64::from(o.restore_value))
        ),
        RestoreStatus::Unrestored { error } => format!(
            "NOT restored, device still at {}s: {error}",
            o.temporary_rate
        ),
    };
    let mut lines = vec![format!("Refreshed {name}"), format!("Refresh rate: {restore}")];
    if o.cancelled {
        lines.push("Wait cut short by interrupt".into());
    }
    lines.join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: RefreshArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let timing = controller.orchestrator().timing();
    let bar = spinner(
        format!(
            "Refreshing {} (rate {}s for {})",
            args.device,
            timing.temporary_rate_secs,
            util::format_secs(timing.settle_delay.as_secs())
        ),
        global.quiet,
    );

    let refresh = controller.refresh_device(&args.device);
    tokio::pin!(refresh);

    let result = tokio::select! {
        result = &mut refresh => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, restoring refresh rate");
            bar.set_message("Interrupted, restoring refresh rate");
            controller.shutdown().await;
            refresh.await
        }
    };
    bar.finish_and_clear();

    let outcome = result?;
    let out = output::render_single(&global.output, &outcome, detail, |o| o.device_id.to_string());
    output::print_output(&out, global.quiet);

    match outcome.restore {
        RestoreStatus::Unrestored { error } => Err(CliError::ApiError {
            code: "unrestored".into(),
            message: format!(
                "device {} was left at the temporary refresh rate: {error}",
                outcome.device_id
            ),
        }),
        _ if outcome.cancelled => Err(CliError::Interrupted),
        _ => Ok(()),
    }
}
