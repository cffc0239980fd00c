//! Dashboard publishing handler.

use trmnly_core::{Controller, CoreError, DashboardRequest, PublishOutcome, ScreenshotClient, ScreenshotRequest};

use crate::cli::{DashboardArgs, DashboardCommand, GlobalOpts, PublishArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::screens::assignment_detail;

/// Dashboard path used for naming: the flag, else the URL's path.
fn dashboard_path(args: &PublishArgs) -> Result<String, CliError> {
    if let Some(ref path) = args.path {
        return Ok(path.clone());
    }
    let url: url::Url = args.url.parse().map_err(|_| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", args.url),
    })?;
    Ok(url.path().to_owned())
}

fn capture_request(args: &PublishArgs) -> ScreenshotRequest {
    ScreenshotRequest {
        width: args.width,
        height: args.height,
        theme: args.theme.clone(),
        wait_time: args.wait_ms,
        orientation: args.orientation.into(),
        rotation: args.rotation,
        ..ScreenshotRequest::new(args.url.clone())
    }
}

fn detail(o: &PublishOutcome) -> String {
    format!(
        "Screen {} ({})\n{}",
        o.screen.id,
        o.screen.name.as_deref().unwrap_or("-"),
        assignment_detail(&o.assignment)
    )
}

pub async fn handle(
    controller: &Controller,
    args: DashboardArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DashboardCommand::Publish(publish) => {
            let renderer = config::screenshot_url(global, publish.screenshot_url.as_deref())?;
            let screenshots = ScreenshotClient::new(renderer).map_err(CoreError::from)?;
            let request = DashboardRequest {
                device_id: publish.device.clone(),
                path: dashboard_path(&publish)?,
                capture: capture_request(&publish),
            };

            let outcome = controller.publish_dashboard(&screenshots, &request).await?;
            let out = output::render_single(&global.output, &outcome, detail, |o| {
                o.screen.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
