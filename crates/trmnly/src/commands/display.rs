//! Display content handler.

use trmnly_core::{Controller, CoreError, DisplayContent};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(d: &DisplayContent) -> String {
    let mut lines = vec![
        format!("Image:    {}", d.image_url.as_deref().unwrap_or("-")),
        format!("Filename: {}", d.filename.as_deref().unwrap_or("-")),
        format!(
            "Refresh:  {}",
            d.refresh_rate.map_or_else(|| "-".into(), |r| format!("{r}s"))
        ),
    ];
    if d.update_firmware == Some(true) {
        lines.push(format!(
            "Firmware: update pending ({})",
            d.firmware_url.as_deref().unwrap_or("no url")
        ));
    }
    if let Some(ref special) = d.special_function {
        lines.push(format!("Special:  {special}"));
    }
    lines.join("\n")
}

pub async fn handle(
    controller: &Controller,
    device: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let content = controller
        .backend()
        .display_content(device)
        .await
        .map_err(CoreError::from)?;
    let out = output::render_single(&global.output, &content, detail, |d| {
        d.image_url.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
