// ── Dashboard publishing ──
//
// Capture a web dashboard through the external screenshot renderer, store
// it as a screen, and make it the device's active content.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use trmnly_api::{NewScreen, Screen, ScreenImage, ScreenshotClient, ScreenshotRequest, TrmnlBackend};

use crate::assign::{AssignmentOutcome, assign_screen};
use crate::error::CoreError;

/// Model id used when the server insists on one for new screens.
pub const FALLBACK_MODEL_ID: u64 = 1;

#[derive(Debug, Clone)]
pub struct DashboardRequest {
    /// Target device, by friendly or numeric id.
    pub device_id: String,
    /// Dashboard path, used for naming (e.g. `/lovelace/0`).
    pub path: String,
    pub capture: ScreenshotRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub screen: Screen,
    pub assignment: AssignmentOutcome,
}

/// Screen name for a dashboard captured at `unix_ts`.
pub fn screen_name(path: &str, unix_ts: i64) -> String {
    format!("Dashboard_{}_{unix_ts}", path.replace(['/', '\\'], "_"))
}

pub fn screen_label(path: &str) -> String {
    format!("Dashboard {path}")
}

/// Capture and publish in one step.
pub async fn publish_dashboard(
    backend: &dyn TrmnlBackend,
    screenshots: &ScreenshotClient,
    request: &DashboardRequest,
) -> Result<PublishOutcome, CoreError> {
    if backend.find_device(&request.device_id).await?.is_none() {
        return Err(CoreError::device_not_found(&request.device_id));
    }
    let image = screenshots.capture(&request.capture).await?;
    info!(path = %request.path, bytes = image.len(), "dashboard captured");
    publish_image(backend, request, image).await
}

/// Store an already-captured base64 image as a screen and assign it.
pub async fn publish_image(
    backend: &dyn TrmnlBackend,
    request: &DashboardRequest,
    image_base64: String,
) -> Result<PublishOutcome, CoreError> {
    let management = backend.management().ok_or_else(|| CoreError::Unsupported {
        operation: "screen management".into(),
        flavor: backend.flavor().to_string(),
    })?;

    let name = screen_name(&request.path, Utc::now().timestamp());
    let label = screen_label(&request.path);

    let plain = NewScreen {
        name: name.clone(),
        label: Some(label.clone()),
        model_id: None,
        image: ScreenImage::from_base64(image_base64.clone()),
    };

    let screen = match management.create_screen(&plain).await {
        Ok(screen) => screen,
        Err(e) if e.is_auth() || e.is_transient() => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "plain screen create rejected, retrying with model id");
            let with_model = NewScreen {
                model_id: Some(FALLBACK_MODEL_ID),
                image: ScreenImage {
                    model_id: Some(FALLBACK_MODEL_ID),
                    ..ScreenImage::from_base64(image_base64)
                },
                ..plain
            };
            management.create_screen(&with_model).await?
        }
    };
    info!(screen_id = screen.id, name = %name, "screen created");

    let assignment = assign_screen(backend, &request.device_id, screen.id, Some(&label)).await?;
    if !assignment.is_assigned() {
        info!(screen_id = screen.id, device = %request.device_id, "screen available for manual assignment");
    }

    Ok(PublishOutcome { screen, assignment })
}
