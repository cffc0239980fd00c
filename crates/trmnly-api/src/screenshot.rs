// Client for the external dashboard screenshot renderer.
//
// The renderer is an opaque service: it loads a URL in a headless browser
// and returns a base64 PNG. Rendering is slow, so it gets its own
// transport with a long timeout.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::{Transport, TransportConfig};

pub const DEFAULT_SCREENSHOT_URL: &str = "http://localhost:3001";
pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

/// Capture parameters. Field names follow the renderer's camelCase wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRequest {
    pub url: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Milliseconds to let the page settle before capture.
    pub wait_time: u32,
    pub orientation: Orientation,
    pub center_x: i32,
    pub center_y: i32,
    pub margin_top: u32,
    pub margin_bottom: u32,
    pub margin_left: u32,
    pub margin_right: u32,
    /// Rotation angle in degrees.
    pub rotation: f64,
}

impl ScreenshotRequest {
    /// A landscape 800x480 capture of `url` with default framing.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: 800,
            height: 480,
            theme: None,
            wait_time: 2000,
            orientation: Orientation::Landscape,
            center_x: 0,
            center_y: 0,
            margin_top: 0,
            margin_bottom: 0,
            margin_left: 0,
            margin_right: 0,
            rotation: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScreenshotResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScreenshotClient {
    transport: Transport,
}

impl ScreenshotClient {
    pub fn new(base_url: Url) -> Result<Self, Error> {
        let config = TransportConfig {
            timeout: SCREENSHOT_TIMEOUT,
        };
        Ok(Self {
            transport: Transport::new(base_url, &config, HeaderMap::new())?,
        })
    }

    pub fn with_transport(transport: Transport) -> Self {
        Self { transport }
    }

    /// Render a page and return the base64-encoded image.
    ///
    /// `POST /screenshot`
    pub async fn capture(&self, request: &ScreenshotRequest) -> Result<String, Error> {
        debug!(url = %request.url, width = request.width, height = request.height, "capturing screenshot");
        let body = serde_json::to_value(request).map_err(|e| Error::Screenshot {
            message: e.to_string(),
        })?;

        let raw = match self.transport.post("/screenshot", &body).await {
            Ok(raw) => raw,
            Err(Error::Api { status, body }) => {
                return Err(Error::Screenshot {
                    message: format!("HTTP {status}: {body}"),
                });
            }
            Err(e) => return Err(e),
        };

        let resp: ScreenshotResponse = raw.into_typed()?;
        match (resp.success, resp.image) {
            (true, Some(image)) if !image.is_empty() => Ok(image),
            _ => Err(Error::Screenshot {
                message: resp
                    .message
                    .unwrap_or_else(|| "renderer returned no image".into()),
            }),
        }
    }
}
