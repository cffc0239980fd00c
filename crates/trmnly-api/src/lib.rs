// trmnly-api: Async Rust client for TRMNL display servers (self-hosted + hosted)

pub mod auth;
pub mod backend;
pub mod error;
pub mod hosted;
pub mod models;
pub mod screenshot;
pub mod self_hosted;
pub mod transport;

pub use auth::{BackendFlavor, Credentials};
pub use backend::{ManagementApi, PluginApi, TrmnlBackend};
pub use error::Error;
pub use hosted::HostedClient;
pub use hosted::client::DEFAULT_BASE_URL as HOSTED_BASE_URL;
pub use models::{
    Device, DevicePatch, DisplayContent, Model, ModelPatch, NewDevice, NewModel, NewScreen, Screen,
    ScreenImage, ScreenPatch, resolve_device,
};
pub use screenshot::{
    DEFAULT_SCREENSHOT_URL, Orientation, ScreenshotClient, ScreenshotRequest,
};
pub use self_hosted::SelfHostedClient;
pub use self_hosted::client::DEFAULT_PORT;
pub use transport::{RawResponse, Transport, TransportConfig};
