// trmnly-core: Device sync engine between trmnly-api and consumers (CLI).

pub mod assign;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod refresh;
pub mod store;
pub mod stream;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use assign::{AssignmentOutcome, FailedAttempt, ScreenAssignment, assign_screen};
pub use command::{Command, CommandResult};
pub use config::{AuthCredentials, RefreshTiming, SyncConfig};
pub use controller::{Controller, connect};
pub use coordinator::{Coordinator, PollOutcome, PollState};
pub use dashboard::{DashboardRequest, PublishOutcome, publish_dashboard, publish_image};
pub use error::CoreError;
pub use model::{DeviceSnapshot, DeviceStatus, battery_percentage};
pub use refresh::{RefreshOrchestrator, RefreshOutcome, RestoreStatus};
pub use store::{PollHealth, StateCache};
pub use stream::SnapshotStream;
pub use trmnly_api::{
    BackendFlavor, Device, DevicePatch, DisplayContent, ManagementApi, Model, NewDevice, NewScreen,
    Orientation, PluginApi, Screen, ScreenImage, ScreenshotClient, ScreenshotRequest, TrmnlBackend,
};
