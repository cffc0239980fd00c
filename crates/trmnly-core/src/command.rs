// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The
// controller routes each variant to the backend capability that serves it.

use serde::Serialize;
use trmnly_api::{Device, DevicePatch, NewDevice, NewScreen, Screen};

use crate::assign::AssignmentOutcome;
use crate::refresh::RefreshOutcome;

/// All write operations against a display server.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Devices ──────────────────────────────────────────────────────
    UpdateDevice {
        id: String,
        patch: DevicePatch,
    },
    CreateDevice(NewDevice),
    DeleteDevice {
        id: String,
    },
    /// Force the device to fetch new content now.
    RefreshDevice {
        id: String,
    },

    // ── Screens ──────────────────────────────────────────────────────
    CreateScreen(NewScreen),
    DeleteScreen {
        key: String,
    },
    AssignScreen {
        device_id: String,
        screen_id: u64,
        label: Option<String>,
    },

    // ── Plugins ──────────────────────────────────────────────────────
    SwitchPlugin {
        plugin_id: String,
    },
    SendNotification {
        plugin_uuid: String,
        title: String,
        message: String,
    },
}

impl Command {
    /// Short operation name for logs and capability errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateDevice { .. } => "update device",
            Self::CreateDevice(_) => "create device",
            Self::DeleteDevice { .. } => "delete device",
            Self::RefreshDevice { .. } => "refresh device",
            Self::CreateScreen(_) => "create screen",
            Self::DeleteScreen { .. } => "delete screen",
            Self::AssignScreen { .. } => "assign screen",
            Self::SwitchPlugin { .. } => "switch plugin",
            Self::SendNotification { .. } => "send notification",
        }
    }
}

/// Result of a successfully executed command.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    Ok,
    Device(Box<Device>),
    Screen(Screen),
    Refresh(RefreshOutcome),
    Assignment(AssignmentOutcome),
}
