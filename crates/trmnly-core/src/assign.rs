// ── Screen assignment ──
//
// The field a device uses to select its active screen is not confirmed
// for any server release. Until it is, assignment tries an explicit,
// ordered list of request shapes and stops at the first one the server
// accepts. Every rejected shape is logged with its position and error.

use serde::Serialize;
use tracing::{info, warn};
use trmnly_api::{DevicePatch, Error, TrmnlBackend};

use crate::error::CoreError;

/// One candidate request shape for assigning a screen to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScreenAssignment {
    CurrentScreenId,
    ScreenId,
    ActiveScreen,
    DisplayScreenId,
    /// `active_screen_id` sent together with a label.
    ActiveScreenId,
}

impl ScreenAssignment {
    /// Attempt order.
    pub const ORDER: [Self; 5] = [
        Self::CurrentScreenId,
        Self::ScreenId,
        Self::ActiveScreen,
        Self::DisplayScreenId,
        Self::ActiveScreenId,
    ];

    pub fn field(self) -> &'static str {
        match self {
            Self::CurrentScreenId => "current_screen_id",
            Self::ScreenId => "screen_id",
            Self::ActiveScreen => "active_screen",
            Self::DisplayScreenId => "display_screen_id",
            Self::ActiveScreenId => "active_screen_id",
        }
    }

    pub fn patch(self, screen_id: u64, label: Option<&str>) -> DevicePatch {
        let patch = DevicePatch::default().with_field(self.field(), screen_id);
        match (self, label) {
            (Self::ActiveScreenId, Some(label)) => DevicePatch {
                label: Some(label.to_owned()),
                ..patch
            },
            _ => patch,
        }
    }
}

/// A rejected assignment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAttempt {
    pub shape: ScreenAssignment,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    /// The server accepted `shape`, the `attempt`-th candidate (1-based).
    Assigned {
        attempt: usize,
        shape: ScreenAssignment,
    },
    /// Every shape was rejected. The screen exists but is not active.
    Unassigned { attempts: Vec<FailedAttempt> },
}

impl AssignmentOutcome {
    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

/// Make `screen_id` the active content of `device_id`.
///
/// Exhausting every shape is reported as [`AssignmentOutcome::Unassigned`],
/// not as an error. Authentication failures and flavors without device
/// updates stop immediately.
pub async fn assign_screen(
    backend: &dyn TrmnlBackend,
    device_id: &str,
    screen_id: u64,
    label: Option<&str>,
) -> Result<AssignmentOutcome, CoreError> {
    let device = backend
        .find_device(device_id)
        .await?
        .ok_or_else(|| CoreError::device_not_found(device_id))?;
    let key = device.id.to_string();

    let mut attempts = Vec::new();
    for (i, shape) in ScreenAssignment::ORDER.into_iter().enumerate() {
        let attempt = i + 1;
        match backend.update_device(&key, &shape.patch(screen_id, label)).await {
            Ok(()) => {
                info!(device = %key, screen_id, attempt, field = shape.field(), "screen assigned");
                return Ok(AssignmentOutcome::Assigned { attempt, shape });
            }
            Err(e @ (Error::Unsupported(_) | Error::Authentication { .. })) => {
                return Err(CoreError::from(e).with_flavor(backend.flavor()));
            }
            Err(e) => {
                warn!(device = %key, screen_id, attempt, field = shape.field(), error = %e, "screen assignment attempt failed");
                attempts.push(FailedAttempt {
                    shape,
                    error: e.to_string(),
                });
            }
        }
    }

    warn!(device = %key, screen_id, "no assignment shape accepted; assign the screen manually");
    Ok(AssignmentOutcome::Unassigned { attempts })
}
