// ── State Cache ──
//
// Last-known snapshot per device plus the health of the most recent poll.
// Readers get cheap `Arc` snapshots; only the Polling Coordinator writes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::collection::KeyedCollection;
use crate::model::DeviceSnapshot;
use crate::stream::SnapshotStream;

/// Outcome of the most recent poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollHealth {
    /// `false` until the first successful poll, and after any failed one.
    pub last_update_success: bool,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

/// Cached device snapshots, keyed by numeric id with friendly-id aliases.
pub struct StateCache {
    devices: KeyedCollection<DeviceSnapshot>,
    health: watch::Sender<PollHealth>,
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCache {
    pub fn new() -> Self {
        let (health, _) = watch::channel(PollHealth::default());
        Self {
            devices: KeyedCollection::new(),
            health,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Snapshot for a device, by friendly id or numeric id.
    pub fn snapshot(&self, id: &str) -> Option<Arc<DeviceSnapshot>> {
        self.devices.get(id)
    }

    /// All cached snapshots, ordered by numeric id.
    pub fn snapshots(&self) -> Arc<Vec<Arc<DeviceSnapshot>>> {
        self.devices.snapshot()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Subscribe to snapshot replacement.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.devices.subscribe())
    }

    pub fn health(&self) -> PollHealth {
        self.health.borrow().clone()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<PollHealth> {
        self.health.subscribe()
    }

    pub fn last_update_success(&self) -> bool {
        self.health.borrow().last_update_success
    }

    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.health.borrow().last_success_at
    }

    pub fn last_error(&self) -> Option<String> {
        self.health.borrow().last_error.clone()
    }

    // ── Writes (coordinator only) ────────────────────────────────────

    /// Replace every snapshot with the result of a successful poll.
    /// Devices absent from `snapshots` are dropped.
    pub(crate) fn apply_poll(&self, snapshots: Vec<DeviceSnapshot>, at: DateTime<Utc>) {
        self.devices.replace_all(
            snapshots
                .into_iter()
                .map(|s| (s.id, s.friendly_id.clone(), s)),
        );
        self.health.send_modify(|h| {
            h.last_update_success = true;
            h.last_success_at = Some(at);
            h.last_error = None;
            h.consecutive_failures = 0;
        });
    }

    /// Record a failed poll. Snapshots are left untouched.
    pub(crate) fn mark_failed(&self, error: &str, at: DateTime<Utc>) {
        self.health.send_modify(|h| {
            h.last_update_success = false;
            h.last_failure_at = Some(at);
            h.last_error = Some(error.to_owned());
            h.consecutive_failures = h.consecutive_failures.saturating_add(1);
        });
    }
}
