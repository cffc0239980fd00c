// ── Polling Coordinator ──
//
// Periodic and on-demand polls of the server's device listing, normalized
// into the State Cache. A failed poll keeps the previous snapshots and
// flips the availability flag. One list call covers every tracked device,
// so a single in-flight guard serializes polls per device; a poll requested
// while another is outstanding is skipped, not queued.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trmnly_api::{TrmnlBackend, resolve_device};

use crate::error::CoreError;
use crate::model::DeviceSnapshot;
use crate::store::StateCache;

/// Where the coordinator is in its poll cycle.
///
/// `Success` and `Failed` are resting states: they hold until the next
/// poll starts. `Idle` means no poll has run yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
pub enum PollState {
    #[default]
    Idle,
    Fetching,
    Success,
    Failed,
}

/// Result of one `poll_now` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Updated { devices: usize },
    Failed { error: String },
    /// Another poll was still in flight.
    Skipped,
}

/// Cheaply cloneable handle to the polling loop.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    backend: Arc<dyn TrmnlBackend>,
    cache: Arc<StateCache>,
    tracked: Vec<String>,
    interval: Duration,
    state: watch::Sender<PollState>,
    in_flight: Mutex<()>,
    wake: Notify,
}

impl Coordinator {
    pub fn new(
        backend: Arc<dyn TrmnlBackend>,
        cache: Arc<StateCache>,
        tracked: Vec<String>,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            inner: Arc::new(CoordinatorInner {
                backend,
                cache,
                tracked,
                interval,
                state,
                in_flight: Mutex::new(()),
                wake: Notify::new(),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<StateCache> {
        &self.inner.cache
    }

    pub fn state(&self) -> PollState {
        *self.inner.state.borrow()
    }

    /// Ask the running loop for a poll as soon as possible.
    ///
    /// Requests made while a poll is pending coalesce into one. A request
    /// made while a poll is in flight is dropped.
    pub fn request_refresh(&self) {
        if self.inner.in_flight.try_lock().is_err() {
            debug!("poll in flight, refresh request skipped");
            return;
        }
        self.inner.wake.notify_one();
    }

    /// Poll once, now. Skipped if a poll is already in flight.
    pub async fn poll_now(&self) -> PollOutcome {
        let Ok(_guard) = self.inner.in_flight.try_lock() else {
            debug!("poll already in flight, skipping");
            return PollOutcome::Skipped;
        };

        self.inner.state.send_replace(PollState::Fetching);
        let started = Utc::now();

        match self.fetch().await {
            Ok(snapshots) => {
                let devices = snapshots.len();
                self.inner.cache.apply_poll(snapshots, started);
                self.inner.state.send_replace(PollState::Success);
                debug!(devices, "poll complete");
                PollOutcome::Updated { devices }
            }
            Err(e) => {
                let error = e.to_string();
                warn!(error = %error, "poll failed, keeping last snapshot");
                self.inner.cache.mark_failed(&error, started);
                self.inner.state.send_replace(PollState::Failed);
                PollOutcome::Failed { error }
            }
        }
    }

    /// Drive polls from the interval timer and on-demand requests until
    /// `cancel` fires. A zero interval serves on-demand requests only.
    ///
    /// Polls run on this task, so once the returned future completes no
    /// poll can write to the cache.
    pub async fn run(self, cancel: CancellationToken) {
        let period = if self.inner.interval.is_zero() {
            None
        } else {
            Some(self.inner.interval)
        };
        let mut ticker = period.map(|p| {
            let mut t = tokio::time::interval(p);
            t.set_missed_tick_behavior(MissedTickBehavior::Skip);
            t
        });
        if let Some(t) = ticker.as_mut() {
            t.tick().await; // consume the immediate first tick
        }

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.inner.wake.notified() => {
                    self.poll_now().await;
                }
                _ = tick(ticker.as_mut()) => {
                    self.poll_now().await;
                }
            }
        }
        debug!("polling loop stopped");
    }

    async fn fetch(&self) -> Result<Vec<DeviceSnapshot>, CoreError> {
        let backend = &self.inner.backend;
        let devices = backend.list_devices().await?;
        let flavor = backend.flavor();
        let now = Utc::now();

        if self.inner.tracked.is_empty() {
            return Ok(devices
                .into_iter()
                .map(|d| DeviceSnapshot::from_device(d, flavor, now))
                .collect());
        }

        let mut seen = HashSet::new();
        let mut snapshots = Vec::with_capacity(self.inner.tracked.len());
        for id in &self.inner.tracked {
            match resolve_device(&devices, id) {
                Some(d) if seen.insert(d.id) => {
                    snapshots.push(DeviceSnapshot::from_device(d.clone(), flavor, now));
                }
                Some(_) => {}
                None => warn!(device = %id, "configured device not listed by server"),
            }
        }
        Ok(snapshots)
    }
}

/// Wait for the next tick, or forever when there is no timer.
async fn tick(ticker: Option<&mut tokio::time::Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}
