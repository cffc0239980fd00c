// ── Refresh Orchestrator ──
//
// Forces a device to fetch new content sooner than its configured interval
// when the server has no "refresh now" endpoint: write a short temporary
// refresh rate, wait roughly one device poll cycle, then write the original
// rate back. The restore is a compensating action. It runs even when the
// wait is cancelled, and gets one retry. A restore that fails twice leaves
// the device polling at the temporary rate until the next explicit update;
// that state is logged at error level, returned in the outcome, and counted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trmnly_api::TrmnlBackend;

use crate::config::RefreshTiming;
use crate::error::CoreError;
use crate::model::DEFAULT_REFRESH_RATE_SECS;

/// How the restore step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestoreStatus {
    Restored,
    RestoredOnRetry,
    /// Both restore attempts failed. The device keeps the temporary rate.
    Unrestored { error: String },
}

/// Result of one forced refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub device_id: u64,
    pub friendly_id: Option<String>,
    /// Refresh rate in effect before the refresh, written back at the end.
    pub restore_value: u32,
    pub temporary_rate: u32,
    /// Whether the display-content prefetch succeeded.
    pub prefetched: bool,
    /// Whether the settle wait was cut short by cancellation.
    pub cancelled: bool,
    pub restore: RestoreStatus,
}

impl RefreshOutcome {
    pub fn is_restored(&self) -> bool {
        !matches!(self.restore, RestoreStatus::Unrestored { .. })
    }
}

/// Runs forced refreshes, one at a time per device.
///
/// Cheaply cloneable. Refreshes of different devices run concurrently.
#[derive(Clone)]
pub struct RefreshOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    backend: Arc<dyn TrmnlBackend>,
    timing: RefreshTiming,
    /// Per-device mutual exclusion, keyed by numeric id.
    locks: DashMap<u64, Arc<Mutex<()>>>,
    cancel: CancellationToken,
    unrestored: AtomicU64,
}

impl RefreshOrchestrator {
    pub fn new(backend: Arc<dyn TrmnlBackend>, timing: RefreshTiming) -> Self {
        Self::with_cancel(backend, timing, CancellationToken::new())
    }

    /// Build an orchestrator whose refresh waits end when `cancel` fires.
    pub fn with_cancel(
        backend: Arc<dyn TrmnlBackend>,
        timing: RefreshTiming,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                backend,
                timing,
                locks: DashMap::new(),
                cancel,
                unrestored: AtomicU64::new(0),
            }),
        }
    }

    pub fn timing(&self) -> &RefreshTiming {
        &self.inner.timing
    }

    /// Number of refreshes whose restore failed on both attempts.
    pub fn unrestored_count(&self) -> u64 {
        self.inner.unrestored.load(Ordering::Relaxed)
    }

    /// Force a refresh of `id` (friendly or numeric).
    ///
    /// Waits for any in-flight refresh of the same device to finish first.
    pub async fn refresh(&self, id: &str) -> Result<RefreshOutcome, CoreError> {
        self.refresh_until(id, CancellationToken::new()).await
    }

    /// Force a refresh whose settle wait also ends when `cancel` fires.
    ///
    /// The protocol runs on its own task, so dropping the returned future
    /// does not abandon a temporary rate: the restore still happens.
    pub async fn refresh_until(
        &self,
        id: &str,
        cancel: CancellationToken,
    ) -> Result<RefreshOutcome, CoreError> {
        let this = self.clone();
        let id = id.to_owned();
        let cancel = combine(&self.inner.cancel, cancel);

        tokio::spawn(async move {
            let result = this.run(&id, &cancel).await;
            // Release the watcher spawned by `combine`.
            cancel.cancel();
            result
        })
            .await
            .map_err(|e| CoreError::Internal(format!("refresh task failed: {e}")))?
    }

    // ── Protocol ─────────────────────────────────────────────────────

    async fn run(&self, id: &str, cancel: &CancellationToken) -> Result<RefreshOutcome, CoreError> {
        let backend = &self.inner.backend;
        let timing = &self.inner.timing;

        let device = backend
            .find_device(id)
            .await?
            .ok_or_else(|| CoreError::device_not_found(id))?;

        let lock = Arc::clone(self.inner.locks.entry(device.id).or_default().value());
        let _guard = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::Cancelled),
            guard = lock.lock() => guard,
        };

        // A refresh that held the lock may have changed the rate; re-read it.
        let device = backend
            .find_device(&device.id.to_string())
            .await?
            .ok_or_else(|| CoreError::device_not_found(id))?;
        let key = device.id.to_string();

        let prefetched = timing.prefetch && self.prefetch(&key).await;

        let restore_value = device.refresh_rate.unwrap_or_else(|| {
            warn!(
                device = %key,
                fallback = DEFAULT_REFRESH_RATE_SECS,
                "device reports no refresh rate, restoring to default"
            );
            DEFAULT_REFRESH_RATE_SECS
        });
        let temporary_rate = timing.temporary_rate_secs;

        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        info!(device = %key, temporary_rate, restore_value, "forcing refresh");
        if let Err(e) = backend.set_refresh_rate(&key, temporary_rate).await {
            if e.is_transient() {
                // The write may have landed before the connection failed.
                warn!(device = %key, error = %e, "temporary rate write failed, restoring anyway");
                if let RestoreStatus::Unrestored { error } =
                    self.restore(&key, restore_value, temporary_rate).await
                {
                    return Err(CoreError::RefreshUnrestored {
                        device: key,
                        temporary_rate,
                        reason: e.to_string(),
                        restore_error: error,
                    });
                }
            }
            return Err(CoreError::from(e).with_flavor(backend.flavor()));
        }

        let cancelled = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(device = %key, "refresh wait cancelled, restoring early");
                true
            }
            () = tokio::time::sleep(timing.settle_delay) => false,
        };

        let restore = self.restore(&key, restore_value, temporary_rate).await;

        Ok(RefreshOutcome {
            device_id: device.id,
            friendly_id: device.friendly_id,
            restore_value,
            temporary_rate,
            prefetched,
            cancelled,
            restore,
        })
    }

    async fn prefetch(&self, key: &str) -> bool {
        match self.inner.backend.display_content(key).await {
            Ok(_) => true,
            Err(e) => {
                debug!(device = %key, error = %e, "display prefetch failed (non-fatal)");
                false
            }
        }
    }

    async fn restore(&self, key: &str, restore_value: u32, temporary_rate: u32) -> RestoreStatus {
        let backend = &self.inner.backend;

        let first = match backend.set_refresh_rate(key, restore_value).await {
            Ok(()) => {
                debug!(device = %key, restore_value, "refresh rate restored");
                return RestoreStatus::Restored;
            }
            Err(e) => e,
        };

        warn!(device = %key, error = %first, "restore failed, retrying once");
        tokio::time::sleep(self.inner.timing.restore_retry_delay).await;

        match backend.set_refresh_rate(key, restore_value).await {
            Ok(()) => {
                info!(device = %key, restore_value, "refresh rate restored on retry");
                RestoreStatus::RestoredOnRetry
            }
            Err(e) => {
                self.inner.unrestored.fetch_add(1, Ordering::Relaxed);
                error!(
                    target: "trmnly::refresh",
                    unrestored = true,
                    device = %key,
                    restore_value,
                    temporary_rate,
                    error = %e,
                    "refresh rate not restored; device keeps polling at the temporary rate until its next update"
                );
                RestoreStatus::Unrestored {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// A token that fires when either input fires.
fn combine(shared: &CancellationToken, caller: CancellationToken) -> CancellationToken {
    let combined = shared.child_token();
    let watcher = combined.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = caller.cancelled() => watcher.cancel(),
            () = watcher.cancelled() => {}
        }
    });
    combined
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    use super::*;
    use crate::testing::{FakeBackend, capture_events, device};

    fn orchestrator(fake: &Arc<FakeBackend>) -> RefreshOrchestrator {
        RefreshOrchestrator::new(fake.clone(), RefreshTiming::default())
    }

    #[tokio::test(start_paused = true)]
    async fn writes_temporary_rate_then_restores() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        let orch = orchestrator(&fake);

        let start = Instant::now();
        let outcome = orch.refresh("ABC").await.unwrap();

        assert_eq!(fake.rates(), vec![10, 3600]);
        assert_eq!(outcome.restore, RestoreStatus::Restored);
        assert_eq!(outcome.restore_value, 3600);
        assert!(outcome.prefetched);
        assert!(!outcome.cancelled);
        assert_eq!(fake.current_rate(1), Some(3600));

        let writes = fake.writes();
        assert!(writes[1].at - writes[0].at >= Duration::from_secs(15));
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn numeric_and_friendly_ids_refresh_same_device() {
        let fake = Arc::new(FakeBackend::new(vec![device(4, "KITCHEN", Some(900))]));
        let orch = orchestrator(&fake);

        orch.refresh("4").await.unwrap();
        orch.refresh("KITCHEN").await.unwrap();

        assert!(fake.writes().iter().all(|w| w.device == 4));
        assert_eq!(fake.rates(), vec![10, 900, 10, 900]);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_succeeds_on_retry() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        fake.fail_rate(3600, 1);
        let orch = orchestrator(&fake);

        let outcome = orch.refresh("ABC").await.unwrap();

        assert_eq!(outcome.restore, RestoreStatus::RestoredOnRetry);
        assert!(outcome.is_restored());
        assert_eq!(fake.current_rate(1), Some(3600));
        assert_eq!(orch.unrestored_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn double_restore_failure_still_reports_success() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        fake.fail_rate(3600, 2);
        let orch = orchestrator(&fake);

        let outcome = orch.refresh("ABC").await.unwrap();

        assert!(matches!(outcome.restore, RestoreStatus::Unrestored { .. }));
        assert!(!outcome.is_restored());
        assert_eq!(orch.unrestored_count(), 1);
        assert_eq!(fake.current_rate(1), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_device_is_not_found() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        let orch = orchestrator(&fake);

        let err = orch.refresh("GHOST").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert!(fake.rates().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_rate_restores_to_default() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", None)]));
        let orch = orchestrator(&fake);

        let outcome = orch.refresh("ABC").await.unwrap();
        assert_eq!(outcome.restore_value, DEFAULT_REFRESH_RATE_SECS);
        assert_eq!(fake.rates(), vec![10, DEFAULT_REFRESH_RATE_SECS]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_temporary_write_is_an_error() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        fake.fail_rate(10, 1);
        let orch = orchestrator(&fake);

        let err = orch.refresh("ABC").await.unwrap_err();
        assert!(matches!(err, CoreError::Api { status: Some(500), .. }));
        // Non-transient: the write was rejected, nothing to compensate.
        assert!(fake.rates().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_temporary_write_failure_still_restores() {
        let mut fake = FakeBackend::new(vec![device(1, "ABC", Some(3600))]);
        fake.calls_transient = true;
        fake.fail_rate(10, 1);
        let fake = Arc::new(fake);
        let orch = orchestrator(&fake);

        let err = orch.refresh("ABC").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(fake.rates(), vec![3600]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_write_with_failed_restore_reports_unrestored() {
        let mut fake = FakeBackend::new(vec![device(1, "ABC", Some(3600))]);
        fake.calls_transient = true;
        fake.fail_rate(10, 1);
        fake.fail_rate(3600, 2);
        let fake = Arc::new(fake);
        let orch = orchestrator(&fake);

        let err = orch.refresh("ABC").await.unwrap_err();
        match err {
            CoreError::RefreshUnrestored {
                device,
                temporary_rate,
                ..
            } => {
                assert_eq!(device, "1");
                assert_eq!(temporary_rate, 10);
            }
            other => panic!("expected RefreshUnrestored, got {other:?}"),
        }
        assert_eq!(orch.unrestored_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unrestored_refresh_logs_error_event() {
        let (events, _guard) = capture_events();
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        fake.fail_rate(3600, 2);
        let orch = orchestrator(&fake);

        orch.refresh("ABC").await.unwrap();

        let events = events.lock().unwrap();
        let unrestored: Vec<_> = events.iter().filter(|e| e.unrestored).collect();
        assert_eq!(unrestored.len(), 1);
        assert_eq!(unrestored[0].target, "trmnly::refresh");
        assert_eq!(unrestored[0].level, tracing::Level::ERROR);
    }

    #[tokio::test(start_paused = true)]
    async fn restored_refresh_logs_no_unrestored_event() {
        let (events, _guard) = capture_events();
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        fake.fail_rate(3600, 1);
        let orch = orchestrator(&fake);

        orch.refresh("ABC").await.unwrap();

        assert!(events.lock().unwrap().iter().all(|e| !e.unrestored));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_of_one_device_are_serialized() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        let orch = orchestrator(&fake);

        let (a, b) = tokio::join!(orch.refresh("ABC"), orch.refresh("1"));
        a.unwrap();
        b.unwrap();

        assert_eq!(fake.rates(), vec![10, 3600, 10, 3600]);
        let writes = fake.writes();
        assert!(writes[2].at >= writes[1].at);
    }

    #[tokio::test(start_paused = true)]
    async fn different_devices_refresh_concurrently() {
        let fake = Arc::new(FakeBackend::new(vec![
            device(1, "ABC", Some(3600)),
            device(2, "XYZ", Some(1800)),
        ]));
        let orch = orchestrator(&fake);

        let start = Instant::now();
        let (a, b) = tokio::join!(orch.refresh("ABC"), orch.refresh("XYZ"));
        a.unwrap();
        b.unwrap();

        assert!(start.elapsed() < Duration::from_secs(30));
        assert_eq!(fake.writes().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_cuts_wait_but_still_restores() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        let orch = orchestrator(&fake);
        let token = CancellationToken::new();

        let start = Instant::now();
        let task = {
            let orch = orch.clone();
            let token = token.clone();
            tokio::spawn(async move { orch.refresh_until("ABC", token).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.restore, RestoreStatus::Restored);
        assert_eq!(fake.rates(), vec![10, 3600]);
        assert!(start.elapsed() < Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_caller_does_not_abandon_restore() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        let orch = orchestrator(&fake);

        let res = tokio::time::timeout(Duration::from_secs(1), orch.refresh("ABC")).await;
        assert!(res.is_err());
        assert_eq!(fake.rates(), vec![10]);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fake.rates(), vec![10, 3600]);
    }
}
