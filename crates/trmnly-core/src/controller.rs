// ── Controller facade ──
//
// Lifecycle management for one display server: backend selection,
// background polling, command routing, and snapshot access.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trmnly_api::{
    HostedClient, ManagementApi, PluginApi, ScreenshotClient, SelfHostedClient, TransportConfig,
    TrmnlBackend,
};

use crate::assign::assign_screen;
use crate::command::{Command, CommandResult};
use crate::config::{AuthCredentials, SyncConfig};
use crate::coordinator::{Coordinator, PollOutcome};
use crate::dashboard::{DashboardRequest, PublishOutcome};
use crate::error::CoreError;
use crate::model::DeviceSnapshot;
use crate::refresh::{RefreshOrchestrator, RefreshOutcome};
use crate::store::StateCache;
use crate::stream::SnapshotStream;

/// Build the backend client for the configured flavor.
pub fn connect(config: &SyncConfig) -> Result<Arc<dyn TrmnlBackend>, CoreError> {
    let transport = TransportConfig {
        timeout: config.timeout,
    };
    let backend: Arc<dyn TrmnlBackend> = match &config.auth {
        AuthCredentials::SelfHosted { token } => Arc::new(SelfHostedClient::new(
            config.url.clone(),
            token.clone(),
            &transport,
        )?),
        AuthCredentials::Hosted {
            access_token,
            device_mac,
        } => Arc::new(HostedClient::new(
            config.url.clone(),
            access_token.clone(),
            device_mac.clone(),
            &transport,
        )?),
    };
    debug!(flavor = %backend.flavor(), url = %config.url, "backend selected");
    Ok(backend)
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: SyncConfig,
    backend: Arc<dyn TrmnlBackend>,
    cache: Arc<StateCache>,
    coordinator: Coordinator,
    orchestrator: RefreshOrchestrator,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller from configuration. Does NOT contact the
    /// server; call [`start()`](Self::start) for that.
    pub fn new(config: SyncConfig) -> Result<Self, CoreError> {
        let backend = connect(&config)?;
        Ok(Self::with_backend(config, backend))
    }

    /// Create a controller around an existing backend.
    pub fn with_backend(config: SyncConfig, backend: Arc<dyn TrmnlBackend>) -> Self {
        let cancel = CancellationToken::new();
        let cache = Arc::new(StateCache::new());
        let coordinator = Coordinator::new(
            Arc::clone(&backend),
            Arc::clone(&cache),
            config.devices.clone(),
            config.poll_interval,
        );
        let orchestrator = RefreshOrchestrator::with_cancel(
            Arc::clone(&backend),
            config.refresh.clone(),
            cancel.child_token(),
        );

        Self {
            inner: Arc::new(ControllerInner {
                config,
                backend,
                cache,
                coordinator,
                orchestrator,
                cancel,
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn backend(&self) -> &Arc<dyn TrmnlBackend> {
        &self.inner.backend
    }

    pub fn cache(&self) -> &Arc<StateCache> {
        &self.inner.cache
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.inner.coordinator
    }

    pub fn orchestrator(&self) -> &RefreshOrchestrator {
        &self.inner.orchestrator
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Check the server, run the initial poll, and spawn the polling loop.
    ///
    /// A failed initial poll is not fatal: the cache reports itself
    /// unavailable until a later poll succeeds.
    pub async fn start(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        if !self.inner.backend.test_connection().await {
            return Err(CoreError::ConnectionFailed {
                url: config.url.to_string(),
                reason: "server did not answer the connection test".into(),
            });
        }

        if let PollOutcome::Failed { error } = self.inner.coordinator.poll_now().await {
            warn!(error = %error, "initial poll failed");
        }

        let coordinator = self.inner.coordinator.clone();
        let cancel = self.inner.cancel.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(coordinator.run(cancel)));

        info!(
            flavor = %self.inner.backend.flavor(),
            devices = self.inner.cache.device_count(),
            "sync started"
        );
        Ok(())
    }

    /// Stop background polling and cut any refresh wait short. Refreshes
    /// in progress still restore their devices.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("sync stopped");
    }

    /// One-shot: start without a poll timer, run closure, shut down.
    pub async fn oneshot<F, Fut, T>(config: SyncConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let controller = Controller::new(cfg)?;
        controller.start().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command. Successful writes request a prompt poll.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let name = cmd.name();
        debug!(command = name, "executing");
        let flavor = self.inner.backend.flavor();
        let result = self
            .route(cmd)
            .await
            .map_err(|e| e.with_flavor(flavor))?;
        self.inner.coordinator.request_refresh();
        Ok(result)
    }

    /// Force a refresh of one device.
    pub async fn refresh_device(&self, id: &str) -> Result<RefreshOutcome, CoreError> {
        let outcome = self.inner.orchestrator.refresh(id).await?;
        self.inner.coordinator.request_refresh();
        Ok(outcome)
    }

    /// Capture a dashboard and make it the device's active screen.
    pub async fn publish_dashboard(
        &self,
        screenshots: &ScreenshotClient,
        request: &DashboardRequest,
    ) -> Result<PublishOutcome, CoreError> {
        let outcome =
            crate::dashboard::publish_dashboard(self.inner.backend.as_ref(), screenshots, request)
                .await?;
        self.inner.coordinator.request_refresh();
        Ok(outcome)
    }

    async fn route(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let backend = self.inner.backend.as_ref();

        match cmd {
            Command::UpdateDevice { id, patch } => {
                backend.update_device(&id, &patch).await?;
                Ok(CommandResult::Ok)
            }
            Command::CreateDevice(new) => {
                let device = self.management("create device")?.create_device(&new).await?;
                Ok(CommandResult::Device(Box::new(device)))
            }
            Command::DeleteDevice { id } => {
                self.management("delete device")?.delete_device(&id).await?;
                Ok(CommandResult::Ok)
            }
            Command::RefreshDevice { id } => {
                let outcome = self.inner.orchestrator.refresh(&id).await?;
                Ok(CommandResult::Refresh(outcome))
            }
            Command::CreateScreen(new) => {
                let screen = self.management("create screen")?.create_screen(&new).await?;
                Ok(CommandResult::Screen(screen))
            }
            Command::DeleteScreen { key } => {
                self.management("delete screen")?.delete_screen(&key).await?;
                Ok(CommandResult::Ok)
            }
            Command::AssignScreen {
                device_id,
                screen_id,
                label,
            } => {
                let outcome =
                    assign_screen(backend, &device_id, screen_id, label.as_deref()).await?;
                Ok(CommandResult::Assignment(outcome))
            }
            Command::SwitchPlugin { plugin_id } => {
                self.plugins("switch plugin")?.switch_plugin(&plugin_id).await?;
                Ok(CommandResult::Ok)
            }
            Command::SendNotification {
                plugin_uuid,
                title,
                message,
            } => {
                self.plugins("send notification")?
                    .send_notification(&plugin_uuid, &title, &message)
                    .await?;
                Ok(CommandResult::Ok)
            }
        }
    }

    fn management(&self, operation: &str) -> Result<&dyn ManagementApi, CoreError> {
        self.inner
            .backend
            .management()
            .ok_or_else(|| self.unsupported(operation))
    }

    fn plugins(&self, operation: &str) -> Result<&dyn PluginApi, CoreError> {
        self.inner
            .backend
            .plugins()
            .ok_or_else(|| self.unsupported(operation))
    }

    fn unsupported(&self, operation: &str) -> CoreError {
        CoreError::Unsupported {
            operation: operation.into(),
            flavor: self.inner.backend.flavor().to_string(),
        }
    }

    // ── State observation ────────────────────────────────────────

    pub fn snapshots(&self) -> Arc<Vec<Arc<DeviceSnapshot>>> {
        self.inner.cache.snapshots()
    }

    pub fn snapshot(&self, id: &str) -> Option<Arc<DeviceSnapshot>> {
        self.inner.cache.snapshot(id)
    }

    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.cache.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use trmnly_api::BackendFlavor;
    use url::Url;

    use super::*;
    use crate::testing::{FakeBackend, device};

    fn config() -> SyncConfig {
        SyncConfig::new(
            Url::parse("http://localhost:2300").unwrap(),
            AuthCredentials::SelfHosted { token: None },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn start_populates_cache_and_shutdown_stops() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(900))]));
        let ctrl = Controller::with_backend(config(), fake);

        ctrl.start().await.unwrap();
        assert_eq!(ctrl.snapshots().len(), 1);
        assert!(ctrl.cache().last_update_success());

        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_command_restores_rate() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        let ctrl = Controller::with_backend(config(), fake.clone());
        ctrl.start().await.unwrap();

        let result = ctrl
            .execute(Command::RefreshDevice { id: "ABC".into() })
            .await
            .unwrap();
        match result {
            CommandResult::Refresh(outcome) => assert!(outcome.is_restored()),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(fake.rates(), vec![10, 3600]);

        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_refresh_still_restores() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(3600))]));
        let ctrl = Controller::with_backend(config(), fake.clone());
        ctrl.start().await.unwrap();

        let task = {
            let ctrl = ctrl.clone();
            tokio::spawn(async move { ctrl.refresh_device("ABC").await })
        };
        tokio::time::sleep(Duration::from_secs(2)).await;
        ctrl.shutdown().await;

        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.cancelled);
        assert_eq!(fake.rates(), vec![10, 3600]);
    }

    #[tokio::test]
    async fn management_commands_need_the_capability() {
        let mut fake = FakeBackend::new(vec![device(1, "ABC", Some(900))]);
        fake.flavor = BackendFlavor::Hosted;
        let ctrl = Controller::with_backend(config(), Arc::new(fake));

        let err = ctrl
            .execute(Command::DeleteScreen { key: "4".into() })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Unsupported { ref operation, ref flavor }
                if operation == "delete screen" && flavor == "hosted"
        ));

        let err = ctrl
            .execute(Command::UpdateDevice {
                id: "ABC".into(),
                patch: trmnly_api::DevicePatch::refresh_rate(60),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { ref flavor, .. } if flavor == "hosted"));
    }

    #[tokio::test]
    async fn plugin_commands_need_the_capability() {
        let fake = Arc::new(FakeBackend::new(vec![]));
        let ctrl = Controller::with_backend(config(), fake);

        let err = ctrl
            .execute(Command::SwitchPlugin {
                plugin_id: "12".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { ref flavor, .. } if flavor == "self-hosted"));
    }

    #[tokio::test]
    async fn create_device_returns_record() {
        let fake = Arc::new(FakeBackend::new(vec![device(1, "ABC", Some(900))]));
        let ctrl = Controller::with_backend(config(), fake.clone());

        let result = ctrl
            .execute(Command::CreateDevice(trmnly_api::NewDevice {
                label: "Hall".into(),
                mac_address: "AA:BB:CC:00:00:09".into(),
                friendly_id: Some("HALL".into()),
                ..trmnly_api::NewDevice::default()
            }))
            .await
            .unwrap();
        match result {
            CommandResult::Device(d) => assert_eq!(d.id, 2),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(fake.devices.lock().unwrap().len(), 2);
    }
}
