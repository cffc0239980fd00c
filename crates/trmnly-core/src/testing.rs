// In-memory backend for unit tests.
//
// Records every write with its (virtual) timestamp and lets tests inject
// failures per refresh-rate value or per patch field.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use trmnly_api::{
    BackendFlavor, Device, DevicePatch, DisplayContent, Error, ManagementApi, Model, ModelPatch,
    NewDevice, NewModel, NewScreen, Screen, ScreenPatch, TrmnlBackend, resolve_device,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RateWrite {
    pub device: u64,
    pub rate: u32,
    pub at: Instant,
}

pub(crate) struct FakeBackend {
    pub flavor: BackendFlavor,
    pub devices: Mutex<Vec<Device>>,
    pub rate_writes: Mutex<Vec<RateWrite>>,
    pub patches: Mutex<Vec<(u64, DevicePatch)>>,
    pub screens: Mutex<Vec<Screen>>,
    pub screen_bodies: Mutex<Vec<NewScreen>>,
    pub display_fetches: AtomicU32,
    /// Remaining failures keyed by the refresh-rate value being written.
    pub rate_failures: Mutex<HashMap<u32, u32>>,
    /// Patch fields the server rejects.
    pub rejected_fields: Mutex<HashSet<String>>,
    pub reject_plain_screens: bool,
    pub list_failures: AtomicU32,
    pub list_calls: AtomicU32,
    pub list_delay: Mutex<Duration>,
    pub calls_transient: bool,
}

pub(crate) fn device(id: u64, friendly: &str, refresh_rate: Option<u32>) -> Device {
    let mut value = json!({
        "id": id,
        "friendly_id": friendly,
        "label": format!("Device {friendly}"),
        "mac_address": format!("AA:BB:CC:00:00:{id:02X}"),
        "battery_voltage": 3.9,
        "rssi": -60,
        "status": "online"
    });
    if let Some(rate) = refresh_rate {
        value["refresh_rate"] = json!(rate);
    }
    serde_json::from_value(value).unwrap_or_else(|e| panic!("bad fixture: {e}"))
}

impl FakeBackend {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            flavor: BackendFlavor::SelfHosted,
            devices: Mutex::new(devices),
            rate_writes: Mutex::new(Vec::new()),
            patches: Mutex::new(Vec::new()),
            screens: Mutex::new(Vec::new()),
            screen_bodies: Mutex::new(Vec::new()),
            display_fetches: AtomicU32::new(0),
            rate_failures: Mutex::new(HashMap::new()),
            rejected_fields: Mutex::new(HashSet::new()),
            reject_plain_screens: false,
            list_failures: AtomicU32::new(0),
            list_calls: AtomicU32::new(0),
            list_delay: Mutex::new(Duration::ZERO),
            calls_transient: false,
        }
    }

    pub fn fail_rate(&self, rate: u32, times: u32) {
        self.rate_failures.lock().unwrap_or_else(|e| e.into_inner()).insert(rate, times);
    }

    pub fn reject_field(&self, field: &str) {
        self.rejected_fields
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(field.to_owned());
    }

    pub fn fail_lists(&self, times: u32) {
        self.list_failures.store(times, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    pub fn rates(&self) -> Vec<u32> {
        self.rate_writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|w| w.rate)
            .collect()
    }

    pub fn writes(&self) -> Vec<RateWrite> {
        self.rate_writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn current_rate(&self, id: u64) -> Option<u32> {
        self.devices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|d| d.id == id)
            .and_then(|d| d.refresh_rate)
    }

    fn failure(&self, status: u16) -> Error {
        if self.calls_transient {
            Error::Timeout { timeout_secs: 10 }
        } else {
            Error::Api {
                status,
                body: "injected".into(),
            }
        }
    }

    fn take_rate_failure(&self, rate: u32) -> bool {
        let mut failures = self.rate_failures.lock().unwrap_or_else(|e| e.into_inner());
        match failures.get_mut(&rate) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl TrmnlBackend for FakeBackend {
    fn flavor(&self) -> BackendFlavor {
        self.flavor
    }

    async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.list_delay.lock().unwrap_or_else(|e| e.into_inner());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.list_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.list_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self.devices.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn update_device(&self, id: &str, patch: &DevicePatch) -> Result<(), Error> {
        if self.flavor == BackendFlavor::Hosted {
            return Err(Error::Unsupported("device updates"));
        }
        let numeric = {
            let devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
            resolve_device(&devices, id)
                .map(|d| d.id)
                .ok_or_else(|| Error::NotFound {
                    path: format!("/api/devices/{id}"),
                })?
        };

        if let Some(rate) = patch.refresh_rate {
            if self.take_rate_failure(rate) {
                return Err(self.failure(500));
            }
            self.rate_writes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(RateWrite {
                    device: numeric,
                    rate,
                    at: Instant::now(),
                });
            let mut devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(d) = devices.iter_mut().find(|d| d.id == numeric) {
                d.refresh_rate = Some(rate);
            }
        }

        let rejected = self.rejected_fields.lock().unwrap_or_else(|e| e.into_inner());
        if patch.extra.keys().any(|k| rejected.contains(k)) {
            return Err(self.failure(422));
        }
        drop(rejected);

        self.patches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((numeric, patch.clone()));
        Ok(())
    }

    async fn display_content(&self, _id: &str) -> Result<DisplayContent, Error> {
        self.display_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(DisplayContent::default())
    }

    async fn test_connection(&self) -> bool {
        true
    }

    fn management(&self) -> Option<&dyn ManagementApi> {
        match self.flavor {
            BackendFlavor::SelfHosted => Some(self),
            BackendFlavor::Hosted => None,
        }
    }
}

#[async_trait]
impl ManagementApi for FakeBackend {
    async fn create_device(&self, device: &NewDevice) -> Result<Device, Error> {
        let mut devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
        let id = devices.iter().map(|d| d.id).max().unwrap_or(0) + 1;
        let created = self::device(id, device.friendly_id.as_deref().unwrap_or("NEW"), device.refresh_rate);
        devices.push(created.clone());
        Ok(created)
    }

    async fn delete_device(&self, id: &str) -> Result<(), Error> {
        let mut devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
        let before = devices.len();
        devices.retain(|d| !d.matches(id));
        if devices.len() == before {
            return Err(Error::NotFound {
                path: format!("/api/devices/{id}"),
            });
        }
        Ok(())
    }

    async fn list_screens(&self) -> Result<Vec<Screen>, Error> {
        Ok(self.screens.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn create_screen(&self, screen: &NewScreen) -> Result<Screen, Error> {
        self.screen_bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(screen.clone());
        if self.reject_plain_screens && screen.model_id.is_none() {
            return Err(Error::Api {
                status: 422,
                body: "model required".into(),
            });
        }
        let mut screens = self.screens.lock().unwrap_or_else(|e| e.into_inner());
        let created: Screen = serde_json::from_value(json!({
            "id": 100 + screens.len(),
            "name": screen.name,
            "label": screen.label,
            "model_id": screen.model_id,
        }))
        .map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        screens.push(created.clone());
        Ok(created)
    }

    async fn update_screen(&self, _key: &str, _patch: &ScreenPatch) -> Result<(), Error> {
        Ok(())
    }

    async fn delete_screen(&self, key: &str) -> Result<(), Error> {
        self.screens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|s| !s.matches(key));
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<Model>, Error> {
        Ok(Vec::new())
    }

    async fn create_model(&self, _model: &NewModel) -> Result<Model, Error> {
        Err(Error::Unsupported("models"))
    }

    async fn update_model(&self, _key: &str, _patch: &ModelPatch) -> Result<(), Error> {
        Err(Error::Unsupported("models"))
    }

    async fn delete_model(&self, _key: &str) -> Result<(), Error> {
        Err(Error::Unsupported("models"))
    }
}

// ── Log capture ─────────────────────────────────────────────────────

/// One recorded tracing event.
#[derive(Debug, Clone)]
pub(crate) struct CapturedEvent {
    pub target: String,
    pub level: Level,
    pub unrestored: bool,
}

type Captured = Arc<Mutex<Vec<CapturedEvent>>>;

struct CaptureLayer(Captured);

struct UnrestoredField(bool);

impl Visit for UnrestoredField {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "unrestored" {
            self.0 = value;
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut field = UnrestoredField(false);
        event.record(&mut field);
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CapturedEvent {
                target: event.metadata().target().to_owned(),
                level: *event.metadata().level(),
                unrestored: field.0,
            });
    }
}

/// Record every event on this thread until the guard drops.
pub(crate) fn capture_events() -> (Captured, DefaultGuard) {
    let events = Captured::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(Arc::clone(&events)));
    (events, tracing::subscriber::set_default(subscriber))
}
