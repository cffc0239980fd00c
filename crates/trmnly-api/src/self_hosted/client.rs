// Self-hosted HTTP client
//
// Wraps the shared `Transport` with envelope unwrapping and the numeric-id
// resolution every write endpoint needs. Endpoint groups (devices,
// screens, models) live in sibling files as inherent methods; this file
// holds construction, the liveness probe, and the capability trait impls.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{BackendFlavor, Credentials};
use crate::backend::{ManagementApi, TrmnlBackend};
use crate::error::Error;
use crate::models::{
    Device, DevicePatch, DisplayContent, Model, ModelPatch, NewDevice, NewModel, NewScreen, Screen,
    ScreenPatch,
};
use crate::transport::{RawResponse, Transport, TransportConfig};

/// Default port of a self-hosted server.
pub const DEFAULT_PORT: u16 = 2300;

/// Timeout for the raw TCP fallback probe.
const TCP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a self-hosted server.
#[derive(Debug, Clone)]
pub struct SelfHostedClient {
    pub(crate) transport: Transport,
}

impl SelfHostedClient {
    /// Build a client with an optional bearer token.
    pub fn new(
        base_url: Url,
        token: Option<secrecy::SecretString>,
        config: &TransportConfig,
    ) -> Result<Self, Error> {
        let headers = Credentials::Bearer { token }.headers()?;
        let transport = Transport::new(base_url, config, headers)?;
        Ok(Self { transport })
    }

    /// Wrap an existing transport (caller manages auth headers).
    pub fn with_transport(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    // ── Liveness ─────────────────────────────────────────────────────

    /// Connect-and-close TCP probe against the server's host and port.
    ///
    /// Says nothing about HTTP semantics, only that something is listening.
    pub async fn tcp_probe(&self) -> bool {
        let url = self.transport.base_url();
        let Some(host) = url.host_str() else {
            return false;
        };
        let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);

        match tokio::time::timeout(TCP_PROBE_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => {
                drop(stream);
                info!(host, port, "TCP connection successful");
                true
            }
            Ok(Err(e)) => {
                warn!(host, port, error = %e, "TCP connection failed");
                false
            }
            Err(_) => {
                warn!(host, port, "TCP connection timed out");
                false
            }
        }
    }
}

/// Decode a `{ "data": [...] }` listing, tolerating a missing or malformed
/// envelope (empty list) and skipping entries that do not decode.
pub(crate) fn lenient_list<T: DeserializeOwned>(raw: &RawResponse, what: &str) -> Vec<T> {
    let Some(Value::Array(items)) = raw.data() else {
        warn!(what, "response carries no data array, treating as empty");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(what, error = %e, "skipping malformed entry");
                None
            }
        })
        .collect()
}

// ── Capability impls ─────────────────────────────────────────────────

#[async_trait]
impl TrmnlBackend for SelfHostedClient {
    fn flavor(&self) -> BackendFlavor {
        BackendFlavor::SelfHosted
    }

    async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        self.fetch_devices().await
    }

    async fn update_device(&self, id: &str, patch: &DevicePatch) -> Result<(), Error> {
        self.patch_device(id, patch).await
    }

    async fn display_content(&self, id: &str) -> Result<DisplayContent, Error> {
        self.fetch_display(id).await
    }

    async fn test_connection(&self) -> bool {
        debug!(url = %self.transport.base_url(), "testing connection");
        match self.transport.get("/").await {
            Ok(_) => {
                info!("HTTP connection successful");
                true
            }
            Err(e) if e.is_auth() => {
                warn!(error = %e, "server rejected credentials");
                false
            }
            Err(e) => {
                debug!(error = %e, "HTTP probe failed, trying TCP");
                self.tcp_probe().await
            }
        }
    }

    fn management(&self) -> Option<&dyn ManagementApi> {
        Some(self)
    }
}

#[async_trait]
impl ManagementApi for SelfHostedClient {
    async fn create_device(&self, device: &NewDevice) -> Result<Device, Error> {
        self.post_device(device).await
    }

    async fn delete_device(&self, id: &str) -> Result<(), Error> {
        self.remove_device(id).await
    }

    async fn list_screens(&self) -> Result<Vec<Screen>, Error> {
        self.fetch_screens().await
    }

    async fn create_screen(&self, screen: &NewScreen) -> Result<Screen, Error> {
        self.post_screen(screen).await
    }

    async fn update_screen(&self, key: &str, patch: &ScreenPatch) -> Result<(), Error> {
        self.patch_screen(key, patch).await
    }

    async fn delete_screen(&self, key: &str) -> Result<(), Error> {
        self.remove_screen(key).await
    }

    async fn list_models(&self) -> Result<Vec<Model>, Error> {
        self.fetch_models().await
    }

    async fn create_model(&self, model: &NewModel) -> Result<Model, Error> {
        self.post_model(model).await
    }

    async fn update_model(&self, key: &str, patch: &ModelPatch) -> Result<(), Error> {
        self.patch_model(key, patch).await
    }

    async fn delete_model(&self, key: &str) -> Result<(), Error> {
        self.remove_model(key).await
    }
}
