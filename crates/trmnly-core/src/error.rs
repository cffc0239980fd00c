// ── Core error types ──
//
// User-facing errors from trmnly-core. Consumers never see raw HTTP
// plumbing; the `From<trmnly_api::Error>` impl translates transport-layer
// errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Operation not supported: {operation} (backend: {flavor})")]
    Unsupported { operation: String, flavor: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    /// A forced refresh failed after its temporary rate may have landed,
    /// and restoring the original rate failed too.
    #[error(
        "Refresh of device {device} failed ({reason}); restoring its refresh rate also failed, \
         it may still be at {temporary_rate}s: {restore_error}"
    )]
    RefreshUnrestored {
        device: String,
        temporary_rate: u32,
        reason: String,
        restore_error: String,
    },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn device_not_found(id: &str) -> Self {
        Self::NotFound {
            entity_type: "Device".into(),
            identifier: id.into(),
        }
    }

    /// Name the backend flavor on capability errors raised below the
    /// point where the flavor is known.
    pub(crate) fn with_flavor(self, flavor: trmnly_api::BackendFlavor) -> Self {
        match self {
            Self::Unsupported { operation, .. } => Self::Unsupported {
                operation,
                flavor: flavor.to_string(),
            },
            other => other,
        }
    }

    /// Returns `true` for network-level failures worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<trmnly_api::Error> for CoreError {
    fn from(err: trmnly_api::Error) -> Self {
        match err {
            trmnly_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            trmnly_api::Error::Connection(e) => CoreError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                reason: e.to_string(),
            },
            trmnly_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            trmnly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            trmnly_api::Error::InvalidHeader(message) => CoreError::Config {
                message: format!("Invalid header value: {message}"),
            },
            trmnly_api::Error::ClientBuild(message) => CoreError::Internal(message),
            trmnly_api::Error::NotFound { path } => CoreError::NotFound {
                entity_type: "Resource".into(),
                identifier: path,
            },
            trmnly_api::Error::Api { status, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
                status: Some(status),
            },
            trmnly_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            trmnly_api::Error::Unsupported(operation) => CoreError::Unsupported {
                operation: operation.into(),
                flavor: "unknown".into(),
            },
            trmnly_api::Error::Screenshot { message } => CoreError::Api {
                message: format!("Screenshot service: {message}"),
                status: None,
            },
        }
    }
}
