use thiserror::Error;

/// Top-level error type for the `trmnly-api` crate.
///
/// Covers every failure mode of both backend flavors: transport,
/// authentication, status mapping, typed decoding, and capability gaps.
/// `trmnly-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The server rejected our credentials (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Network-level failure (connection refused, DNS, reset, etc.)
    #[error("Connection error: {0}")]
    Connection(#[source] reqwest::Error),

    /// The request exceeded its total timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header value (token, MAC) could not be encoded.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Status mapping ──────────────────────────────────────────────
    /// HTTP 404 from the server.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Any other non-success status, with the raw body for diagnostics.
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// A 2xx body did not match the expected typed shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Capabilities ────────────────────────────────────────────────
    /// Operation not available on this backend flavor.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    // ── Screenshot service ──────────────────────────────────────────
    /// The external screenshot renderer reported a failure.
    #[error("Screenshot service error: {message}")]
    Screenshot { message: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout { .. })
    }

    /// Returns `true` if the server rejected our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
