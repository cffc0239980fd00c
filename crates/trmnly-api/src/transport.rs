// Shared HTTP transport for both backend flavors.
//
// Owns the long-lived `reqwest::Client` (connection pool), applies a total
// timeout to every call, and maps HTTP status codes onto the crate error
// taxonomy. The pool is released when the last clone of the client drops.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!("trmnly/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Total request timeout (connect + send + receive).
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` with the given default headers.
    pub fn build_client(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}

/// A decoded response body plus its status.
///
/// 204 and non-JSON 2xx bodies never fail: they yield a synthetic
/// `{"status": "ok"}` marker, because some successful server operations
/// answer with plain text or nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    fn ok_marker(status: u16) -> Self {
        Self {
            status,
            body: json!({ "status": "ok" }),
        }
    }

    fn text_marker(status: u16) -> Self {
        Self {
            status,
            body: json!({ "status": "ok", "content_type": "text" }),
        }
    }

    /// `true` when the body is a synthetic success marker rather than
    /// server-provided JSON.
    pub fn is_marker(&self) -> bool {
        self.body.get("status").and_then(Value::as_str) == Some("ok")
            && self
                .body
                .as_object()
                .is_some_and(|o| o.keys().all(|k| k == "status" || k == "content_type"))
    }

    /// The `data` member of a `{ "data": ... }` envelope, if present.
    pub fn data(&self) -> Option<&Value> {
        self.body.get("data")
    }

    /// Decode the envelope's `data` member (or the bare body when there is
    /// no envelope) into a typed value.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, Error> {
        let value = match self.body {
            Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        decode(value)
    }

    /// Decode the whole body into a typed value.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, Error> {
        decode(self.body)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value.clone()).map_err(|e| {
        let body = value.to_string();
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Low-level request executor shared by both backend clients.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl Transport {
    /// Build a transport with its own client and default headers.
    pub fn new(base_url: Url, config: &TransportConfig, headers: HeaderMap) -> Result<Self, Error> {
        let http = config.build_client(headers)?;
        Ok(Self {
            http,
            base_url,
            timeout: config.timeout,
        })
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build a full URL for a server path such as `/api/devices`.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub async fn get(&self, path: &str) -> Result<RawResponse, Error> {
        self.execute(Method::GET, path, HeaderMap::new(), None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<RawResponse, Error> {
        self.execute(Method::POST, path, HeaderMap::new(), Some(body))
            .await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<RawResponse, Error> {
        self.execute(Method::PATCH, path, HeaderMap::new(), Some(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<RawResponse, Error> {
        self.execute(Method::DELETE, path, HeaderMap::new(), None)
            .await
    }

    /// Execute one request with per-call headers and an optional JSON body.
    ///
    /// Every call is bounded by the configured total timeout; exceeding it
    /// yields [`Error::Timeout`].
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<RawResponse, Error> {
        let url = self.url(path)?;
        debug!("{method} {url}");

        let mut builder = self
            .http
            .request(method, url.clone())
            .timeout(self.timeout)
            .headers(headers);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| self.map_send_error(e))?;
        self.handle_response(url, resp).await
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Connection(err)
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response(&self, url: Url, resp: reqwest::Response) -> Result<RawResponse, Error> {
        let status = resp.status();
        let code = status.as_u16();

        if status == StatusCode::NO_CONTENT {
            return Ok(RawResponse::ok_marker(code));
        }

        if status.is_success() {
            let text = resp.text().await.map_err(|e| self.map_send_error(e))?;
            if text.trim().is_empty() {
                return Ok(RawResponse::ok_marker(code));
            }
            return Ok(match serde_json::from_str::<Value>(&text) {
                Ok(body) => RawResponse { status: code, body },
                Err(_) => {
                    trace!(%url, "non-JSON success body, returning marker");
                    RawResponse::text_marker(code)
                }
            });
        }

        let body = resp.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => Error::Authentication {
                message: if body.is_empty() {
                    format!("HTTP 401 from {}", url.path())
                } else {
                    body
                },
            },
            StatusCode::NOT_FOUND => Error::NotFound {
                path: url.path().to_owned(),
            },
            _ => Error::Api { status: code, body },
        })
    }
}
