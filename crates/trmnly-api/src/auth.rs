use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Header carrying the device (or account) access token on the hosted API.
pub const ACCESS_TOKEN_HEADER: &str = "Access-Token";

/// Header identifying the device by MAC address on `/api/display`.
pub const DEVICE_ID_HEADER: &str = "ID";

/// Which vendor API shape a server speaks.
///
/// Selected once at configuration time; callers never branch on it.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BackendFlavor {
    /// Self-hosted server with full device/screen/model management.
    #[default]
    SelfHosted,
    /// Hosted SaaS exposing display content plus plugin actions.
    Hosted,
}

/// Credentials for authenticating with a display server.
///
/// Each variant carries the secret material needed for its header shape.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Optional `Authorization: Bearer` token (self-hosted servers often
    /// run without auth on a trusted LAN).
    Bearer { token: Option<SecretString> },

    /// Distinct access-token header plus a device-identity header.
    AccessToken {
        token: SecretString,
        device_mac: String,
    },
}

impl Credentials {
    /// The backend flavor this credential shape belongs to.
    pub fn flavor(&self) -> BackendFlavor {
        match self {
            Self::Bearer { .. } => BackendFlavor::SelfHosted,
            Self::AccessToken { .. } => BackendFlavor::Hosted,
        }
    }

    /// Build the default headers injected on every request.
    ///
    /// Secret values are marked sensitive so they never show up in debug
    /// output of the underlying client.
    pub fn headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        match self {
            Self::Bearer { token: None } => {}
            Self::Bearer { token: Some(token) } => {
                let value = sensitive_value(&format!("Bearer {}", token.expose_secret()))?;
                headers.insert(AUTHORIZATION, value);
            }
            Self::AccessToken { token, device_mac } => {
                headers.insert(
                    HeaderName::from_static("access-token"),
                    sensitive_value(token.expose_secret())?,
                );
                headers.insert(HeaderName::from_static("id"), header_value(device_mac)?);
            }
        }
        Ok(headers)
    }
}

pub(crate) fn header_value(raw: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(raw).map_err(|e| Error::InvalidHeader(e.to_string()))
}

pub(crate) fn sensitive_value(raw: &str) -> Result<HeaderValue, Error> {
    let mut value = header_value(raw)?;
    value.set_sensitive(true);
    Ok(value)
}
