//! HTTP client for the remote access authority.
//!
//! One GET per check:
//!
//! ```text
//! GET {base_url}/{device_id}/{card_id}
//!
//! 200 {"response": 1}   -> Authorized
//! 200 {"response": 0}   -> NotAuthorized (any value other than 1)
//! anything else         -> Unreachable
//! ```
//!
//! Every request carries the configured timeout. The client never retries;
//! the next card presentation is the retry.

use crate::client::{AccessCheck, AuthorityClient};
use latchkey_core::{
    CardId, DeviceConfig, DeviceIdentity,
    constants::{AUTHORIZED_RESPONSE, DEFAULT_AUTHORITY_URL, DEFAULT_REQUEST_TIMEOUT_SECS},
};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration for the authority client
///
/// # Example
///
/// ```
/// use latchkey_network::AuthorityConfig;
/// use std::time::Duration;
///
/// let config = AuthorityConfig {
///     base_url: "https://lab.cafe/otello/admin/api/check_access".to_string(),
///     timeout: Duration::from_secs(5),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Base URL; device and card are appended as path segments
    pub base_url: String,

    /// Timeout for the whole request, connect included
    pub timeout: Duration,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AUTHORITY_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl From<&DeviceConfig> for AuthorityConfig {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            base_url: config.authority_url.clone(),
            timeout: config.request_timeout(),
        }
    }
}

/// Errors behind an `Unreachable` answer
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The base URL cannot carry path segments
    #[error("Invalid authority URL '{0}'")]
    InvalidUrl(String),

    /// Request did not complete within the timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Connection or protocol failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The authority answered with a status other than 200
    #[error("Unexpected status {0}")]
    Status(StatusCode),

    /// The 200 body is not `{"response": <int>}`
    #[error("Malformed response body: {0}")]
    Body(String),
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    response: i64,
}

/// Remote authority client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthorityClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpAuthorityClient {
    /// Create a client for the given configuration.
    ///
    /// # Errors
    /// Returns `AuthorityError::InvalidUrl` if the base URL does not parse
    /// or cannot have path segments appended, and `AuthorityError::Http` if
    /// the TLS backend cannot be initialised.
    pub fn new(config: AuthorityConfig) -> Result<Self, AuthorityError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| AuthorityError::InvalidUrl(config.base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(AuthorityError::InvalidUrl(config.base_url));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
        })
    }

    /// URL of the check for one device and card
    pub fn check_url(&self, device: &DeviceIdentity, card: &CardId) -> Result<Url, AuthorityError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthorityError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(device.as_str())
            .push(card.as_str());
        Ok(url)
    }

    /// Perform the request and decode the answer.
    ///
    /// Returns the raw `response` value of a 200 answer.
    pub async fn request(
        &self,
        device: &DeviceIdentity,
        card: &CardId,
    ) -> Result<i64, AuthorityError> {
        let url = self.check_url(device, card)?;
        debug!(%url, "Checking card with remote authority");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AuthorityError::Status(status));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let parsed: AccessResponse =
            serde_json::from_slice(&body).map_err(|e| AuthorityError::Body(e.to_string()))?;

        Ok(parsed.response)
    }

    fn classify(&self, err: reqwest::Error) -> AuthorityError {
        if err.is_timeout() {
            AuthorityError::Timeout(self.timeout.as_millis() as u64)
        } else {
            AuthorityError::Http(err)
        }
    }
}

impl AuthorityClient for HttpAuthorityClient {
    async fn check_access(&self, device: &DeviceIdentity, card: &CardId) -> AccessCheck {
        match self.request(device, card).await {
            Ok(AUTHORIZED_RESPONSE) => {
                debug!(card_id = %card, "Authority granted card");
                AccessCheck::Authorized
            }
            Ok(value) => {
                debug!(card_id = %card, response = value, "Authority refused card");
                AccessCheck::NotAuthorized
            }
            Err(e) => {
                warn!(card_id = %card, error = %e, "Remote authority unreachable");
                AccessCheck::Unreachable
            }
        }
    }
}
