//! Status call against the remote authority

use bridge_config::RemoteAuthority;
use bridge_errors::{Error, SyncError};
use bridge_events::EventSender;
use bridge_net::{fetch_text, NetClient};
use bridge_types::{ExposeSecret, RemoteStatus};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Header carrying the shared secret on status requests
pub const CLIENT_SECRET_HEADER: &str = "x-fp-client-secret";

const API_SEGMENT: &str = "/wp-json/";
const STATUS_PATH: &str = "/wp-json/fp-git-updater/v1/master-updates-status";
const STATUS_MARKER: &str = "master-updates-status";

/// Normalize a configured base URL to the canonical status endpoint.
///
/// Trailing slashes are dropped. A URL without an API segment gets the
/// status path appended; a URL with an API segment but another route has
/// everything from the segment on replaced. A URL already pointing at the
/// status route is kept.
#[must_use]
pub fn status_endpoint(base: &str) -> String {
    let endpoint = base.trim().trim_end_matches('/');
    match endpoint.find(API_SEGMENT) {
        None => format!("{endpoint}{STATUS_PATH}"),
        Some(_) if endpoint.contains(STATUS_MARKER) => endpoint.to_string(),
        Some(at) => format!("{}{STATUS_PATH}", &endpoint[..at]),
    }
}

/// Fetches [`RemoteStatus`] documents
#[derive(Clone, Debug)]
pub struct StatusClient {
    client: NetClient,
    timeout: Duration,
}

impl StatusClient {
    #[must_use]
    pub fn new(client: NetClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Ask the authority whether updates are pending.
    ///
    /// One attempt only; the next scheduled run is the retry.
    ///
    /// # Errors
    ///
    /// Returns a network error on transport failure or a non-200 status,
    /// and [`SyncError::InvalidResponse`] if the body is not a status object.
    pub async fn fetch(&self, authority: &RemoteAuthority, tx: &EventSender) -> Result<RemoteStatus, Error> {
        let url = status_endpoint(&authority.url);

        let mut secret = HeaderValue::from_str(authority.secret.expose_secret()).map_err(|_| {
            SyncError::InvalidResponse {
                message: "shared secret is not a valid header value".to_string(),
            }
        })?;
        secret.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(CLIENT_SECRET_HEADER), secret);

        let body = fetch_text(&self.client, &url, headers, self.timeout, tx).await?;
        parse_status(&body)
    }
}

/// Parse a status body; anything but a JSON object is rejected
///
/// # Errors
///
/// Returns [`SyncError::InvalidResponse`] if the body does not have the
/// expected shape.
pub fn parse_status(body: &str) -> Result<RemoteStatus, Error> {
    let invalid = |message: String| -> Error { SyncError::InvalidResponse { message }.into() };

    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;
    if !value.is_object() {
        return Err(invalid("expected a JSON object".to_string()));
    }
    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
}
