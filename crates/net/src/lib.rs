#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for bridge
//!
//! This crate handles all outbound HTTP: fetching package archives from a
//! direct URL or a repository host, and small text requests such as the
//! remote authority's status call.

mod client;
mod download;
mod fetcher;
mod source;

pub use client::{NetClient, NetConfig};
pub use download::{Download, DownloadResult};
pub use fetcher::PackageFetcher;
pub use source::{DownloadSource, SourceEndpoints, API_ACCEPT};

use bridge_errors::{Error, NetworkError};
use bridge_events::{EventEmitter, EventSender};
use reqwest::header::HeaderMap;
use std::time::Duration;

/// Fetch text content from a URL
///
/// # Errors
///
/// Returns an error if the HTTP request fails, the server returns an error status,
/// or the response body cannot be decoded as text.
pub async fn fetch_text(
    client: &NetClient,
    url: &str,
    headers: HeaderMap,
    timeout: Duration,
    tx: &EventSender,
) -> Result<String, Error> {
    tx.emit_debug(format!("Fetching text from {url}"));

    let response = client.get_with(url, headers, Some(timeout)).await?;
    let response = client::ensure_success(response)?;

    response
        .text()
        .await
        .map_err(|e| NetworkError::DownloadFailed(e.to_string()).into())
}
