//! Streaming file download

use bridge_errors::{Error, NetworkError};
use futures::StreamExt;
use reqwest::header::HeaderMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::client::{ensure_success, transport_error};
use crate::NetClient;

/// Download operation handle
pub struct Download {
    url: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

/// Result of a download operation
#[derive(Debug)]
pub struct DownloadResult {
    pub url: String,
    pub size: u64,
    pub elapsed: Duration,
}

impl Download {
    /// Create a new download
    ///
    /// # Errors
    ///
    /// Returns an error if the provided URL is invalid or cannot be parsed.
    pub fn new(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            url,
            headers: HeaderMap::new(),
            timeout: None,
        })
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Stream the response body into `dest`.
    ///
    /// Data lands in a `.part` sibling first and is renamed into place only
    /// after the whole body was written. On any failure nothing is left at
    /// either path.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server returns an error
    /// status, the body is empty, or the file cannot be written.
    pub async fn execute(self, client: &NetClient, dest: &Path) -> Result<DownloadResult, Error> {
        let started = Instant::now();
        let url_str = self.url.to_string();

        let response = client
            .get_with(url_str.as_str(), self.headers, self.timeout)
            .await?;
        let response = ensure_success(response)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }

        let temp_path = dest.with_extension("part");
        let written = match stream_to_file(response, &temp_path, &url_str).await {
            Ok(size) => size,
            Err(err) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(err);
            }
        };

        if written == 0 {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(NetworkError::EmptyDownload { url: url_str }.into());
        }

        if let Err(e) = tokio::fs::rename(&temp_path, dest).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::io_with_path(&e, dest));
        }

        Ok(DownloadResult {
            url: url_str,
            size: written,
            elapsed: started.elapsed(),
        })
    }
}

async fn stream_to_file(response: reqwest::Response, path: &Path, url: &str) -> Result<u64, Error> {
    let mut file = File::create(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;

    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| transport_error(&e, url))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(downloaded)
}
