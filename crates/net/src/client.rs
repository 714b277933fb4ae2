//! HTTP client with connection pooling

use bridge_config::Config;
use bridge_errors::{Error, NetworkError};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Default per-request timeout; callers may override it per request
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes for large downloads
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("bridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl NetConfig {
    /// Derive client settings from the agent configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.download_timeout(),
            connect_timeout: config.connect_timeout(),
            ..Self::default()
        }
    }
}

/// HTTP client wrapper
///
/// Requests are attempted once. A failed poll or install is retried by the
/// next scheduled run, not by the client.
#[derive(Clone, Debug)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Execute a GET request
    ///
    /// # Errors
    ///
    /// Returns an error on timeout or connection failure. HTTP error statuses
    /// are returned as responses; callers decide how to treat them.
    pub async fn get(&self, url: &str) -> Result<Response, Error> {
        self.get_with(url, HeaderMap::new(), None).await
    }

    /// Execute a GET request with extra headers and an optional timeout override
    ///
    /// # Errors
    ///
    /// Returns an error on timeout or connection failure.
    pub async fn get_with(
        &self,
        url: &str,
        headers: HeaderMap,
        timeout: Option<Duration>,
    ) -> Result<Response, Error> {
        let mut request = self.client.get(url).headers(headers);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        request.send().await.map_err(|e| transport_error(&e, url))
    }

    /// Get the underlying reqwest client for advanced usage
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Map a reqwest failure onto the network error taxonomy
pub(crate) fn transport_error(error: &reqwest::Error, url: &str) -> Error {
    if error.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
        .into()
    } else if error.is_connect() {
        NetworkError::ConnectionRefused(error.to_string()).into()
    } else if error.is_builder() {
        NetworkError::InvalidUrl(url.to_string()).into()
    } else {
        NetworkError::DownloadFailed(error.to_string()).into()
    }
}

/// Reject every status but 200 OK
pub(crate) fn ensure_success(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status == StatusCode::OK {
        Ok(response)
    } else {
        Err(NetworkError::HttpError {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }
        .into())
    }
}
