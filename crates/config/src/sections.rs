//! Configuration sections and their defaults

use bridge_types::PollInterval;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Where the agent learns what to install
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Base URL of the remote authority; normalized to the status endpoint at call time
    #[serde(default)]
    pub url: String,
    /// Shared secret sent with every status request
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub interval: PollInterval,
}

impl AuthorityConfig {
    /// Both a URL and a secret are present
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.secret.trim().is_empty()
    }
}

impl fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("url", &self.url)
            .field("secret", &redact(&self.secret))
            .field("interval", &self.interval)
            .finish()
    }
}

/// Inbound trigger endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Secret callers must present; empty denies every request
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            listen: default_listen(),
        }
    }
}

impl fmt::Debug for TriggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerConfig")
            .field("secret", &redact(&self.secret))
            .field("listen", &self.listen)
            .finish()
    }
}

/// Repository host settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Access token for private repositories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_web_base")]
    pub web_base: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_api_base(),
            web_base: default_web_base(),
        }
    }
}

impl fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubConfig")
            .field("token", &self.token.as_deref().map(redact))
            .field("api_base", &self.api_base)
            .field("web_base", &self.web_base)
            .finish()
    }
}

/// Path configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathConfig {
    /// Directory holding one slot per installed package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_root: Option<PathBuf>,
    /// Scratch area for downloads, extraction and backups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

/// Network configuration, all values in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_status_timeout")]
    pub status_timeout: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            status_timeout: default_status_timeout(),
            download_timeout: default_download_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "[REDACTED]"
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_web_base() -> String {
    "https://github.com".to_string()
}

fn default_status_timeout() -> u64 {
    30
}

fn default_download_timeout() -> u64 {
    300 // 5 minutes
}

fn default_connect_timeout() -> u64 {
    30
}
