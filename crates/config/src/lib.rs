#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for bridge
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/bridge/config.toml)
//! - Environment variables
//! - `bridge config set` updates, which are written back to the file
//!
//! The running agent reads configuration through a [`ConfigStore`], which
//! notifies subscribers whenever a change is committed.

pub mod sections;
pub mod store;

pub use sections::{AuthorityConfig, GithubConfig, NetworkConfig, PathConfig, TriggerConfig};
pub use store::ConfigStore;

use bridge_errors::{ConfigError, Error};
use bridge_types::{PollInterval, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub authority: AuthorityConfig,

    #[serde(default)]
    pub trigger: TriggerConfig,

    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

/// Keys accepted by [`Config::set_key`]
pub const SETTABLE_KEYS: &[&str] = &[
    "authority.url",
    "authority.secret",
    "authority.interval",
    "trigger.secret",
    "trigger.listen",
    "github.token",
    "github.api_base",
    "github.web_base",
    "paths.install_root",
    "paths.scratch_dir",
    "network.status_timeout",
    "network.download_timeout",
    "network.connect_timeout",
];

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("bridge").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration from an optional path, falling back to defaults
    /// when the default file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => {
                let config_path = Self::default_path()?;
                if config_path.exists() {
                    Self::load_from_file(&config_path).await
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized
    /// or if the file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError {
                    path: parent.display().to_string(),
                    error: e.to_string(),
                })?;
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
                error: e.to_string(),
            })?;

        let content = format!(
            "# bridge configuration file\n\
             # Written by `bridge config set`; manual edits are picked up on SIGHUP.\n\n\
             {toml_string}"
        );

        fs::write(path, content)
            .await
            .map_err(|e| ConfigError::WriteError {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;

        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds a value that cannot
    /// be parsed into the expected type.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_vars(|name| std::env::var(name).ok())
    }

    /// Merge overrides from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unparsable value.
    pub fn merge_vars<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        const OVERRIDES: &[(&str, &str)] = &[
            ("BRIDGE_AUTHORITY_URL", "authority.url"),
            ("BRIDGE_AUTHORITY_SECRET", "authority.secret"),
            ("BRIDGE_POLL_INTERVAL", "authority.interval"),
            ("BRIDGE_TRIGGER_SECRET", "trigger.secret"),
            ("BRIDGE_TRIGGER_LISTEN", "trigger.listen"),
            ("BRIDGE_GITHUB_TOKEN", "github.token"),
            ("BRIDGE_INSTALL_ROOT", "paths.install_root"),
            ("BRIDGE_SCRATCH_DIR", "paths.scratch_dir"),
        ];

        for (var, key) in OVERRIDES {
            if let Some(value) = lookup(var) {
                self.set_key(key, &value).map_err(|err| match err {
                    Error::Config(ConfigError::InvalidValue { value, .. }) => {
                        ConfigError::InvalidValue {
                            field: (*var).to_string(),
                            value,
                        }
                        .into()
                    }
                    other => other,
                })?;
            }
        }
        Ok(())
    }

    /// Set a single dotted key, as used by `bridge config set`
    ///
    /// An empty value clears optional settings.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys or values of the wrong shape.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let trimmed = value.trim();
        match key {
            "authority.url" => self.authority.url = trimmed.to_string(),
            "authority.secret" => self.authority.secret = trimmed.to_string(),
            "authority.interval" => self.authority.interval = trimmed.parse::<PollInterval>()?,
            "trigger.secret" => self.trigger.secret = trimmed.to_string(),
            "trigger.listen" => {
                self.trigger.listen = trimmed.parse().map_err(|_| invalid(key, value))?;
            }
            "github.token" => self.github.token = optional(trimmed).map(str::to_string),
            "github.api_base" => self.github.api_base = trimmed.trim_end_matches('/').to_string(),
            "github.web_base" => self.github.web_base = trimmed.trim_end_matches('/').to_string(),
            "paths.install_root" => self.paths.install_root = optional(trimmed).map(PathBuf::from),
            "paths.scratch_dir" => self.paths.scratch_dir = optional(trimmed).map(PathBuf::from),
            "network.status_timeout" => self.network.status_timeout = seconds(key, value)?,
            "network.download_timeout" => self.network.download_timeout = seconds(key, value)?,
            "network.connect_timeout" => self.network.connect_timeout = seconds(key, value)?,
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                }
                .into())
            }
        }
        Ok(())
    }

    /// Copy of this configuration with every secret masked, for display
    #[must_use]
    pub fn redacted(&self) -> Self {
        fn mask(secret: &mut String) {
            if !secret.is_empty() {
                *secret = "********".to_string();
            }
        }
        let mut shown = self.clone();
        mask(&mut shown.authority.secret);
        mask(&mut shown.trigger.secret);
        if let Some(token) = shown.github.token.as_mut() {
            mask(token);
        }
        shown
    }

    /// Live install slots location
    #[must_use]
    pub fn install_root(&self) -> PathBuf {
        self.paths
            .install_root
            .clone()
            .unwrap_or_else(|| data_dir().join("plugins"))
    }

    /// Scratch location; defaults next to the install root so renames stay on one filesystem
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.paths
            .scratch_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("upgrade"))
    }

    /// Credential for private repository downloads
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.github
            .token
            .as_deref()
            .and_then(optional)
            .map(|t| SecretString::from(t.to_string()))
    }

    #[must_use]
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.network.status_timeout)
    }

    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.network.download_timeout)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.network.connect_timeout)
    }
}

/// Connection details for a configured remote authority
///
/// Only exists when both a URL and a secret are set; an unconfigured agent
/// never polls.
#[derive(Debug, Clone)]
pub struct RemoteAuthority {
    pub url: String,
    pub secret: SecretString,
    pub interval: PollInterval,
}

impl RemoteAuthority {
    #[must_use]
    pub fn from_config(authority: &AuthorityConfig) -> Option<Self> {
        if !authority.is_configured() {
            return None;
        }
        Some(Self {
            url: authority.url.trim().to_string(),
            secret: SecretString::from(authority.secret.trim().to_string()),
            interval: authority.interval,
        })
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("bridge")
}

fn optional(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn invalid(field: &str, value: &str) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn seconds(field: &str, value: &str) -> Result<u64, Error> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(invalid(field, value)),
    }
}
