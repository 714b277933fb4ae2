//! Startup checks and directory preparation

use crate::error::CliError;
use bridge_config::Config;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where configuration comes from and which directories the agent uses
pub struct SystemSetup {
    config_path: PathBuf,
    install_root: PathBuf,
    scratch_dir: PathBuf,
}

impl SystemSetup {
    pub fn new(config_path: PathBuf, config: &Config) -> Self {
        Self {
            config_path,
            install_root: config.install_root(),
            scratch_dir: config.scratch_dir(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Create the install root and scratch directory
    pub async fn initialize(&self) -> Result<(), CliError> {
        for dir in [&self.install_root, &self.scratch_dir] {
            if !dir.exists() {
                info!(path = %dir.display(), "Creating directory");
            }
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| CliError::Setup(format!("cannot create {}: {e}", dir.display())))?;
        }
        self.check_same_volume();
        debug!(
            install_root = %self.install_root.display(),
            scratch_dir = %self.scratch_dir.display(),
            "Directories ready"
        );
        Ok(())
    }

    /// Renames between volumes fail and fall back to copying
    #[cfg(unix)]
    fn check_same_volume(&self) {
        use std::os::unix::fs::MetadataExt;

        let device = |path: &Path| std::fs::metadata(path).map(|m| m.dev()).ok();
        if let (Some(a), Some(b)) = (device(&self.install_root), device(&self.scratch_dir)) {
            if a != b {
                warn!(
                    install_root = %self.install_root.display(),
                    scratch_dir = %self.scratch_dir.display(),
                    "Install root and scratch directory are on different volumes; installs will copy instead of rename"
                );
            }
        }
    }

    #[cfg(not(unix))]
    fn check_same_volume(&self) {}
}

/// Config file location; an explicit path wins over the default
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

/// Load configuration for a command.
///
/// A missing file yields defaults, so `config set` can create it. Environment
/// overrides are applied when `use_env` is set.
pub async fn load_config(path: &Path, use_env: bool) -> Result<Config, CliError> {
    let mut config = if path.exists() {
        Config::load_from_file(path).await?
    } else {
        debug!(path = %path.display(), "No config file; using defaults");
        Config::default()
    };
    if use_env {
        config.merge_env()?;
    }
    Ok(config)
}
