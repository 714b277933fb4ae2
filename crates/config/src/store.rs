//! Shared, observable configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_errors::Error;
use tokio::sync::watch;

use crate::Config;

/// Configuration holder shared by every long-lived component
///
/// Readers take snapshots; writers go through [`ConfigStore::update`] or
/// [`ConfigStore::replace`]. Subscribers are woken only when the committed
/// value actually differs from the previous one.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    tx: Arc<watch::Sender<Config>>,
    path: Option<PathBuf>,
}

impl ConfigStore {
    /// Create a store; changes are persisted to `path` when one is given
    #[must_use]
    pub fn new(config: Config, path: Option<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(config);
        Self {
            tx: Arc::new(tx),
            path,
        }
    }

    /// In-memory store that never touches disk
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, None)
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current configuration
    #[must_use]
    pub fn snapshot(&self) -> Config {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every committed change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Config> {
        self.tx.subscribe()
    }

    /// Apply `change`, persist the result, then notify subscribers.
    ///
    /// Returns whether anything changed. An unchanged result is neither
    /// written nor broadcast.
    ///
    /// # Errors
    ///
    /// Returns an error if the new configuration cannot be written; in that
    /// case the in-memory value is left untouched.
    pub async fn update<F>(&self, change: F) -> Result<bool, Error>
    where
        F: FnOnce(&mut Config) -> Result<(), Error>,
    {
        let mut next = self.snapshot();
        change(&mut next)?;
        if next == *self.tx.borrow() {
            return Ok(false);
        }
        if let Some(path) = &self.path {
            next.save_to(path).await?;
        }
        Ok(self.replace(next))
    }

    /// Swap in a configuration loaded elsewhere, e.g. on reload.
    ///
    /// Returns whether subscribers were notified.
    pub fn replace(&self, next: Config) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }
}
