//! Optional full-featured updater that supersedes the built-in pipeline

use async_trait::async_trait;
use bridge_errors::Error;
use serde::{Deserialize, Serialize};

/// One update the external updater knows about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub id: String,
    pub name: String,
    pub current_version: String,
    pub available_version: String,
}

/// Capability injected at startup when a richer updater is available
///
/// When present, sync runs and trigger requests delegate to it instead of
/// running per-package install transactions.
#[async_trait]
pub trait ExternalUpdater: Send + Sync {
    /// Updates currently known to be pending
    async fn pending_updates(&self) -> Result<Vec<PendingUpdate>, Error>;

    /// Refresh the pending list from upstream
    async fn check_for_updates(&self) -> Result<(), Error>;

    /// Apply pending updates; `false` means some could not be applied
    async fn run_update(&self) -> Result<bool, Error>;
}
