//! Reports returned by sync runs and trigger requests

use bridge_types::RemotePackage;
use serde::ser::Serializer;
use serde::Serialize;

use crate::updater::PendingUpdate;

/// Per-package outcome tags in the order packages were processed
///
/// Serialized as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageOutcomes(Vec<(String, String)>);

impl PackageOutcomes {
    /// Record `tag` for `key`; a repeated key keeps its first position
    pub fn insert(&mut self, key: String, tag: String) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = tag,
            None => self.0.push((key, tag)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, tag)| tag.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.0.iter().filter(|(_, tag)| tag != "ok").count()
    }
}

impl Serialize for PackageOutcomes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Aggregate of one sync run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub updates_available: bool,
    pub pending_count: u64,
    /// Update list as received from the authority
    #[serde(rename = "plugins")]
    pub packages: Vec<RemotePackage>,
    #[serde(rename = "installed_by_bridge")]
    pub outcomes: PackageOutcomes,
    /// Work was handed to the external updater
    pub delegated: bool,
    /// Whether the external updater applied every update; `None` when not delegated
    pub updated: Option<bool>,
}

/// Trigger response when the built-in pipeline ran
#[derive(Debug, Clone, Serialize)]
pub struct BridgeReport {
    pub success: bool,
    pub message: String,
    pub check_only: bool,
    pub updates_available: bool,
    pub installed_by_bridge: PackageOutcomes,
}

/// Trigger response for a check against the external updater
#[derive(Debug, Clone, Serialize)]
pub struct PendingReport {
    pub success: bool,
    pub message: String,
    pub check_only: bool,
    pub pending_updates: usize,
    pub pending_plugins: Vec<PendingUpdate>,
}

/// Trigger response after the external updater applied updates
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedReport {
    pub success: bool,
    pub message: String,
    pub pending_before: usize,
    pub pending_after: usize,
    pub updated: bool,
}

/// Outcome of an inbound trigger request
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TriggerReport {
    Bridge(BridgeReport),
    Pending(PendingReport),
    Updated(UpdatedReport),
}

impl TriggerReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            Self::Bridge(r) => r.success,
            Self::Pending(r) => r.success,
            Self::Updated(r) => r.success,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Bridge(r) => &r.message,
            Self::Pending(r) => &r.message,
            Self::Updated(r) => &r.message,
        }
    }
}
