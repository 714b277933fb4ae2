//! Wire shapes returned by the remote authority's status endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `GET …/master-updates-status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteStatus {
    #[serde(default)]
    pub updates_available: bool,
    #[serde(default)]
    pub pending_count: u64,
    #[serde(default)]
    pub plugins: Vec<RemotePackage>,
}

/// One entry of the update list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePackage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Authority-side identifier; may be numeric or textual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_url: Option<String>,
}

impl RemotePackage {
    /// Whether the entry names something that can be downloaded
    #[must_use]
    pub fn has_source(&self) -> bool {
        non_empty(self.github_repo.as_deref()).is_some() || non_empty(self.zip_url.as_deref()).is_some()
    }

    /// Key under which this entry's outcome is reported
    #[must_use]
    pub fn key(&self) -> String {
        if let Some(slug) = non_empty(self.slug.as_deref()) {
            return slug.to_string();
        }
        match &self.id {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => "?".to_string(),
        }
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
