//! Install transaction stages, reported with failures for diagnosis

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStage {
    Validate,
    Fetch,
    Extract,
    Locate,
    Swap,
    Cleanup,
}

impl InstallStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Locate => "locate",
            Self::Swap => "swap",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
