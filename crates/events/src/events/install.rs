use bridge_types::InstallStage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Install transaction events, one stream per package slug
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallEvent {
    Started {
        slug: String,
    },

    /// Archive unpacked and the package root located
    Extracted {
        slug: String,
        root: PathBuf,
    },

    BackedUp {
        slug: String,
        backup: PathBuf,
    },

    /// New content is live; `copied` is set when the rename fell back to a copy
    Swapped {
        slug: String,
        path: PathBuf,
        copied: bool,
    },

    RolledBack {
        slug: String,
        restored: PathBuf,
    },

    Completed {
        slug: String,
        path: PathBuf,
    },

    Failed {
        slug: String,
        stage: InstallStage,
        failure: FailureContext,
    },

    /// Scratch content could not be removed; the install result is unaffected
    CleanupFailed {
        path: PathBuf,
        message: String,
    },
}
