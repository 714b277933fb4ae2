use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Events raised while reconciling against the remote authority
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Started {
        install: bool,
    },

    StatusReceived {
        updates_available: bool,
        pending_count: u64,
        packages: usize,
    },

    /// Entry carried no usable source and was not attempted
    PackageSkipped {
        key: String,
    },

    PackageFinished {
        key: String,
        success: bool,
        tag: String,
    },

    /// Work handed to an external updater instead of the built-in pipeline
    Delegated {
        pending_before: usize,
        check_only: bool,
    },

    Completed {
        installed: usize,
        failed: usize,
        /// Outcome reported by the external updater, if one ran
        updated: Option<bool>,
    },

    Failed {
        failure: FailureContext,
    },

    /// A run was requested while another one was still active
    Rejected,
}
