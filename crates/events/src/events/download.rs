use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FailureContext;

/// Archive download events
///
/// URLs carried here never contain credentials; tokens travel in headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    Started {
        url: String,
        package: String,
        total_size: Option<u64>,
        authenticated: bool,
    },

    Completed {
        url: String,
        package: String,
        bytes: u64,
        elapsed: Duration,
    },

    Failed {
        url: String,
        package: String,
        failure: FailureContext,
    },
}
