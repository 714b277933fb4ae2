use bridge_types::PollInterval;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll timer lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleEvent {
    Armed {
        interval: PollInterval,
        first_run_in: Duration,
    },

    /// Timer removed because the authority is no longer configured
    Cleared,

    Fired {
        interval: PollInterval,
    },
}
