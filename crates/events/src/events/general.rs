use serde::{Deserialize, Serialize};

/// General utility events for warnings and configuration changes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneralEvent {
    Warning {
        message: String,
    },

    DebugLog {
        message: String,
    },

    /// Configuration was (re)loaded from disk
    ConfigurationReloaded {
        source: String,
    },
}

impl GeneralEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::DebugLog {
            message: message.into(),
        }
    }
}
