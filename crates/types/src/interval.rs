//! Poll cadences understood by the scheduler

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bridge_errors::ConfigError;

/// How often the remote authority is polled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollInterval {
    #[default]
    Hourly,
    TwiceDaily,
    Daily,
}

impl PollInterval {
    /// Period between two consecutive polls
    #[must_use]
    pub const fn period(self) -> Duration {
        match self {
            Self::Hourly => Duration::from_secs(60 * 60),
            Self::TwiceDaily => Duration::from_secs(12 * 60 * 60),
            Self::Daily => Duration::from_secs(24 * 60 * 60),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::TwiceDaily => "twicedaily",
            Self::Daily => "daily",
        }
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollInterval {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "twicedaily" | "twice-daily" | "twice_daily" => Ok(Self::TwiceDaily),
            "daily" => Ok(Self::Daily),
            other => Err(ConfigError::InvalidValue {
                field: "authority.interval".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
