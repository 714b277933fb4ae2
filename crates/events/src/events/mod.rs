use serde::{Deserialize, Serialize};

use bridge_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, see `UserFacingError::user_code`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod download;
pub mod general;
pub mod install;
pub mod schedule;
pub mod sync;

pub use download::*;
pub use general::*;
pub use install::*;
pub use schedule::*;
pub use sync::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    Download(DownloadEvent),

    Install(InstallEvent),

    Sync(SyncEvent),

    Schedule(ScheduleEvent),
}

impl AppEvent {
    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::Download(DownloadEvent::Failed { .. })
            | Self::Install(InstallEvent::Failed { .. })
            | Self::Sync(SyncEvent::Failed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Install(InstallEvent::RolledBack { .. } | InstallEvent::CleanupFailed { .. })
            | Self::Sync(SyncEvent::PackageSkipped { .. } | SyncEvent::Rejected)
            | Self::Sync(SyncEvent::PackageFinished { success: false, .. })
            | Self::Sync(SyncEvent::Completed {
                updated: Some(false),
                ..
            }) => Level::WARN,

            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Download(DownloadEvent::Started { .. })
            | Self::Install(
                InstallEvent::Extracted { .. }
                | InstallEvent::BackedUp { .. }
                | InstallEvent::Swapped { .. },
            )
            | Self::Schedule(ScheduleEvent::Fired { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "bridge::events::general",
            Self::Download(_) => "bridge::events::download",
            Self::Install(_) => "bridge::events::install",
            Self::Sync(_) => "bridge::events::sync",
            Self::Schedule(_) => "bridge::events::schedule",
        }
    }
}
