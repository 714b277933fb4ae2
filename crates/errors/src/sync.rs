//! Sync run error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("remote authority not configured")]
    NotConfigured,

    #[error("invalid response from remote authority: {message}")]
    InvalidResponse { message: String },

    #[error("a sync run is already in progress")]
    InProgress,

    #[error("external updater failed: {message}")]
    UpdaterFailed { message: String },
}

impl UserFacingError for SyncError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotConfigured => Some(
                "Set authority.url and authority.secret with `bridge config set` and retry.",
            ),
            Self::InProgress => Some("Wait for the running sync to finish."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::InProgress | Self::InvalidResponse { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NotConfigured => "sync.not_configured",
            Self::InvalidResponse { .. } => "sync.invalid_response",
            Self::InProgress => "sync.in_progress",
            Self::UpdaterFailed { .. } => "sync.updater_failed",
        })
    }
}
