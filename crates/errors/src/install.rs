//! Installation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    #[error("missing source for package {slug}: neither repository nor archive URL given")]
    MissingSource { slug: String },

    #[error("invalid package descriptor: {message}")]
    InvalidDescriptor { message: String },

    #[error("extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("unrecognized package layout in {path}")]
    UnrecognizedLayout { path: String },

    #[error("cannot back up existing installation at {path}: {message}")]
    BackupFailed { path: String, message: String },

    #[error("copy failed into {path}: {message}")]
    CopyFailed { path: String, message: String },

    #[error("rollback failed for {path}, backup kept at {backup}: {message}")]
    RollbackFailed {
        path: String,
        backup: String,
        message: String,
    },

    #[error("filesystem operation failed: {operation} on {path}: {message}")]
    FilesystemError {
        operation: String,
        path: String,
        message: String,
    },

    #[error("task execution failed: {message}")]
    TaskError { message: String },
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingSource { .. } => {
                Some("Provide a repository reference (owner/name) or a direct archive URL.")
            }
            Self::UnrecognizedLayout { .. } => Some(
                "The archive must contain the package manifest at most two directories deep.",
            ),
            Self::BackupFailed { .. } | Self::CopyFailed { .. } => {
                Some("Ensure the install root and scratch directory are writable.")
            }
            Self::RollbackFailed { .. } => {
                Some("Move the backup directory back into place manually.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExtractionFailed { .. }
                | Self::BackupFailed { .. }
                | Self::CopyFailed { .. }
                | Self::FilesystemError { .. }
                | Self::TaskError { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::MissingSource { .. } => "install.missing_source",
            Self::InvalidDescriptor { .. } => "install.invalid_descriptor",
            Self::ExtractionFailed { .. } => "install.extraction_failed",
            Self::UnrecognizedLayout { .. } => "install.unrecognized_layout",
            Self::BackupFailed { .. } => "install.backup_failed",
            Self::CopyFailed { .. } => "install.copy_failed",
            Self::RollbackFailed { .. } => "install.rollback_failed",
            Self::FilesystemError { .. } => "install.filesystem",
            Self::TaskError { .. } => "install.task",
        })
    }
}
