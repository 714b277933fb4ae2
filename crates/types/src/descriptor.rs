//! Package descriptors: where one installable unit comes from

use bridge_errors::{Error, InstallError};
use secrecy::SecretString;

use crate::remote::{non_empty, RemotePackage};

/// Branch used when a descriptor does not name one
pub const DEFAULT_BRANCH: &str = "main";

/// Identifies one installable unit and its source location
///
/// At least one of `repository` or `archive_url` must be set; this is checked
/// by [`PackageDescriptor::validate`] before any side effect happens.
#[derive(Debug)]
pub struct PackageDescriptor {
    /// Sanitized identifier, also the name of the live install slot
    pub slug: String,
    /// Repository reference in `owner/name` form
    pub repository: Option<String>,
    pub branch: String,
    /// Direct archive download location
    pub archive_url: Option<String>,
    /// Credential for private repository downloads
    pub access_token: Option<SecretString>,
}

impl PackageDescriptor {
    /// Descriptor for a repository reference; the slug is the repository name.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable slug can be derived from `repository`.
    pub fn from_repository(repository: &str) -> Result<Self, Error> {
        let slug = slug_from_repository(repository).ok_or_else(|| InstallError::InvalidDescriptor {
            message: format!("cannot derive a slug from repository '{repository}'"),
        })?;
        Ok(Self {
            slug,
            repository: Some(repository.trim().to_string()),
            branch: DEFAULT_BRANCH.to_string(),
            archive_url: None,
            access_token: None,
        })
    }

    /// Descriptor for a direct archive download.
    ///
    /// # Errors
    ///
    /// Returns an error if `slug` sanitizes to an empty identifier.
    pub fn from_archive_url(slug: &str, archive_url: &str) -> Result<Self, Error> {
        Ok(Self {
            slug: checked_slug(slug)?,
            repository: None,
            branch: DEFAULT_BRANCH.to_string(),
            archive_url: Some(archive_url.trim().to_string()),
            access_token: None,
        })
    }

    /// Build a descriptor from an entry of the remote update list.
    ///
    /// The slug comes from the entry's `slug`, else from the last segment of
    /// its repository reference. The access token is supplied locally, never
    /// by the remote authority.
    ///
    /// # Errors
    ///
    /// Returns an error if neither a slug nor a repository reference is present.
    pub fn from_remote(entry: &RemotePackage, access_token: Option<SecretString>) -> Result<Self, Error> {
        let repository = non_empty(entry.github_repo.as_deref()).map(str::to_string);
        let slug = match non_empty(entry.slug.as_deref()) {
            Some(slug) => checked_slug(slug)?,
            None => repository
                .as_deref()
                .and_then(slug_from_repository)
                .ok_or_else(|| InstallError::InvalidDescriptor {
                    message: "slug or repository reference required".to_string(),
                })?,
        };
        let branch = non_empty(entry.branch.as_deref()).unwrap_or(DEFAULT_BRANCH);

        Ok(Self {
            slug,
            repository,
            branch: branch.to_string(),
            archive_url: non_empty(entry.zip_url.as_deref()).map(str::to_string),
            access_token,
        })
    }

    #[must_use]
    pub fn with_branch(mut self, branch: &str) -> Self {
        let branch = branch.trim();
        self.branch = if branch.is_empty() {
            DEFAULT_BRANCH.to_string()
        } else {
            branch.to_string()
        };
        self
    }

    #[must_use]
    pub fn with_repository(mut self, repository: &str) -> Self {
        self.repository = non_empty(Some(repository)).map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_access_token(mut self, token: Option<SecretString>) -> Self {
        self.access_token = token;
        self
    }

    /// Repository reference, if present and non-blank
    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        non_empty(self.repository.as_deref())
    }

    /// Direct archive URL, if present and non-blank
    #[must_use]
    pub fn archive_url(&self) -> Option<&str> {
        non_empty(self.archive_url.as_deref())
    }

    /// Check the source invariant.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::MissingSource`] when neither a repository
    /// reference nor an archive URL is present.
    pub fn validate(&self) -> Result<(), Error> {
        if self.repository().is_none() && self.archive_url().is_none() {
            return Err(InstallError::MissingSource {
                slug: self.slug.clone(),
            }
            .into());
        }
        Ok(())
    }
}

/// Normalize an identifier to `[A-Za-z0-9_-]`.
///
/// Leading and trailing dashes are trimmed first; every other character
/// outside the allowed set becomes a dash.
#[must_use]
pub fn sanitize_slug(raw: &str) -> String {
    raw.trim()
        .trim_matches('-')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Sanitize a slug and reject one that is empty or only dashes.
///
/// # Errors
///
/// Returns [`InstallError::InvalidDescriptor`] when nothing usable remains.
pub fn checked_slug(raw: &str) -> Result<String, Error> {
    let slug = sanitize_slug(raw);
    if slug.is_empty() || slug.chars().all(|c| c == '-') {
        return Err(InstallError::InvalidDescriptor {
            message: format!("'{raw}' is not a usable slug"),
        }
        .into());
    }
    Ok(slug)
}

fn slug_from_repository(repository: &str) -> Option<String> {
    let last = repository.trim().trim_end_matches('/').rsplit('/').next()?;
    checked_slug(&last.to_lowercase()).ok()
}
