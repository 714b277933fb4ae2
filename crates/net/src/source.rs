//! Resolve a package descriptor into a concrete download location

use bridge_config::GithubConfig;
use bridge_errors::{Error, InstallError};
use bridge_types::{ExposeSecret, PackageDescriptor, SecretString};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use url::Url;

/// Media type requested from the repository API for archive downloads
pub const API_ACCEPT: &str = "application/vnd.github.v3+json";

/// Base URLs of the repository host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoints {
    pub api_base: String,
    pub web_base: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self::from_config(&GithubConfig::default())
    }
}

impl SourceEndpoints {
    #[must_use]
    pub fn from_config(github: &GithubConfig) -> Self {
        Self {
            api_base: github.api_base.trim_end_matches('/').to_string(),
            web_base: github.web_base.trim_end_matches('/').to_string(),
        }
    }
}

/// Where an archive is downloaded from, in order of preference
#[derive(Debug)]
pub enum DownloadSource {
    /// Explicit archive URL supplied by the descriptor
    Direct { url: String },
    /// Private repository snapshot through the authenticated API
    AuthenticatedApi { url: String, token: SecretString },
    /// Public repository snapshot
    PublicArchive { url: String },
}

impl DownloadSource {
    /// Pick the download location for `descriptor`.
    ///
    /// A well-formed direct URL wins. Otherwise the repository reference is
    /// used, through the API when an access token is present.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::MissingSource`] if neither source is usable.
    pub fn resolve(descriptor: &PackageDescriptor, endpoints: &SourceEndpoints) -> Result<Self, Error> {
        descriptor.validate()?;

        if let Some(url) = descriptor.archive_url() {
            if Url::parse(url).is_ok() {
                return Ok(Self::Direct {
                    url: url.to_string(),
                });
            }
        }

        let Some(repository) = descriptor.repository() else {
            return Err(InstallError::MissingSource {
                slug: descriptor.slug.clone(),
            }
            .into());
        };
        let repository = repository.trim_matches('/');
        let branch = descriptor.branch.as_str();

        match &descriptor.access_token {
            Some(token) if !token.expose_secret().trim().is_empty() => Ok(Self::AuthenticatedApi {
                url: format!("{}/repos/{repository}/zipball/{branch}", endpoints.api_base),
                token: SecretString::from(token.expose_secret().trim().to_string()),
            }),
            _ => Ok(Self::PublicArchive {
                url: format!(
                    "{}/{repository}/archive/refs/heads/{branch}.zip",
                    endpoints.web_base
                ),
            }),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Direct { url } | Self::AuthenticatedApi { url, .. } | Self::PublicArchive { url } => url,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::AuthenticatedApi { .. })
    }

    /// Request headers for this source; credentials are marked sensitive
    ///
    /// # Errors
    ///
    /// Returns an error if the token contains characters not allowed in a header.
    pub fn headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        if let Self::AuthenticatedApi { token, .. } = self {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|_| InstallError::InvalidDescriptor {
                    message: "access token contains invalid characters".to_string(),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
            headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));
        }
        Ok(headers)
    }
}
