//! Package fetcher: descriptor in, local archive out

use bridge_errors::Error;
use bridge_events::{AppEvent, DownloadEvent, EventEmitter, EventSender, FailureContext};
use bridge_types::{scratch_name, PackageDescriptor};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::source::{DownloadSource, SourceEndpoints};
use crate::{Download, DownloadResult, NetClient};

/// Downloads the archive for a package into a scratch directory
#[derive(Clone, Debug)]
pub struct PackageFetcher {
    client: NetClient,
    endpoints: SourceEndpoints,
    timeout: Duration,
    tx: Option<EventSender>,
}

impl EventEmitter for PackageFetcher {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl PackageFetcher {
    #[must_use]
    pub fn new(client: NetClient, endpoints: SourceEndpoints) -> Self {
        let timeout = client.config().timeout;
        Self {
            client,
            endpoints,
            timeout,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Fetch the archive for `descriptor` into `scratch_dir`.
    ///
    /// The descriptor is validated before any network traffic. The returned
    /// file is non-empty and owned by the caller, who must delete it.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor has no usable source, the download
    /// fails, or the server sends an empty body.
    pub async fn fetch(&self, descriptor: &PackageDescriptor, scratch_dir: &Path) -> Result<PathBuf, Error> {
        let source = DownloadSource::resolve(descriptor, &self.endpoints)?;
        let dest = scratch_dir.join(format!("{}.zip", scratch_name("download")));

        self.emit(AppEvent::Download(DownloadEvent::Started {
            url: source.url().to_string(),
            package: descriptor.slug.clone(),
            total_size: None,
            authenticated: source.is_authenticated(),
        }));

        let result: Result<DownloadResult, Error> = async {
            Download::new(source.url())?
                .with_headers(source.headers()?)
                .with_timeout(self.timeout)
                .execute(&self.client, &dest)
                .await
        }
        .await;

        match result {
            Ok(done) => {
                self.emit(AppEvent::Download(DownloadEvent::Completed {
                    url: done.url,
                    package: descriptor.slug.clone(),
                    bytes: done.size,
                    elapsed: done.elapsed,
                }));
                Ok(dest)
            }
            Err(err) => {
                self.emit(AppEvent::Download(DownloadEvent::Failed {
                    url: source.url().to_string(),
                    package: descriptor.slug.clone(),
                    failure: FailureContext::from_error(&err),
                }));
                Err(err)
            }
        }
    }
}
