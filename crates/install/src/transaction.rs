//! Install transaction: fetch, extract, locate, swap, clean up

use bridge_errors::{Error, InstallError};
use bridge_events::{AppEvent, EventEmitter, EventSender, FailureContext, InstallEvent};
use bridge_net::PackageFetcher;
use bridge_types::{scratch_name, InstallStage, PackageDescriptor};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::extract::extract;
use crate::fs::{LocalFilesystem, SlotFilesystem};
use crate::locator::{locate_root, ManifestSignature};

/// Directories an installer works in
///
/// Keep `scratch_dir` on the same volume as `install_root` so that the
/// backup and swap renames do not fall back to copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    /// Parent of every live install slot
    pub install_root: PathBuf,
    /// Downloads, extraction trees and backups
    pub scratch_dir: PathBuf,
}

impl InstallPaths {
    /// Live slot for `slug`
    #[must_use]
    pub fn slot(&self, slug: &str) -> PathBuf {
        self.install_root.join(slug)
    }
}

/// Result of one install transaction
#[derive(Debug, Clone)]
pub enum InstallOutcome {
    Success {
        slug: String,
        path: PathBuf,
    },
    Failure {
        slug: String,
        stage: InstallStage,
        failure: FailureContext,
    },
}

impl InstallOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            Self::Success { slug, .. } | Self::Failure { slug, .. } => slug,
        }
    }

    /// `"ok"` on success, otherwise the failure reason
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::Success { .. } => "ok".to_string(),
            Self::Failure { failure, .. } => failure.message.clone(),
        }
    }
}

type StageResult<T> = Result<T, (InstallStage, Error)>;

fn at(stage: InstallStage) -> impl FnOnce(Error) -> (InstallStage, Error) {
    move |err| (stage, err)
}

/// Runs install transactions against live slots under `install_root`
///
/// Transactions for the same slug are serialized around the swap step;
/// transactions for different slugs do not block each other.
#[derive(Clone)]
pub struct Installer {
    fetcher: PackageFetcher,
    paths: InstallPaths,
    fs: Arc<dyn SlotFilesystem>,
    signature: ManifestSignature,
    slot_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    tx: Option<EventSender>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("paths", &self.paths)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl EventEmitter for Installer {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl Installer {
    #[must_use]
    pub fn new(fetcher: PackageFetcher, paths: InstallPaths) -> Self {
        Self {
            fetcher,
            paths,
            fs: Arc::new(LocalFilesystem),
            signature: ManifestSignature::default(),
            slot_locks: Arc::new(DashMap::new()),
            tx: None,
        }
    }

    #[must_use]
    pub fn with_filesystem(mut self, fs: Arc<dyn SlotFilesystem>) -> Self {
        self.fs = fs;
        self
    }

    #[must_use]
    pub fn with_signature(mut self, signature: ManifestSignature) -> Self {
        self.signature = signature;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    #[must_use]
    pub fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    /// Install `descriptor` into its live slot.
    ///
    /// Never panics on package problems; every failure is reported through
    /// [`InstallOutcome::Failure`]. Afterwards the slot holds either the new
    /// package, the previous one, or nothing if there was nothing before.
    pub async fn install(&self, descriptor: &PackageDescriptor) -> InstallOutcome {
        let slug = descriptor.slug.clone();
        self.emit(AppEvent::Install(InstallEvent::Started { slug: slug.clone() }));

        match self.run(descriptor).await {
            Ok(path) => {
                self.emit(AppEvent::Install(InstallEvent::Completed {
                    slug: slug.clone(),
                    path: path.clone(),
                }));
                InstallOutcome::Success { slug, path }
            }
            Err((stage, err)) => {
                let failure = FailureContext::from_error(&err);
                self.emit(AppEvent::Install(InstallEvent::Failed {
                    slug: slug.clone(),
                    stage,
                    failure: failure.clone(),
                }));
                InstallOutcome::Failure {
                    slug,
                    stage,
                    failure,
                }
            }
        }
    }

    async fn run(&self, descriptor: &PackageDescriptor) -> StageResult<PathBuf> {
        descriptor.validate().map_err(at(InstallStage::Validate))?;
        let slug = descriptor.slug.as_str();

        tokio::fs::create_dir_all(&self.paths.scratch_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &self.paths.scratch_dir))
            .map_err(at(InstallStage::Fetch))?;
        let archive = self
            .fetcher
            .fetch(descriptor, &self.paths.scratch_dir)
            .await
            .map_err(at(InstallStage::Fetch))?;

        let extract_dir = self.paths.scratch_dir.join(scratch_name("extract"));
        let extracted = extract(&archive, &extract_dir).await;
        self.discard_file(&archive).await;
        if let Err(err) = extracted {
            self.discard_tree(&extract_dir).await;
            return Err((InstallStage::Extract, err));
        }

        let Some(root) = self.locate(&extract_dir).await else {
            self.discard_tree(&extract_dir).await;
            return Err((
                InstallStage::Locate,
                InstallError::UnrecognizedLayout {
                    path: extract_dir.display().to_string(),
                }
                .into(),
            ));
        };
        self.emit(AppEvent::Install(InstallEvent::Extracted {
            slug: slug.to_string(),
            root: root.clone(),
        }));

        let slot = self.paths.slot(slug);
        let swapped = {
            let lock = self.slot_lock(slug);
            let _guard = lock.lock().await;
            self.swap(slug, &root, &slot).await
        };
        self.discard_tree(&extract_dir).await;

        swapped.map_err(at(InstallStage::Swap))?;
        Ok(slot)
    }

    async fn locate(&self, extract_dir: &Path) -> Option<PathBuf> {
        let dir = extract_dir.to_path_buf();
        let signature = self.signature.clone();
        tokio::task::spawn_blocking(move || locate_root(&dir, &signature))
            .await
            .ok()
            .flatten()
    }

    fn slot_lock(&self, slug: &str) -> Arc<Mutex<()>> {
        self.slot_locks.entry(slug.to_string()).or_default().clone()
    }

    /// Move `root` into `slot`, backing up and restoring any previous content
    async fn swap(&self, slug: &str, root: &Path, slot: &Path) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.paths.install_root)
            .await
            .map_err(|e| Error::io_with_path(&e, &self.paths.install_root))?;

        let backup = if tokio::fs::symlink_metadata(slot).await.is_ok() {
            let backup = self
                .paths
                .scratch_dir
                .join(scratch_name(&format!("backup-{slug}")));
            self.fs
                .rename(slot, &backup)
                .await
                .map_err(|e| InstallError::BackupFailed {
                    path: slot.display().to_string(),
                    message: e.to_string(),
                })?;
            self.emit(AppEvent::Install(InstallEvent::BackedUp {
                slug: slug.to_string(),
                backup: backup.clone(),
            }));
            Some(backup)
        } else {
            None
        };

        let copied = if self.fs.rename(root, slot).await.is_ok() {
            false
        } else if let Err(copy_err) = self.fs.copy_tree(root, slot).await {
            return Err(self.roll_back(slug, slot, backup.as_deref(), &copy_err).await);
        } else {
            true
        };

        self.emit(AppEvent::Install(InstallEvent::Swapped {
            slug: slug.to_string(),
            path: slot.to_path_buf(),
            copied,
        }));

        if let Some(backup) = backup {
            self.discard_tree(&backup).await;
        }
        Ok(())
    }

    /// Put the previous slot content back after a failed copy
    async fn roll_back(&self, slug: &str, slot: &Path, backup: Option<&Path>, cause: &Error) -> Error {
        let partial = self.fs.remove_tree(slot).await;

        let Some(backup) = backup else {
            return InstallError::CopyFailed {
                path: slot.display().to_string(),
                message: cause.to_string(),
            }
            .into();
        };

        let restored = match partial {
            Ok(()) => self.fs.rename(backup, slot).await,
            Err(err) => Err(err),
        };
        match restored {
            Ok(()) => {
                self.emit(AppEvent::Install(InstallEvent::RolledBack {
                    slug: slug.to_string(),
                    restored: slot.to_path_buf(),
                }));
                InstallError::CopyFailed {
                    path: slot.display().to_string(),
                    message: cause.to_string(),
                }
                .into()
            }
            // The backup stays where it is so it can be recovered by hand
            Err(err) => InstallError::RollbackFailed {
                path: slot.display().to_string(),
                backup: backup.display().to_string(),
                message: format!("{cause}; restore failed: {err}"),
            }
            .into(),
        }
    }

    async fn discard_file(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.emit(AppEvent::Install(InstallEvent::CleanupFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }));
            }
        }
    }

    async fn discard_tree(&self, path: &Path) {
        if let Err(e) = self.fs.remove_tree(path).await {
            self.emit(AppEvent::Install(InstallEvent::CleanupFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_tags() {
        let ok = InstallOutcome::Success {
            slug: "widget".into(),
            path: "/srv/plugins/widget".into(),
        };
        assert_eq!(ok.tag(), "ok");
        assert!(ok.is_success());

        let failed = InstallOutcome::Failure {
            slug: "widget".into(),
            stage: InstallStage::Locate,
            failure: FailureContext::new(
                Some("install.unrecognized_layout"),
                "unrecognized package layout in /tmp/x",
                None::<String>,
                false,
            ),
        };
        assert_eq!(failed.tag(), "unrecognized package layout in /tmp/x");
        assert_eq!(failed.slug(), "widget");
    }

    #[test]
    fn slot_is_named_after_slug() {
        let paths = InstallPaths {
            install_root: "/srv/plugins".into(),
            scratch_dir: "/srv/upgrade".into(),
        };
        assert_eq!(paths.slot("widget"), PathBuf::from("/srv/plugins/widget"));
    }
}
