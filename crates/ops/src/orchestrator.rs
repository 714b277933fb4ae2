//! Sync runs: ask the authority, then install or delegate

use async_trait::async_trait;
use bridge_config::{ConfigStore, RemoteAuthority};
use bridge_errors::{Error, SyncError, UserFacingError};
use bridge_events::{AppEvent, EventEmitter, EventSender, FailureContext, SyncEvent};
use bridge_install::Installer;
use bridge_types::PackageDescriptor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::scheduler::ScheduledJob;
use crate::status::StatusClient;
use crate::types::{BridgeReport, PackageOutcomes, PendingReport, SyncResult, TriggerReport, UpdatedReport};
use crate::updater::ExternalUpdater;

/// Marks a run as active; cleared on drop so a panicking run cannot wedge the flag
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The unit of work fired by the scheduler and the trigger endpoint
///
/// At most one run is active per orchestrator; overlapping requests are
/// rejected with [`SyncError::InProgress`] instead of queued.
pub struct SyncOrchestrator {
    config: ConfigStore,
    status: StatusClient,
    installer: Installer,
    updater: Option<Arc<dyn ExternalUpdater>>,
    running: AtomicBool,
    tx: EventSender,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("installer", &self.installer)
            .field("has_updater", &self.updater.is_some())
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter for SyncOrchestrator {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(
        config: ConfigStore,
        status: StatusClient,
        installer: Installer,
        updater: Option<Arc<dyn ExternalUpdater>>,
        tx: EventSender,
    ) -> Self {
        Self {
            config,
            status,
            installer,
            updater,
            running: AtomicBool::new(false),
            tx,
        }
    }

    #[must_use]
    pub fn has_updater(&self) -> bool {
        self.updater.is_some()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn authority(&self) -> Result<RemoteAuthority, Error> {
        RemoteAuthority::from_config(&self.config.snapshot().authority)
            .ok_or_else(|| SyncError::NotConfigured.into())
    }

    /// Poll the authority and, when `install` is set, apply what it reports.
    ///
    /// Packages are installed one at a time in list order. A failing package
    /// is recorded and the run continues; entries without a usable source are
    /// skipped and do not appear in the outcomes.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority is not configured, another run is
    /// active, the status call fails, or the external updater fails.
    pub async fn run_sync(&self, install: bool) -> Result<SyncResult, Error> {
        let _guard = self.begin()?;
        let result = self.sync_locked(install).await;
        self.finish(&result);
        result
    }

    fn begin(&self) -> Result<RunGuard<'_>, Error> {
        RunGuard::acquire(&self.running).ok_or_else(|| {
            self.emit(AppEvent::Sync(SyncEvent::Rejected));
            SyncError::InProgress.into()
        })
    }

    fn finish(&self, result: &Result<SyncResult, Error>) {
        match result {
            Ok(sync) => self.emit(AppEvent::Sync(SyncEvent::Completed {
                installed: sync.outcomes.len() - sync.outcomes.failed(),
                failed: sync.outcomes.failed(),
                updated: sync.updated,
            })),
            Err(err) => self.emit(AppEvent::Sync(SyncEvent::Failed {
                failure: FailureContext::from_error(err),
            })),
        }
    }

    async fn sync_locked(&self, install: bool) -> Result<SyncResult, Error> {
        let authority = self.authority()?;
        self.emit(AppEvent::Sync(SyncEvent::Started { install }));

        let status = self.status.fetch(&authority, &self.tx).await?;
        self.emit(AppEvent::Sync(SyncEvent::StatusReceived {
            updates_available: status.updates_available,
            pending_count: status.pending_count,
            packages: status.plugins.len(),
        }));

        if !status.updates_available {
            return Ok(SyncResult::default());
        }

        let mut result = SyncResult {
            updates_available: true,
            pending_count: status.pending_count,
            packages: status.plugins,
            ..SyncResult::default()
        };
        if !install {
            return Ok(result);
        }

        if let Some(updater) = &self.updater {
            self.emit(AppEvent::Sync(SyncEvent::Delegated {
                pending_before: result.packages.len(),
                check_only: false,
            }));
            updater.check_for_updates().await.map_err(updater_failed)?;
            let updated = updater.run_update().await.map_err(updater_failed)?;
            result.delegated = true;
            result.updated = Some(updated);
            return Ok(result);
        }

        let token = self.config.snapshot().access_token();
        let mut outcomes = PackageOutcomes::default();
        for entry in &result.packages {
            let key = entry.key();
            if !entry.has_source() {
                self.emit(AppEvent::Sync(SyncEvent::PackageSkipped { key }));
                continue;
            }

            let tag = match PackageDescriptor::from_remote(entry, token.clone()) {
                Ok(descriptor) => self.installer.install(&descriptor).await.tag(),
                Err(err) => err.user_message().into_owned(),
            };
            self.emit(AppEvent::Sync(SyncEvent::PackageFinished {
                key: key.clone(),
                success: tag == "ok",
                tag: tag.clone(),
            }));
            outcomes.insert(key, tag);
        }
        result.outcomes = outcomes;
        Ok(result)
    }

    /// Handle an inbound trigger request.
    ///
    /// Without an external updater this is a sync run whose failures are
    /// folded into an unsuccessful [`BridgeReport`]. With one, the updater is
    /// asked to check and, unless `check_only`, to apply updates.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotConfigured`] when no updater is present and the
    /// authority is not configured, [`SyncError::InProgress`] when a run is
    /// active, and [`SyncError::UpdaterFailed`] when the updater fails.
    pub async fn trigger(&self, check_only: bool) -> Result<TriggerReport, Error> {
        let Some(updater) = &self.updater else {
            self.authority()?;
            return match self.run_sync(!check_only).await {
                Ok(sync) => Ok(TriggerReport::Bridge(BridgeReport {
                    success: true,
                    message: if check_only {
                        "Check completed.".to_string()
                    } else {
                        "Sync completed.".to_string()
                    },
                    check_only,
                    updates_available: sync.updates_available,
                    installed_by_bridge: sync.outcomes,
                })),
                Err(Error::Sync(SyncError::InProgress)) => Err(SyncError::InProgress.into()),
                Err(err) => Ok(TriggerReport::Bridge(BridgeReport {
                    success: false,
                    message: err.user_message().into_owned(),
                    check_only,
                    updates_available: false,
                    installed_by_bridge: PackageOutcomes::default(),
                })),
            };
        };

        let _guard = self.begin()?;
        let pending_before = updater.pending_updates().await.map_err(updater_failed)?;
        self.emit(AppEvent::Sync(SyncEvent::Delegated {
            pending_before: pending_before.len(),
            check_only,
        }));
        updater.check_for_updates().await.map_err(updater_failed)?;
        let pending_after = updater.pending_updates().await.map_err(updater_failed)?;

        if check_only {
            return Ok(TriggerReport::Pending(PendingReport {
                success: true,
                message: "Update check completed.".to_string(),
                check_only: true,
                pending_updates: pending_after.len(),
                pending_plugins: pending_after,
            }));
        }

        let updated = updater.run_update().await.map_err(updater_failed)?;
        let remaining = updater.pending_updates().await.map_err(updater_failed)?;
        Ok(TriggerReport::Updated(UpdatedReport {
            success: updated,
            message: if updated {
                "Check and update completed.".to_string()
            } else {
                "Check completed; some updates failed or were unavailable.".to_string()
            },
            pending_before: pending_before.len(),
            pending_after: remaining.len(),
            updated,
        }))
    }
}

fn updater_failed(err: Error) -> Error {
    SyncError::UpdaterFailed {
        message: err.user_message().into_owned(),
    }
    .into()
}

#[async_trait]
impl ScheduledJob for SyncOrchestrator {
    async fn run_scheduled(&self) {
        // Failures were already reported as events; the next tick retries
        let _ = self.run_sync(true).await;
    }
}
