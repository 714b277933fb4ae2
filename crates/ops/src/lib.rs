#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations for the bridge agent
//!
//! This crate wires configuration, the network client and the installer
//! into a [`SyncOrchestrator`] and a [`PollScheduler`], and exposes the
//! operations the CLI and the trigger endpoint call.

mod context;
mod orchestrator;
mod scheduler;
mod status;
mod types;
mod updater;

pub use context::{OpsContextBuilder, OpsCtx};
pub use orchestrator::SyncOrchestrator;
pub use scheduler::{spawn_config_watcher, PollScheduler, ScheduledJob, DEFAULT_FIRST_DELAY};
pub use status::{parse_status, status_endpoint, StatusClient, CLIENT_SECRET_HEADER};
pub use types::{BridgeReport, PackageOutcomes, PendingReport, SyncResult, TriggerReport, UpdatedReport};
pub use updater::{ExternalUpdater, PendingUpdate};

use bridge_config::Config;
use bridge_errors::Error;
use bridge_events::{AppEvent, EventEmitter, GeneralEvent};
use bridge_install::InstallOutcome;
use bridge_types::PackageDescriptor;

/// Poll the authority once; `check_only` skips installation
///
/// # Errors
///
/// See [`SyncOrchestrator::run_sync`].
pub async fn sync(ctx: &OpsCtx, check_only: bool) -> Result<SyncResult, Error> {
    ctx.orchestrator.run_sync(!check_only).await
}

/// Install a single package outside of any sync run
pub async fn install(ctx: &OpsCtx, descriptor: &PackageDescriptor) -> InstallOutcome {
    ctx.installer.install(descriptor).await
}

/// Handle a trigger request
///
/// # Errors
///
/// See [`SyncOrchestrator::trigger`].
pub async fn trigger(ctx: &OpsCtx, check_only: bool) -> Result<TriggerReport, Error> {
    ctx.orchestrator.trigger(check_only).await
}

/// Current configuration with secrets masked
#[must_use]
pub fn show_config(ctx: &OpsCtx) -> Config {
    ctx.config.snapshot().redacted()
}

/// Set one configuration key, persisting it and notifying the scheduler
///
/// Returns whether the value changed.
///
/// # Errors
///
/// Returns an error for unknown keys, invalid values, or if the file
/// cannot be written.
pub async fn set_config(ctx: &OpsCtx, key: &str, value: &str) -> Result<bool, Error> {
    let changed = ctx.config.update(|config| config.set_key(key, value)).await?;
    if changed {
        ctx.tx.emit(AppEvent::General(GeneralEvent::ConfigurationReloaded {
            source: format!("set {key}"),
        }));
    }
    Ok(changed)
}
