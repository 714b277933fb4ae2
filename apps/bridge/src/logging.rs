//! Structured logging integration for events
//!
//! Library crates never log; they emit [`AppEvent`]s. This module turns each
//! event into a tracing record at the event's own level, under a per-domain
//! target, with the event payload as structured fields.

use bridge_events::{AppEvent, DownloadEvent, GeneralEvent, InstallEvent, ScheduleEvent, SyncEvent};
use tracing::Level;

/// Dispatch to the tracing macro matching a runtime level
macro_rules! log_at {
    ($level:expr, $target:literal, $($rest:tt)+) => {{
        let level: Level = $level;
        if level == Level::ERROR {
            tracing::error!(target: $target, $($rest)+);
        } else if level == Level::WARN {
            tracing::warn!(target: $target, $($rest)+);
        } else if level == Level::INFO {
            tracing::info!(target: $target, $($rest)+);
        } else if level == Level::DEBUG {
            tracing::debug!(target: $target, $($rest)+);
        } else {
            tracing::trace!(target: $target, $($rest)+);
        }
    }};
}

/// Log an [`AppEvent`] through tracing
pub fn log_event(event: &AppEvent) {
    let level = event.log_level();
    match event {
        AppEvent::General(general) => log_general(level, general),
        AppEvent::Download(download) => log_download(level, download),
        AppEvent::Install(install) => log_install(level, install),
        AppEvent::Sync(sync) => log_sync(level, sync),
        AppEvent::Schedule(schedule) => log_schedule(level, schedule),
    }
}

fn log_general(level: Level, event: &GeneralEvent) {
    match event {
        GeneralEvent::Warning { message } | GeneralEvent::DebugLog { message } => {
            log_at!(level, "bridge::events::general", "{message}");
        }
        GeneralEvent::ConfigurationReloaded { source } => {
            log_at!(level, "bridge::events::general", source = %source, "Configuration reloaded");
        }
    }
}

fn log_download(level: Level, event: &DownloadEvent) {
    match event {
        DownloadEvent::Started {
            url,
            package,
            total_size,
            authenticated,
        } => {
            log_at!(
                level,
                "bridge::events::download",
                url = %url,
                package = %package,
                total_size = ?total_size,
                authenticated = authenticated,
                "Download started"
            );
        }
        DownloadEvent::Completed {
            url,
            package,
            bytes,
            elapsed,
        } => {
            log_at!(
                level,
                "bridge::events::download",
                url = %url,
                package = %package,
                bytes = bytes,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Download completed"
            );
        }
        DownloadEvent::Failed { url, package, failure } => {
            log_at!(
                level,
                "bridge::events::download",
                url = %url,
                package = %package,
                code = ?failure.code,
                retryable = failure.retryable,
                "Download failed: {}",
                failure.message
            );
        }
    }
}

fn log_install(level: Level, event: &InstallEvent) {
    match event {
        InstallEvent::Started { slug } => {
            log_at!(level, "bridge::events::install", slug = %slug, "Install started");
        }
        InstallEvent::Extracted { slug, root } => {
            log_at!(
                level,
                "bridge::events::install",
                slug = %slug,
                root = %root.display(),
                "Package root located"
            );
        }
        InstallEvent::BackedUp { slug, backup } => {
            log_at!(
                level,
                "bridge::events::install",
                slug = %slug,
                backup = %backup.display(),
                "Previous version backed up"
            );
        }
        InstallEvent::Swapped { slug, path, copied } => {
            log_at!(
                level,
                "bridge::events::install",
                slug = %slug,
                path = %path.display(),
                copied = copied,
                "New version moved into place"
            );
        }
        InstallEvent::RolledBack { slug, restored } => {
            log_at!(
                level,
                "bridge::events::install",
                slug = %slug,
                restored = %restored.display(),
                "Previous version restored"
            );
        }
        InstallEvent::Completed { slug, path } => {
            log_at!(
                level,
                "bridge::events::install",
                slug = %slug,
                path = %path.display(),
                "Install completed"
            );
        }
        InstallEvent::Failed { slug, stage, failure } => {
            log_at!(
                level,
                "bridge::events::install",
                slug = %slug,
                stage = %stage,
                code = ?failure.code,
                retryable = failure.retryable,
                hint = ?failure.hint,
                "Install failed: {}",
                failure.message
            );
        }
        InstallEvent::CleanupFailed { path, message } => {
            log_at!(
                level,
                "bridge::events::install",
                path = %path.display(),
                "Could not remove scratch data: {message}"
            );
        }
    }
}

fn log_sync(level: Level, event: &SyncEvent) {
    match event {
        SyncEvent::Started { install } => {
            log_at!(level, "bridge::events::sync", install = install, "Sync started");
        }
        SyncEvent::StatusReceived {
            updates_available,
            pending_count,
            packages,
        } => {
            log_at!(
                level,
                "bridge::events::sync",
                updates_available = updates_available,
                pending_count = pending_count,
                packages = packages,
                "Status received"
            );
        }
        SyncEvent::PackageSkipped { key } => {
            log_at!(level, "bridge::events::sync", key = %key, "Package has no source; skipped");
        }
        SyncEvent::PackageFinished { key, success, tag } => {
            log_at!(
                level,
                "bridge::events::sync",
                key = %key,
                success = success,
                "Package finished: {tag}"
            );
        }
        SyncEvent::Delegated {
            pending_before,
            check_only,
        } => {
            log_at!(
                level,
                "bridge::events::sync",
                pending_before = pending_before,
                check_only = check_only,
                "Delegated to external updater"
            );
        }
        SyncEvent::Completed {
            installed,
            failed,
            updated,
        } => {
            log_at!(
                level,
                "bridge::events::sync",
                installed = installed,
                failed = failed,
                updated = ?updated,
                "Sync completed"
            );
        }
        SyncEvent::Failed { failure } => {
            log_at!(
                level,
                "bridge::events::sync",
                code = ?failure.code,
                retryable = failure.retryable,
                "Sync failed: {}",
                failure.message
            );
        }
        SyncEvent::Rejected => {
            log_at!(level, "bridge::events::sync", "Sync already running; request rejected");
        }
    }
}

fn log_schedule(level: Level, event: &ScheduleEvent) {
    match event {
        ScheduleEvent::Armed {
            interval,
            first_run_in,
        } => {
            log_at!(
                level,
                "bridge::events::schedule",
                interval = %interval,
                first_run_in_secs = first_run_in.as_secs(),
                "Poll timer armed"
            );
        }
        ScheduleEvent::Cleared => {
            log_at!(level, "bridge::events::schedule", "Poll timer cleared");
        }
        ScheduleEvent::Fired { interval } => {
            log_at!(level, "bridge::events::schedule", interval = %interval, "Poll timer fired");
        }
    }
}
