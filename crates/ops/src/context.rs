//! Operations context for dependency injection

use bridge_config::ConfigStore;
use bridge_errors::Error;
use bridge_events::EventSender;
use bridge_install::{InstallPaths, Installer, SlotFilesystem};
use bridge_net::{NetClient, NetConfig, PackageFetcher, SourceEndpoints};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::orchestrator::SyncOrchestrator;
use crate::scheduler::{spawn_config_watcher, PollScheduler};
use crate::status::StatusClient;
use crate::updater::ExternalUpdater;

/// Operations context providing access to all agent components
pub struct OpsCtx {
    /// Live configuration
    pub config: ConfigStore,
    /// Network client shared by status calls and downloads
    pub net: NetClient,
    /// Install transaction runner
    pub installer: Installer,
    /// Sync run coordinator
    pub orchestrator: Arc<SyncOrchestrator>,
    /// Poll timer
    pub scheduler: Arc<PollScheduler>,
    /// Event sender for progress reporting
    pub tx: EventSender,
}

impl std::fmt::Debug for OpsCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpsCtx")
            .field("installer", &self.installer)
            .field("orchestrator", &self.orchestrator)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl OpsCtx {
    /// Arm the poll timer and keep it in line with configuration changes
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start_polling(&self) -> JoinHandle<()> {
        spawn_config_watcher(&self.config, Arc::clone(&self.scheduler))
    }
}

/// Builder for [`OpsCtx`]
#[derive(Default)]
pub struct OpsContextBuilder {
    config: Option<ConfigStore>,
    tx: Option<EventSender>,
    net: Option<NetClient>,
    updater: Option<Arc<dyn ExternalUpdater>>,
    filesystem: Option<Arc<dyn SlotFilesystem>>,
    first_delay: Option<Duration>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration store
    #[must_use]
    pub fn with_config(mut self, config: ConfigStore) -> Self {
        self.config = Some(config);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Set network client; built from configuration when omitted
    #[must_use]
    pub fn with_net(mut self, net: NetClient) -> Self {
        self.net = Some(net);
        self
    }

    /// Delegate updates to an external updater
    #[must_use]
    pub fn with_updater(mut self, updater: Arc<dyn ExternalUpdater>) -> Self {
        self.updater = Some(updater);
        self
    }

    /// Replace the filesystem used for slot swaps
    #[must_use]
    pub fn with_filesystem(mut self, fs: Arc<dyn SlotFilesystem>) -> Self {
        self.filesystem = Some(fs);
        self
    }

    /// Override the delay before the first scheduled poll
    #[must_use]
    pub fn with_first_delay(mut self, delay: Duration) -> Self {
        self.first_delay = Some(delay);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if a required component is missing or the network
    /// client cannot be created.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let config = self
            .config
            .ok_or_else(|| Error::internal("missing component: config"))?;
        let tx = self
            .tx
            .ok_or_else(|| Error::internal("missing component: event_sender"))?;

        let snapshot = config.snapshot();
        let net = match self.net {
            Some(net) => net,
            None => NetClient::new(NetConfig::from_config(&snapshot))?,
        };

        let fetcher = PackageFetcher::new(net.clone(), SourceEndpoints::from_config(&snapshot.github))
            .with_timeout(snapshot.download_timeout())
            .with_event_sender(tx.clone());
        let paths = InstallPaths {
            install_root: snapshot.install_root(),
            scratch_dir: snapshot.scratch_dir(),
        };
        let mut installer = Installer::new(fetcher, paths).with_event_sender(tx.clone());
        if let Some(fs) = self.filesystem {
            installer = installer.with_filesystem(fs);
        }

        let status = StatusClient::new(net.clone(), snapshot.status_timeout());
        let orchestrator = Arc::new(SyncOrchestrator::new(
            config.clone(),
            status,
            installer.clone(),
            self.updater,
            tx.clone(),
        ));

        let mut scheduler = PollScheduler::new(orchestrator.clone()).with_event_sender(tx.clone());
        if let Some(delay) = self.first_delay {
            scheduler = scheduler.with_first_delay(delay);
        }

        Ok(OpsCtx {
            config,
            net,
            installer,
            orchestrator,
            scheduler: Arc::new(scheduler),
            tx,
        })
    }
}
