//! bridge - remote update agent
//!
//! Polls a central authority for pending package updates and installs them,
//! either on a timer (`serve`), on an authenticated HTTP trigger, or on demand
//! from the command line.

mod cli;
mod display;
mod error;
mod logging;
mod server;
mod setup;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use crate::server::TriggerState;
use crate::setup::SystemSetup;
use bridge_config::ConfigStore;
use bridge_events::{AppEvent, EventEmitter, EventReceiver, GeneralEvent};
use bridge_ops::{OpsContextBuilder, OpsCtx};
use bridge_types::{checked_slug, PackageDescriptor};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Main application logic; `Ok(false)` means the command ran but failed
async fn run(cli: Cli) -> Result<bool, CliError> {
    info!("Starting bridge v{}", env!("CARGO_PKG_VERSION"));

    let config_path = setup::config_path(cli.global.config.as_deref())?;
    let config = setup::load_config(&config_path, cli.command.uses_env()).await?;

    let setup = SystemSetup::new(config_path, &config);
    if matches!(cli.command, Commands::Serve | Commands::Sync { .. } | Commands::Install { .. }) {
        setup.initialize().await?;
    }

    let (event_sender, event_receiver) = bridge_events::channel();
    let store = ConfigStore::new(config, Some(setup.config_path().to_path_buf()));
    let ctx = OpsContextBuilder::new()
        .with_config(store)
        .with_event_sender(event_sender)
        .build()?;

    let renderer = OutputRenderer::new(cli.global.json);
    let output = execute_command_with_events(cli.command, &ctx, setup.config_path(), event_receiver).await?;

    renderer.render(&output)?;
    info!("Command completed");
    Ok(output.is_success())
}

/// Execute command while draining events into the log
async fn execute_command_with_events(
    command: Commands,
    ctx: &OpsCtx,
    config_path: &Path,
    mut event_receiver: EventReceiver,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, ctx, config_path));

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    logging::log_event(&event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    logging::log_event(&event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(command: Commands, ctx: &OpsCtx, config_path: &Path) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Serve => {
            serve(ctx, config_path.to_path_buf()).await?;
            Ok(CommandOutput::Message("Stopped.".to_string()))
        }

        Commands::Sync { check_only } => {
            let result = bridge_ops::sync(ctx, check_only).await?;
            Ok(CommandOutput::Sync { result, check_only })
        }

        Commands::Install {
            repo,
            zip_url,
            branch,
            slug,
        } => {
            let descriptor = install_descriptor(repo, zip_url, branch, slug)?
                .with_access_token(ctx.config.snapshot().access_token());
            let outcome = bridge_ops::install(ctx, &descriptor).await;
            Ok(CommandOutput::Install(outcome))
        }

        Commands::Config(ConfigCommands::Show) => Ok(CommandOutput::Config(bridge_ops::show_config(ctx))),

        Commands::Config(ConfigCommands::Set { key, value }) => {
            let changed = bridge_ops::set_config(ctx, &key, &value).await?;
            let message = if changed {
                format!("Set {key}.")
            } else {
                format!("{key} unchanged.")
            };
            Ok(CommandOutput::Message(message))
        }
    }
}

fn install_descriptor(
    repo: Option<String>,
    zip_url: Option<String>,
    branch: Option<String>,
    slug: Option<String>,
) -> Result<PackageDescriptor, CliError> {
    let mut descriptor = match (repo, zip_url) {
        (Some(repo), None) => PackageDescriptor::from_repository(&repo)?,
        (None, Some(url)) => {
            let slug = slug
                .as_deref()
                .ok_or_else(|| CliError::InvalidArguments("--zip-url needs --slug".to_string()))?;
            PackageDescriptor::from_archive_url(slug, &url)?
        }
        _ => {
            return Err(CliError::InvalidArguments(
                "give exactly one of --repo or --zip-url".to_string(),
            ))
        }
    };
    if let Some(branch) = branch {
        descriptor = descriptor.with_branch(&branch);
    }
    if let Some(slug) = slug {
        descriptor.slug = checked_slug(&slug)?;
    }
    Ok(descriptor)
}

/// Run the poll timer and the trigger endpoint until Ctrl-C
async fn serve(ctx: &OpsCtx, config_path: PathBuf) -> Result<(), CliError> {
    let watcher = ctx.start_polling();
    let reloader = spawn_reloader(ctx.config.clone(), config_path, ctx.tx.clone());

    let listen = ctx.config.snapshot().trigger.listen;
    if ctx.config.snapshot().trigger.secret.trim().is_empty() {
        warn!("trigger.secret is not set; every trigger request will be rejected");
    }
    let app = server::router(TriggerState {
        orchestrator: Arc::clone(&ctx.orchestrator),
        config: ctx.config.clone(),
        tx: ctx.tx.clone(),
    });
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(addr = %listen, path = server::TRIGGER_PATH, "Trigger endpoint listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await;

    watcher.abort();
    if let Some(reloader) = reloader {
        reloader.abort();
    }
    ctx.scheduler.shutdown();
    served?;
    Ok(())
}

/// Reload the config file on SIGHUP; the scheduler follows through the store
#[cfg(unix)]
fn spawn_reloader(
    store: ConfigStore,
    path: PathBuf,
    tx: bridge_events::EventSender,
) -> Option<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!("Cannot listen for SIGHUP, reload disabled: {e}");
            return None;
        }
    };
    Some(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            match setup::load_config(&path, true).await {
                Ok(next) => {
                    if store.replace(next) {
                        tx.emit(AppEvent::General(GeneralEvent::ConfigurationReloaded {
                            source: path.display().to_string(),
                        }));
                    }
                }
                Err(e) => tx.emit_warning(format!("Config reload failed, keeping current settings: {e}")),
            }
        }
    }))
}

#[cfg(not(unix))]
fn spawn_reloader(
    _store: ConfigStore,
    _path: PathBuf,
    _tx: bridge_events::EventSender,
) -> Option<tokio::task::JoinHandle<()>> {
    None
}

fn log_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("bridge")
        .join("logs")
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = |default: &str| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if debug_enabled_flag {
        let dir = log_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Warning: Failed to create log directory: {e}");
        }
        let log_file = dir.join(format!("bridge-{}.log", chrono::Utc::now().format("%Y%m%d-%H%M%S")));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(filter("debug"))
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => eprintln!("Warning: Failed to create log file: {e}"),
        }
    }

    if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("info"))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("info"))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_types::ExposeSecret;

    #[test]
    fn repo_install_takes_branch_and_slug_override() {
        let descriptor = install_descriptor(
            Some("acme/Widget".into()),
            None,
            Some("develop".into()),
            Some("my widget".into()),
        )
        .unwrap();
        assert_eq!(descriptor.repository(), Some("acme/Widget"));
        assert_eq!(descriptor.branch, "develop");
        assert_eq!(descriptor.slug, "my-widget");
        assert!(descriptor.access_token.is_none());
    }

    #[test]
    fn zip_install_requires_slug() {
        assert!(install_descriptor(None, Some("https://x/a.zip".into()), None, None).is_err());
        let descriptor =
            install_descriptor(None, Some("https://x/a.zip".into()), None, Some("alpha".into())).unwrap();
        assert_eq!(descriptor.archive_url(), Some("https://x/a.zip"));
        assert_eq!(descriptor.slug, "alpha");
    }

    #[test]
    fn unusable_slug_override_is_rejected() {
        for slug in ["..", "  ", "///"] {
            let result = install_descriptor(Some("acme/widget".into()), None, None, Some(slug.into()));
            assert!(matches!(result, Err(CliError::Ops(_))), "{slug:?} was accepted");
        }
    }

    #[test]
    fn token_comes_from_configuration() {
        let descriptor = install_descriptor(Some("acme/widget".into()), None, None, None)
            .unwrap()
            .with_access_token(Some("tok123".to_string().into()));
        assert_eq!(
            descriptor.access_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("tok123".to_string())
        );
    }
}
