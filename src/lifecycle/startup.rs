//! Startup orchestration.

use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{load_config, EdgeConfig};
use crate::config::watcher::ConfigWatcher;
use crate::http::EdgeServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};

/// Options taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// TOML configuration file; defaults apply when absent.
    pub config_path: Option<PathBuf>,
    /// Reload the experiment section when the file changes.
    pub watch: bool,
    /// Overrides `listener.bind_address`.
    pub bind_address: Option<String>,
}

/// Resolve the configuration described by `options`.
pub fn resolve_config(options: &StartupOptions) -> Result<EdgeConfig, Box<dyn std::error::Error>> {
    let mut config = match &options.config_path {
        Some(path) => load_config(path)?,
        None => EdgeConfig::default(),
    };
    if let Some(bind) = &options.bind_address {
        config.listener.bind_address = bind.clone();
    }
    Ok(config)
}

/// Start every subsystem and serve until a shutdown signal arrives.
pub async fn run(options: StartupOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&options)?;

    logging::init(&config.observability.log_level);
    tracing::info!("variant-edge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        variants_url = %config.experiment.variants_url,
        cookie_name = %config.experiment.cookie_name,
        custom_data = config.experiment.custom_data.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&options.config_path, options.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_shutdown().await;
        shutdown.trigger();
    });

    let server = EdgeServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
