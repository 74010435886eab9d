//! # pushgate
//!
//! Push gateway binary: loads settings, installs logging and metrics, and
//! serves WebSocket sessions until interrupted.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pushgate_auth::validator_from_settings;
use pushgate_server::config::ServerConfig;
use pushgate_server::server::PushServer;
use pushgate_settings::PushgateSettings;

/// pushgate server.
#[derive(Parser, Debug)]
#[command(name = "pushgate", about = "WebSocket push gateway")]
struct Cli {
    /// Settings file (defaults to `~/.pushgate/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Log level (overrides settings; `RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load_settings(&self) -> Result<PushgateSettings> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(pushgate_settings::settings_path);
        let mut settings = pushgate_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    pushgate_logging::init_subscriber(&settings.logging.level, settings.logging.json);

    let metrics = pushgate_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;
    let validator = validator_from_settings(&settings.auth);
    let config = ServerConfig::from(&settings);
    let shutdown_timeout = config.shutdown_timeout;

    let server = PushServer::new(config, validator, Some(metrics));
    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to bind listener")?;
    tracing::info!("pushgate listening on ws://{addr}/ws");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server
        .shutdown()
        .graceful_shutdown(vec![handle], Some(shutdown_timeout))
        .await;
    tracing::info!(sessions = server.registry().len(), "Shutdown complete");
    Ok(())
}
