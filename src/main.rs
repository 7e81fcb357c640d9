//! hostwatch - remote control bot for a single Linux host
//!
//! A small Telegram bot exposing uptime, temperature, disk and memory
//! probes plus a confirmation-gated reboot to one authorized operator.

use anyhow::Result;
use clap::Parser;
use hostwatch::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment,
    // and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        // Logging is not configured yet; bring up a bare subscriber for
        // this one error.
        tracing_subscriber::fmt().init();
        error!("Failed to load configuration: {err:#}");
        std::process::exit(1);
    });

    // Initialize logging. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("hostwatch starting up...");

    // Log the loaded configuration settings for visibility
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Telegram API: {}", config.telegram.api_url);
    info!("Poll Timeout: {}s", config.telegram.poll_timeout_seconds);
    if let Some(id) = config.telegram.authorized_user {
        info!("Authorized User: {id}");
    }
    info!("Uptime Source: {}", config.probes.uptime_path.display());
    info!("Thermal Source: {}", config.probes.thermal_path.display());
    info!("Meminfo Source: {}", config.probes.meminfo_path.display());
    info!("Disk Mount: {}", config.probes.disk_mount.display());
    info!("Reboot Command: {}", config.reboot.command.join(" "));
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = match App::builder(config).build(shutdown_rx).await {
        Ok(app) => app,
        Err(err) => {
            error!("Failed to initialize: {err:#}");
            std::process::exit(1);
        }
    };

    let app_task = tokio::spawn(app.run());

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");

    shutdown_tx
        .send(true)
        .expect("Failed to send shutdown signal");

    app_task.await??;
    info!("Exiting.");

    Ok(())
}
