use anyhow::Result;
use clap::Parser;
use olx_relay::cli::Cli;
use olx_relay::gateway::{GatewayParams, start_server};
use olx_relay::services::ServiceContext;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = olx_relay::config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);
    settings.validate()?;

    if cli.print_config {
        println!("{}", settings.to_toml()?);
        return Ok(());
    }

    // Held until exit so buffered file logs are flushed.
    let _log_guard = olx_relay::logging::init(&settings.logging)?;

    tracing::info!(version = olx_relay::VERSION, "Starting olx-relay");
    if settings.push.bot_token.is_empty() {
        tracing::warn!("push.bot_token is not set; every push will fail until it is configured");
    }

    let services = ServiceContext::from_settings(&settings)?;
    let shutdown = CancellationToken::new();

    let scheduler = if settings.scheduler.enabled {
        Some(
            services
                .scheduler(&settings.scheduler)
                .spawn_with_token(shutdown.child_token()),
        )
    } else {
        tracing::info!("Poll scheduler disabled in config");
        None
    };

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        signal_token.cancel();
    });

    let params = GatewayParams::from(&settings.server);
    let served = start_server(&params, services, shutdown.clone()).await;
    if served.is_err() {
        shutdown.cancel();
    }

    // With the gateway disabled, keep running the poll loop until signalled.
    shutdown.cancelled().await;
    if let Some(handle) = scheduler {
        handle.shutdown().await;
    }

    tracing::info!("olx-relay stopped");
    served
}
