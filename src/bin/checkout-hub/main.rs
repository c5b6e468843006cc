//! checkout-hub entry point.

mod cli;

use anyhow::Context;
use checkout_hub::{create_router, AppState, HubConfig, PermissionStore};
use clap::Parser;
use cli::{Cli, HubCommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("checkout-hub v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(HubCommand::Serve) {
        HubCommand::Serve => serve(config).await?,
        HubCommand::WriteConfig { path } => {
            config.to_file(&path)?;
            info!("configuration written to {}", path.display());
        }
        HubCommand::ResetPermissions => {
            let store = PermissionStore::init(config.permissions.clone()).await?;
            store.close().await;
            store.delete_database().await?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<HubConfig> {
    let mut config = match &cli.config {
        Some(path) => HubConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => HubConfig::default(),
    };

    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    if let Some(database) = &cli.database {
        config.permissions.database_path = database.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

async fn serve(config: HubConfig) -> anyhow::Result<()> {
    let permissions = PermissionStore::init(config.permissions.clone())
        .await
        .context("opening the permission store")?;
    let app = create_router(AppState::new(permissions.clone()));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    permissions.close().await;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
    }
}
