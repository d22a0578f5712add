use anyhow::Context;
use clap::{Parser, Subcommand};
use eden_core::config::DEFAULT_CONFIG_FILE;
use eden_core::{DeviceCatalog, EdenConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod app;
mod http;
mod probe;
mod ws;

#[derive(Debug, Parser)]
#[command(name = "eden-gateway", version, about = "Smoke alert ingest and live broadcast gateway")]
struct Cli {
    /// Config file (default: ./eden.toml).
    #[arg(long, global = true, env = "EDEN_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the gateway (default).
    Serve,
    /// Post one sample alert to a running gateway.
    SendTestAlert(probe::TestAlertArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "eden_gateway=info,eden_broadcast=info,eden_core=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config.as_deref()).await,
        Command::SendTestAlert(args) => probe::send_test_alert(args).await,
    }
}

/// Config plus the device catalog it describes. Any parse or validation
/// failure stops startup.
fn load_settings(config_path: Option<&str>) -> anyhow::Result<(EdenConfig, DeviceCatalog)> {
    let config = EdenConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.unwrap_or(DEFAULT_CONFIG_FILE)))?;
    let catalog = config.catalog()?;
    Ok((config, catalog))
}

async fn serve(config_path: Option<&str>) -> anyhow::Result<()> {
    let (config, catalog) = load_settings(config_path)?;

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!(
        max_viewers = config.broadcast.max_connections,
        send_timeout_ms = config.broadcast.send_timeout_ms,
        devices = catalog.len(),
        dashboard = config.dashboard.static_dir.as_deref().unwrap_or("-"),
        "gateway configured"
    );

    let state = Arc::new(app::AppState::new(config, catalog));
    let router = app::build_router(Arc::clone(&state));

    info!("EDEN gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let state_for_shutdown = Arc::clone(&state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "ctrl-c handler failed");
                std::future::pending::<()>().await;
            }
            info!(
                viewers = state_for_shutdown.registry.len(),
                "shutdown requested, closing viewer connections"
            );
            state_for_shutdown.begin_shutdown();
        })
        .await?;

    let delivery = state.dispatcher.counters();
    info!(
        dispatches = delivery.dispatches,
        delivered = delivery.delivered,
        failed = delivery.failed,
        "gateway stopped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(toml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn bad_device_table_stops_startup() {
        let file = config_file(
            "[gateway]\nport = 9100\n\n[[devices]]\nnode_id = \"D-1\"\ntype = \"Drone\"\nlocation = { lat = 1.0, lon = 2.0 }\n",
        );
        let err = load_settings(file.path().to_str()).unwrap_err();
        assert!(format!("{err:#}").contains("Configuration error"));
    }

    #[test]
    fn out_of_range_device_stops_startup() {
        let file = config_file(
            "[[devices]]\nnode_id = \"Cam-9\"\ntype = \"Camera\"\nlocation = { lat = 95.0, lon = 2.0 }\n",
        );
        assert!(load_settings(file.path().to_str()).is_err());
    }

    #[test]
    fn named_file_is_used_as_is() {
        let file = config_file(
            "[gateway]\nport = 9100\n\n[[devices]]\nnode_id = \"Cam-9\"\ntype = \"Camera\"\nlocation = { lat = 1.0, lon = 2.0 }\n",
        );
        let (config, catalog) = load_settings(file.path().to_str()).unwrap();
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(catalog.len(), 1);
    }
}
