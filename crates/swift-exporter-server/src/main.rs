mod encoding;
mod http;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use swift_exporter_core::{ExporterConfig, SwiftExporter};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swift-exporter", about = "Prometheus exporter for Swift recon statistics")]
struct Cli {
    /// Address of the swift recon API
    #[arg(long, default_value = "http://127.0.0.1:6000")]
    swift_addr: String,

    /// Address to listen on for web interface and telemetry
    #[arg(long, default_value = "0.0.0.0:9500")]
    listen_address: String,

    /// Path under which to expose metrics
    #[arg(long, default_value = "/metrics")]
    telemetry_path: String,

    /// Per-request deadline for recon fetches in seconds, 0 to disable
    #[arg(long, default_value = "10")]
    scrape_timeout_secs: u64,

    /// Output verbose debug information
    #[arg(long, default_value_t = false)]
    debug: bool,
}

// The binary target compiles as crate `swift_exporter`, so that is the
// log target for everything in this crate.
fn log_filter(debug: bool) -> anyhow::Result<EnvFilter> {
    let level = if debug { "debug" } else { "info" };
    Ok(EnvFilter::from_default_env()
        .add_directive("info".parse()?)
        .add_directive(format!("swift_exporter={level}").parse()?)
        .add_directive(format!("swift_exporter_core={level}").parse()?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.debug)?)
        .init();

    let scrape_timeout = match cli.scrape_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let exporter = Arc::new(
        SwiftExporter::connect(ExporterConfig {
            swift_addr: cli.swift_addr.clone(),
            scrape_timeout,
        })
        .await?,
    );

    let app = http::router(Arc::new(http::AppState {
        exporter,
        telemetry_path: cli.telemetry_path.clone(),
    }));

    let listener = tokio::net::TcpListener::bind(&cli.listen_address).await?;
    info!(
        "providing metrics at {}{}",
        cli.listen_address, cli.telemetry_path
    );
    info!("connecting to swift host: {}", cli.swift_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
