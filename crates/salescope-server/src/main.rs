//! Salescope server binary.
//!
//! Wires the real collaborators (completion service, sandbox service) into
//! the query pipeline and serves it over HTTP. Both API keys are read from
//! the environment at startup; a missing key fails fast with a descriptive
//! error instead of attempting partial execution later.

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use salescope_core::{QueryPipeline, Settings};
use salescope_server::{shutdown_signal, QueryServer, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Salescope - natural-language sales analysis server")]
struct Cli {
    #[clap(long, default_value = "127.0.0.1:8000")]
    bind_addr: String,

    #[clap(long, default_value = "data/sales.csv", help = "Path to the sales dataset file")]
    dataset: PathBuf,

    #[clap(long, short, default_value = "info")]
    log_level: String,

    #[clap(long, help = "Disable CORS headers")]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let settings = Settings::from_env().map_err(|e| anyhow::anyhow!("{}", e))?;
    log::info!("Configuration loaded, using model {}", settings.model);

    if !cli.dataset.exists() {
        log::warn!(
            "Dataset file {} does not exist yet; requests will fail until it is present",
            cli.dataset.display()
        );
    }

    let pipeline = QueryPipeline::from_settings(&settings, cli.dataset);

    let bind_socket_addr: SocketAddr = cli
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", cli.bind_addr, e))?;

    let server_config = ServerConfig::default()
        .with_bind_addr(bind_socket_addr)
        .with_cors(!cli.no_cors)
        .with_logging(true);

    log::info!("Starting Salescope server on {}...", bind_socket_addr);

    let server = QueryServer::with_config(pipeline, server_config);
    server.serve_with_shutdown(shutdown_signal()).await
}
