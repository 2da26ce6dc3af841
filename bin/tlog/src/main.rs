use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use jsonrpsee::server::ServerBuilder;
use tlog::initialize_logging;
use tlog_backend::server::rpc_module;
use tlog_backend::MemoryBackend;
use tlog_common::rpc::get_cors_layer;
use tlog_common::{from_toml_path, FromEnv, LogNodeConfig};
use tlog_server::LogNode;
use tracing::{info, instrument};

/// Runs a transparency log front-end that collects witness cosignatures,
/// or a standalone in-memory tree backend for it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What to run.
    #[arg(long, default_value = "log")]
    mode: Mode,

    /// The path to the log node config. Read from the environment when not set.
    #[arg(long)]
    config_path: Option<String>,

    /// Address the backend JSON-RPC server listens on, in backend mode.
    #[arg(long, default_value = "127.0.0.1:6281")]
    backend_addr: SocketAddr,

    /// Logging verbosity
    #[arg(long, short = 'v', action = clap::ArgAction::Count, default_value = "2")]
    verbose: u8,
    /// Logging verbosity
    #[arg(long, short = 'q', action)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum Mode {
    /// The cosigning front-end
    Log,
    /// An in-memory tree served over JSON-RPC
    Backend,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let mut args = Args::parse();

    if args.quiet {
        args.verbose = 0;
    }
    let logging_level = match args.verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        4 => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };
    initialize_logging(logging_level);

    match args.mode {
        Mode::Log => {
            let config: LogNodeConfig = match args.config_path {
                Some(path) => {
                    from_toml_path(path).context("Failed to read log node configuration")?
                }
                None => LogNodeConfig::from_env()
                    .context("Failed to read log node configuration from environment")?,
            };
            start_log(config).await
        }
        Mode::Backend => start_backend(args.backend_addr).await,
    }
}

#[instrument(level = "trace", skip_all, err)]
async fn start_log(config: LogNodeConfig) -> Result<(), anyhow::Error> {
    let node = LogNode::new(config)
        .await
        .context("Could not start log node")?;
    node.run().await
}

#[instrument(level = "trace", err)]
async fn start_backend(listen_address: SocketAddr) -> Result<(), anyhow::Error> {
    let methods = rpc_module(Arc::new(MemoryBackend::new()))?;
    let middleware = tower::ServiceBuilder::new().layer(get_cors_layer());

    let server = ServerBuilder::default()
        .set_http_middleware(middleware)
        .build([listen_address].as_ref())
        .await
        .context("Could not start backend RPC server")?;
    let bound_address = server.local_addr()?;
    info!("Starting backend RPC server at {}", bound_address);

    let handle = server.start(methods);
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.stop()?;
    handle.stopped().await;
    Ok(())
}
