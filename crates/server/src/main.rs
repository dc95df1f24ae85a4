//! `mcr-server`: HTTP front end for the report data engine.

mod serve;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::serve::{ServerConfig, DEFAULT_MAX_BODY_BYTES};

/// Managed care report data service.
#[derive(Parser)]
#[command(name = "mcr-server", version, about = "Managed care report data service")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "MCR_PORT", default_value_t = 8080)]
    port: u16,

    /// JSON file of form templates and reports to preload
    #[arg(long, env = "MCR_SEED")]
    seed: Option<PathBuf>,

    /// Maximum accepted request body, in bytes
    #[arg(long, env = "MCR_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig {
        port: cli.port,
        seed: cli.seed,
        max_body_bytes: cli.max_body_bytes,
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to create tokio runtime");
            process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(serve::start_server(config)) {
        tracing::error!(error = %e, "server error");
        process::exit(1);
    }
}
