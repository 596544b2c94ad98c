//! Worker binary

use anyhow::{Context, Result};
use clap::Parser;
use kv2pc::common::Config;
use kv2pc::WorkerServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "kv2pc-worker")]
#[command(about = "kv2pc worker - one replica of the key-value store")]
#[command(version)]
struct Args {
    /// Worker ID (unique identifier for this replica)
    #[arg(short, long, default_value = "worker-1")]
    id: String,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<String>,

    /// Concurrent commit tasks against the store
    #[arg(long)]
    pool_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load().context("failed to load configuration")?;

    let level = args.log_level.unwrap_or_else(|| config.log_level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut worker_config = config.worker.unwrap_or_default();
    if let Some(bind) = args.bind {
        worker_config.bind_addr = bind.parse()?;
    }
    if let Some(pool_size) = args.pool_size {
        worker_config.execution_pool_size = pool_size;
    }

    let server = WorkerServer::new(worker_config, args.id);
    if let Err(e) = server.serve().await {
        tracing::error!("Error starting worker: {}", e);
        return Err(e.into());
    }

    Ok(())
}
