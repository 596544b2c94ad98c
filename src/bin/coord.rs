//! Coordinator binary

use anyhow::Context;
use clap::{Parser, Subcommand};
use kv2pc::common::{parse_duration, Config};
use kv2pc::Coordinator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kv2pc-coord")]
#[command(about = "kv2pc two-phase commit coordinator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start coordinator server
    Serve {
        /// Node ID used in logs and health checks
        #[arg(long, default_value = "coordinator")]
        id: String,

        /// Bind address for the client API
        #[arg(long)]
        bind: Option<String>,

        /// Worker addresses (comma-separated host:port)
        #[arg(long, value_delimiter = ',')]
        workers: Vec<String>,

        /// Concurrent outbound worker calls
        #[arg(long)]
        pool_size: Option<usize>,

        /// Per worker call timeout (e.g. 500ms, 30s)
        #[arg(long)]
        call_timeout: Option<String>,

        /// Log level (trace, debug, info, warn, error)
        #[arg(long)]
        log_level: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config from file, then override with CLI arguments
    let config = Config::load().context("failed to load configuration")?;

    match cli.command {
        Commands::Serve {
            id,
            bind,
            workers,
            pool_size,
            call_timeout,
            log_level,
        } => {
            let level = log_level.unwrap_or_else(|| config.log_level.clone());
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| level.into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            let mut coord_config = config.coordinator.unwrap_or_default();
            if let Some(bind) = bind {
                coord_config.bind_addr = bind.parse()?;
            }
            if !workers.is_empty() {
                coord_config.workers = workers;
            }
            if let Some(pool_size) = pool_size {
                coord_config.dispatch_pool_size = pool_size;
            }
            if let Some(timeout) = call_timeout {
                let millis = u64::try_from(parse_duration(&timeout)?.as_millis())
                    .map_err(|_| anyhow::anyhow!("call timeout too large: {}", timeout))?;
                coord_config.call_timeout_ms = Some(millis);
            }

            let coord = Coordinator::new(coord_config, id);
            if let Err(e) = coord.serve().await {
                tracing::error!("Coordinator failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
