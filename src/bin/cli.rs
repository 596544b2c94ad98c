//! Client CLI

use clap::{Parser, Subcommand};
use kv2pc::CoordinatorClient;

#[derive(Parser)]
#[command(name = "kv2pc")]
#[command(about = "kv2pc replicated key-value store CLI")]
#[command(version)]
struct Cli {
    /// Coordinator address
    #[arg(long, default_value = "http://localhost:5000")]
    coordinator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a value
    Put { key: String, value: String },

    /// Read a value
    Get { key: String },

    /// Remove a key
    Delete { key: String },

    /// Send a command verbatim (e.g. `raw PUT k v`)
    Raw {
        verb: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show coordinator health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = CoordinatorClient::new(&cli.coordinator)?;

    let (verb, args) = match cli.command {
        Commands::Put { key, value } => ("PUT".to_string(), vec![key, value]),
        Commands::Get { key } => ("GET".to_string(), vec![key]),
        Commands::Delete { key } => ("DELETE".to_string(), vec![key]),
        Commands::Raw { verb, args } => (verb, args),
        Commands::Health => {
            let health = client.health().await?;
            println!("Coordinator {}: {}", health.node, health.status);
            if let Some(workers) = health.workers {
                println!("  Workers: {}", workers);
            }
            return Ok(());
        }
    };

    let result = client.handle_command(&verb, &args).await?;
    println!("{}", result);

    Ok(())
}
