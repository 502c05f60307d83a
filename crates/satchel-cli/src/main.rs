//! Satchel CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod handlers;
mod host;

use commands::Commands;
use config::CliConfig;
use handlers::Runtime;

#[derive(Parser)]
#[command(name = "satchel")]
#[command(author, version, about = "Satchel offline delivery agent", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache partition directory
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.json);

    let config = CliConfig::load(cli.config.as_deref())?;
    let runtime = Runtime::new(&config, cli.store)?;

    match cli.command {
        Commands::Install => handlers::install(&runtime).await?,
        Commands::Route { request, method } => handlers::route(&runtime, &request, &method)?,
        Commands::Fetch { request } => handlers::fetch(&runtime, &request).await?,
        Commands::Partitions => handlers::partitions(&runtime).await?,
        Commands::Clear => handlers::clear(&runtime).await?,
        Commands::Message { json } => handlers::message(&runtime, &json).await?,
        Commands::Push { payload } => handlers::push(&runtime, payload.as_deref()).await?,
    }

    Ok(())
}
