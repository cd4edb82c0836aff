use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod render;

use config::{ConfigLoader, OutputFormat};

#[derive(Parser)]
#[command(name = "sweetspot", about = "Live view of parameter-optimization experiments")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (overrides `display.format`)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an event stream and print the experiment summary
    Replay(commands::replay::ReplayArgs),
    /// Print the objective grid over two parameters
    Grid(commands::grid::GridArgs),
    /// Print parallel-coordinate dimensions
    Dimensions(commands::dimensions::DimensionsArgs),
    /// Print the measured and best-so-far series
    Trend(commands::trend::TrendArgs),
    /// Follow a live event stream until it ends or Ctrl-C
    Watch(commands::watch::WatchArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ConfigLoader::load()?;
    if let Some(format) = cli.format {
        config.display.format = format;
    }

    match cli.command {
        Commands::Replay(args) => commands::replay::run(args, &config).await,
        Commands::Grid(args) => commands::grid::run(args, &config).await,
        Commands::Dimensions(args) => commands::dimensions::run(args, &config).await,
        Commands::Trend(args) => commands::trend::run(args, &config).await,
        Commands::Watch(args) => commands::watch::run(args, &config).await,
        Commands::Config(args) => commands::config::run(args, &config),
    }
}
