//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod collect;
pub mod config;
pub mod convert;
pub mod records;
pub mod resolve;
pub mod serve;
pub mod status;

use crate::config::defaults::DEFAULT_LOG_LEVEL;
use crate::config::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Device position collector with Chinese map datum support
#[derive(Parser)]
#[command(name = "geocollect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start web server (foreground)
    Serve(serve::ServeArgs),

    /// Convert a WGS84 coordinate to GCJ02 and BD09
    Convert(convert::ConvertArgs),

    /// Reverse-geocode a coordinate with every provider
    Resolve(resolve::ResolveArgs),

    /// Run one collection: locate, resolve and save
    Collect(collect::CollectArgs),

    /// Show stored records
    Records(records::RecordsArgs),

    /// Show configuration and server status
    Status(status::StatusArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Run the CLI
pub async fn run() -> crate::error::Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Convert(args) => convert::run(args),
        Commands::Resolve(args) => resolve::run(args).await,
        Commands::Collect(args) => collect::run(args).await,
        Commands::Records(args) => records::run(args),
        Commands::Status(args) => status::run(args).await,
        Commands::Config(args) => config::run(args),
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins; otherwise the configured `logging.level` applies. Logs
/// go to stderr so command output stays pipeable.
fn init_logging() {
    let level = Config::load()
        .map(|config| config.logging.level)
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
