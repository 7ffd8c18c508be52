use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use funcsweep::cli;
use funcsweep::Config;

#[derive(Parser)]
#[command(name = "funcsweep")]
#[command(version)]
#[command(about = "Extract every function of a C corpus into SQLite", long_about = None)]
struct Cli {
    /// Configuration document (TOML); the built-in sample is used when omitted
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The log level comes from the config, so the subscriber starts after it
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config.log_level);

    info!("funcsweep v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("{}", Config::describe_source(cli.config.as_deref()));

    cli::harvest::harvest(&config).await
}
