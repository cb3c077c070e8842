//! Storyboard CLI
//!
//! Command-line interface for the storyboard engine.

use clap::Parser;
use env_logger::Env;
use log::info;

use storyboard_engine::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Storyboard CLI v{}", env!("CARGO_PKG_VERSION"));

    cli::commands::run(cli).await
}
