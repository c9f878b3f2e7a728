#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use taskpush::Config;
use taskpush::app::dispatch::dispatch;
use taskpush::cli::Cli;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_or_init_at(path)?,
        None => Config::load_or_init()?,
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.tracing_level()
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to install log subscriber: {e}");
    }

    dispatch(cli, config).await
}
