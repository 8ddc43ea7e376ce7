//! Octoparse connector command-line entry point.
//!
//! Thin wiring only: logging setup, `.env` loading, argument parsing. All
//! behavior lives in [`commands`] and the `octoparse-client` crate.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean JSON for piping.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables from a .env file when present.
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(_) => tracing::debug!("no .env file found"),
    }

    commands::run(Cli::parse()).await
}
