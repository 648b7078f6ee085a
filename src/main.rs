mod cli;
mod driver;
mod error;
mod model;
mod naming;
mod progress;
mod queue;
mod wizard;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();
    cli::run(args).await
}
