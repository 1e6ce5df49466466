mod cli;
mod config;
mod gateway;
mod logging;
mod paths;
mod supervisor;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let cli = cli::Cli::parse();
    cli.execute().await
}
