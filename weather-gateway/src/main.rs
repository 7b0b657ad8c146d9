//! Binary crate for the `weather-gateway` service.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and layering configuration
//! - Logging setup
//! - The HTTP surface over `weather-core`

use clap::Parser;

mod cli;
mod logging;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    logging::init();
    cmd.run().await
}
