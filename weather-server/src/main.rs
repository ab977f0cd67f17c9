//! Binary crate for the `weather-server` command.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration of the provider credential
//! - Starting the HTTP API

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
