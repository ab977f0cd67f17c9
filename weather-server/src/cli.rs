use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use std::path::{Path, PathBuf};
use weather_core::Config;
use weather_server::web;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Weather dashboard API server")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        /// Listen address, e.g. "127.0.0.1:8080". Overrides config and environment.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Store the OpenWeather API key in the config file.
    Configure {
        /// Key to store; prompted for when absent.
        #[arg(long)]
        api_key: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let Cli { config, command } = self;

        match command {
            Command::Serve { bind } => {
                let mut cfg = load_config(config.as_deref())?.with_env_overrides(std::env::vars());
                if let Some(bind) = bind {
                    cfg.server.bind = bind;
                }
                cfg.validate()?;

                web::init_tracing(&cfg.server.log_level);
                web::run(cfg).await
            }
            Command::Configure { api_key } => {
                let mut cfg = load_config(config.as_deref())?;

                let api_key = match api_key {
                    Some(key) => key,
                    None => Password::new("OpenWeather API key:")
                        .with_display_mode(PasswordDisplayMode::Masked)
                        .without_confirmation()
                        .prompt()
                        .context("Failed to read API key")?,
                };

                if api_key.trim().is_empty() {
                    bail!("API key must not be empty");
                }
                cfg.set_api_key(api_key);

                let path = match config {
                    Some(path) => {
                        cfg.save_to(&path)?;
                        path
                    }
                    None => cfg.save()?,
                };
                println!("Saved configuration to {}", path.display());
                Ok(())
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
