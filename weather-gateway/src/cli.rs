use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use weather_core::{Config, Upstream, WeatherService, parse_range};

use crate::routes;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-gateway", version, about = "Weather aggregation gateway")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    Temperatures,
    Speeds,
    Weather,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP gateway.
    Serve {
        /// Port to listen on; overrides config and $PORT.
        #[arg(long)]
        port: Option<u16>,

        #[command(flatten)]
        upstreams: UpstreamArgs,
    },

    /// Fetch a date range once and print it as JSON.
    Fetch {
        resource: ResourceKind,

        /// First day, e.g. 2018-08-01T00:00:00Z.
        #[arg(long)]
        start: String,

        /// Last day (inclusive), e.g. 2018-08-07T00:00:00Z.
        #[arg(long)]
        end: String,

        #[command(flatten)]
        upstreams: UpstreamArgs,
    },

    /// Write upstream URLs and client limits to the config file.
    Configure {
        #[command(flatten)]
        upstreams: UpstreamArgs,

        /// Per-request timeout for upstream calls.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Maximum concurrent requests to each upstream.
        #[arg(long)]
        max_connections_per_host: Option<usize>,
    },
}

/// Base URL overrides, applied after the config file and environment.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct UpstreamArgs {
    /// Temperature upstream base URL.
    #[arg(long)]
    pub temperature_url: Option<String>,

    /// Wind-speed upstream base URL.
    #[arg(long)]
    pub windspeed_url: Option<String>,
}

impl UpstreamArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.temperature_url {
            config.set_base_url(Upstream::Temperature, url.clone());
        }
        if let Some(url) = &self.windspeed_url {
            config.set_base_url(Upstream::WindSpeed, url.clone());
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let file_config = self.load_file_config()?;

        match self.command {
            Command::Serve { port, upstreams } => {
                let mut config = with_env(file_config)?;
                upstreams.apply(&mut config);
                if let Some(port) = port {
                    config.port = port;
                }
                routes::serve(&config).await
            }
            Command::Fetch {
                resource,
                start,
                end,
                upstreams,
            } => {
                let mut config = with_env(file_config)?;
                upstreams.apply(&mut config);
                fetch(&config, resource, &start, &end).await
            }
            Command::Configure {
                upstreams,
                timeout_secs,
                max_connections_per_host,
            } => {
                let mut config = file_config;
                upstreams.apply(&mut config);
                if let Some(timeout_secs) = timeout_secs {
                    config.client.timeout_secs = timeout_secs;
                }
                if let Some(max) = max_connections_per_host {
                    config.client.max_connections_per_host = max;
                }
                config.validate()?;

                let path = match &self.config {
                    Some(path) => {
                        config.save_to(path)?;
                        path.clone()
                    }
                    None => config.save()?,
                };
                println!("Configuration saved to {}", path.display());
                Ok(())
            }
        }
    }

    fn load_file_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }
}

fn with_env(mut config: Config) -> anyhow::Result<Config> {
    config.apply_env()?;
    Ok(config)
}

async fn fetch(
    config: &Config,
    resource: ResourceKind,
    start: &str,
    end: &str,
) -> anyhow::Result<()> {
    let range = parse_range(Some(start), Some(end))?;
    let service = WeatherService::from_config(config)?;

    let json = match resource {
        ResourceKind::Temperatures => {
            serde_json::to_string_pretty(&service.temperatures(range).await?)
        }
        ResourceKind::Speeds => serde_json::to_string_pretty(&service.speeds(range).await?),
        ResourceKind::Weather => serde_json::to_string_pretty(&service.weather(range).await?),
    }
    .context("Failed to serialize response")?;

    println!("{json}");
    Ok(())
}
