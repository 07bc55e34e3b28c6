//! wxgate CLI
//!
//! Command-line access to NOAA and Open-Meteo through the cached, retrying gateway.

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use colored::*;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wxgate_client::{Config, WeatherGateway};
use wxgate_core::{Coordinates, ErrorReport, ProviderId, Query, WeatherError};

/// wxgate - resilient weather data access
#[derive(Parser)]
#[command(name = "wxgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Provider to query (noaa or open-meteo)
    #[arg(
        short,
        long,
        global = true,
        env = "WXGATE_PROVIDER",
        default_value = "open-meteo"
    )]
    provider: ProviderId,

    /// Issue the same query this many times
    #[arg(long, global = true, default_value_t = 1)]
    repeat: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct Location {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
}

impl Location {
    fn coords(self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the forecast grid for a point (NOAA)
    Grid {
        #[command(flatten)]
        location: Location,
    },

    /// List observation stations near a point (NOAA)
    Stations {
        #[command(flatten)]
        location: Location,
    },

    /// Daily forecast
    Forecast {
        #[command(flatten)]
        location: Location,
        /// Forecast horizon in days
        #[arg(short, long, default_value_t = 7)]
        days: u8,
    },

    /// Latest observed conditions
    Current {
        #[command(flatten)]
        location: Location,
    },

    /// Active weather alerts (NOAA)
    Alerts {
        #[command(flatten)]
        location: Location,
    },

    /// Daily historical records (Open-Meteo)
    History {
        #[command(flatten)]
        location: Location,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
    },

    /// Probe the provider once
    Status,
}

impl Commands {
    fn query(&self) -> Option<Query> {
        let query = match *self {
            Commands::Grid { location } => Query::GridPoint {
                coords: location.coords(),
            },
            Commands::Stations { location } => Query::Stations {
                coords: location.coords(),
            },
            Commands::Forecast { location, days } => Query::Forecast {
                coords: location.coords(),
                days,
            },
            Commands::Current { location } => Query::CurrentConditions {
                coords: location.coords(),
            },
            Commands::Alerts { location } => Query::Alerts {
                coords: location.coords(),
            },
            Commands::History {
                location,
                start,
                end,
            } => Query::Historical {
                coords: location.coords(),
                start,
                end,
            },
            Commands::Status => return None,
        };
        Some(query)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "wxgate_client=debug,wxgate_cli=debug,info"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    debug!(?config, "Loaded configuration");
    let gateway =
        WeatherGateway::from_config(&config).context("Failed to build weather gateway")?;

    match cli.command.query() {
        Some(query) => cmd_fetch(&gateway, cli.provider, &query, cli.repeat).await,
        None => cmd_status(&gateway, cli.provider).await,
    }
}

/// Run a query `repeat` times and print the result
async fn cmd_fetch(
    gateway: &WeatherGateway,
    provider: ProviderId,
    query: &Query,
    repeat: u32,
) -> Result<ExitCode> {
    println!(
        "{} {} from {}",
        "Fetching".cyan().bold(),
        query.name(),
        provider.display_name()
    );

    let mut last = None;
    for round in 1..=repeat.max(1) {
        match gateway.fetch(provider, query).await {
            Ok(fetched) => {
                let source = if fetched.from_cache {
                    "cache".green().to_string()
                } else {
                    format!("upstream, {} attempt(s)", fetched.attempts)
                        .yellow()
                        .to_string()
                };
                let ttl = fetched
                    .ttl
                    .map(|ttl| format!(", cached for {ttl}"))
                    .unwrap_or_default();
                println!(
                    "   {} #{round}: {source}{}",
                    "Request".dimmed(),
                    ttl.dimmed()
                );
                last = Some(fetched.value);
            }
            Err(err) => {
                print_error(&err);
                print_cache_stats(gateway);
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    if let Some(value) = last {
        println!("\n{}", serde_json::to_string_pretty(&value)?);
    }
    print_cache_stats(gateway);

    Ok(ExitCode::SUCCESS)
}

/// Probe the provider
async fn cmd_status(gateway: &WeatherGateway, provider: ProviderId) -> Result<ExitCode> {
    let status = gateway.status(provider).await;

    if status.operational {
        println!("{} {}", "OK".green().bold(), status.message);
    } else {
        println!("{} {}", "DOWN".red().bold(), status.message);
    }
    println!(
        "   {} {}",
        "Checked:".dimmed(),
        status.last_checked.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(if status.operational {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_error(err: &WeatherError) {
    let report = ErrorReport::from(err);

    eprintln!(
        "\n{} {}",
        format!("Error ({}):", report.kind).red().bold(),
        report.message
    );
    for reference in &report.help {
        eprintln!("   {} {}", "-".dimmed(), reference);
    }
    if report.retryable {
        eprintln!("   {}", "This failure is temporary; try again later.".yellow());
    }
}

fn print_cache_stats(gateway: &WeatherGateway) {
    match gateway.cache_stats() {
        Some(stats) => println!("\n{} {}", "Cache:".cyan().bold(), stats),
        None => println!("\n{} disabled", "Cache:".cyan().bold()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_forecast_with_negative_longitude() {
        let cli = Cli::try_parse_from([
            "wxgate", "--provider", "noaa", "forecast", "--lat", "47.6", "--lon", "-122.3",
            "--days", "3",
        ])
        .unwrap();

        assert_eq!(cli.provider, ProviderId::Noaa);
        assert_eq!(
            cli.command.query(),
            Some(Query::Forecast {
                coords: Coordinates::new(47.6, -122.3),
                days: 3,
            })
        );
    }

    #[test]
    fn test_history_dates_and_repeat() {
        let cli = Cli::try_parse_from([
            "wxgate", "history", "--lat", "40", "--lon", "-105", "--start", "2024-01-01",
            "--end", "2024-01-07", "--repeat", "3",
        ])
        .unwrap();

        assert_eq!(cli.repeat, 3);
        assert!(matches!(cli.command.query(), Some(Query::Historical { .. })));
    }

    #[test]
    fn test_status_has_no_query() {
        let cli = Cli::try_parse_from(["wxgate", "status"]).unwrap();
        assert!(cli.command.query().is_none());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(Cli::try_parse_from(["wxgate", "--provider", "metoffice", "status"]).is_err());
    }
}
