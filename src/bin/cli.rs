//! Weather Station CLI
//!
//! Talks to a running weather station over HTTP:
//! - Push a reading (stands in for the sensor device)
//! - Show the latest reading or the trailing history
//! - Generate a default config file

use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use weather_station::config::generate_default_config;
use weather_station::storage::Measurement;

#[derive(Parser)]
#[command(name = "weather-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Push and inspect weather station readings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:3001", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a reading, as the sensor device would
    Push {
        /// Temperature
        #[arg(allow_negative_numbers = true)]
        temperature: f64,
        /// Relative humidity
        humidity: f64,
    },

    /// Show the most recent reading
    Current,

    /// Show readings from the trailing window
    History,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct PushBody {
    temperature: f64,
    humidity: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.api_url.trim_end_matches('/');

    match cli.command {
        Commands::Push {
            temperature,
            humidity,
        } => {
            let response = client
                .post(format!("{}/api/weather/update", base))
                .json(&PushBody {
                    temperature,
                    humidity,
                })
                .send()
                .await
                .context("Failed to reach weather station")?;

            let status = response.status();
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            if !status.is_success() {
                bail!("Server returned {}: {}", status, error_message(&body));
            }
            println!("Sent {:.1}° / {:.1}%", temperature, humidity);
        }

        Commands::Current => {
            let latest: Option<Measurement> = fetch(&client, base, "current").await?;
            match (latest, cli.format.as_str()) {
                (latest, "json") => println!("{}", serde_json::to_string_pretty(&latest)?),
                (Some(m), _) => print_table(&[m]),
                (None, _) => println!("No readings yet"),
            }
        }

        Commands::History => {
            let readings: Vec<Measurement> = fetch(&client, base, "history").await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&readings)?);
            } else if readings.is_empty() {
                println!("No readings in the trailing window");
            } else {
                print_table(&readings);
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Wrote config to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

async fn fetch<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    base: &str,
    endpoint: &str,
) -> anyhow::Result<T> {
    let response = client
        .get(format!("{}/api/weather/{}", base, endpoint))
        .send()
        .await
        .context("Failed to reach weather station")?;

    let status = response.status();
    if !status.is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        bail!("Server returned {}: {}", status, error_message(&body));
    }

    Ok(response.json().await?)
}

fn error_message(body: &serde_json::Value) -> &str {
    body.get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("unknown error")
}

fn print_table(readings: &[Measurement]) {
    println!("{:>8}  {:<19}  {:>11}  {:>8}", "ID", "TIME", "TEMPERATURE", "HUMIDITY");
    for m in readings {
        let local: DateTime<Local> = m.timestamp.into();
        println!(
            "{:>8}  {:<19}  {:>11.1}  {:>8.1}",
            m.id,
            local.format("%Y-%m-%d %H:%M:%S"),
            m.temperature,
            m.humidity
        );
    }
}
