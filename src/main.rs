use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tender_oracle::air::{
    classify_aqi, classify_pollutant, AirQualityProvider, BoundingBox, WaqiProvider,
};
use tender_oracle::analysis::{analyze_tender, overview};
use tender_oracle::config::{Config, ConfigOverrides};
use tender_oracle::narrative::Narrator;
use tender_oracle::output::csv::{overview_to_csv, stations_to_csv};
use tender_oracle::output::json::render_json;
use tender_oracle::output::table::{
    render_analysis, render_overview_table, render_station_table, render_stations_table,
};
use tender_oracle::risk::RiskEngine;
use tender_oracle::server::run_server;
use tender_oracle::tender::TenderCatalog;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "tender-oracle",
    about = "Tender risk scoring and city air-quality classification"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// JSON tender dataset to use instead of the built-in one.
    #[arg(long)]
    dataset: Option<String>,
    /// Never call the AI endpoint.
    #[arg(long = "no-ai")]
    no_ai: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Score every tender in the dataset, riskiest first.
    Tenders {
        #[arg(long)]
        now: Option<String>,
    },
    Assess {
        id: String,
        /// Evaluation instant (RFC 3339); defaults to the current time.
        #[arg(long)]
        now: Option<String>,
        #[arg(long)]
        narrate: bool,
    },
    Classify {
        kind: String,
        value: f64,
    },
    Aqi {
        value: Option<f64>,
    },
    Stations {
        /// south,west,north,east
        #[arg(long)]
        bbox: Option<String>,
    },
    Station {
        id: String,
        #[arg(long)]
        narrate: bool,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        dataset_path: cli.dataset.clone(),
        disable_ai: cli.no_ai,
    });
    init_tracing(&config.log.level);

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if let Commands::Serve { host, port } = &cli.command {
        let host = host.clone().unwrap_or_else(|| config.server.host.clone());
        let port = port.unwrap_or(config.server.port);
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let engine = RiskEngine::new(config.risk.clone());

    match &cli.command {
        Commands::Tenders { now } => {
            let catalog = load_catalog(&config)?;
            let rows = overview(&engine, &catalog, parse_now(now.as_deref())?);
            match cli.output {
                OutputFormat::Table => println!("{}", render_overview_table(&rows)),
                OutputFormat::Json => println!("{}", render_json(&rows)?),
                OutputFormat::Csv => println!("{}", overview_to_csv(&rows)?),
            }
        }
        Commands::Assess { id, now, narrate } => {
            let catalog = load_catalog(&config)?;
            let tender = catalog.get(id)?;
            let narrator = if *narrate {
                Some(build_narrator(&config)?)
            } else {
                None
            };
            let analysis = analyze_tender(
                &engine,
                narrator.as_ref(),
                tender,
                parse_now(now.as_deref())?,
            )
            .await?;
            match cli.output {
                OutputFormat::Table => println!("{}", render_analysis(&analysis)),
                OutputFormat::Json => println!("{}", render_json(&analysis)?),
                OutputFormat::Csv => json_fallback("assess", &analysis)?,
            }
        }
        Commands::Classify { kind, value } => {
            let status = classify_pollutant(kind, *value);
            match cli.output {
                OutputFormat::Json => println!(
                    "{}",
                    render_json(&serde_json::json!({
                        "kind": kind,
                        "value": value,
                        "status": status,
                    }))?
                ),
                _ => println!("{kind} {value}: {status:?}"),
            }
        }
        Commands::Aqi { value } => {
            let classification = classify_aqi(*value);
            match cli.output {
                OutputFormat::Json => println!("{}", render_json(&classification)?),
                _ => println!(
                    "AQI {}: {}",
                    value
                        .map(|v| format!("{v:.0}"))
                        .unwrap_or_else(|| "-".to_string()),
                    classification.label
                ),
            }
        }
        Commands::Stations { bbox } => {
            let bounds = match bbox.as_deref() {
                Some(raw) => raw.parse::<BoundingBox>()?,
                None => config.air_quality.bounds,
            };
            let provider = WaqiProvider::from_config(&config.air_quality);
            let stations = provider.stations(&bounds).await?;
            match cli.output {
                OutputFormat::Table => println!("{}", render_stations_table(&stations)),
                OutputFormat::Json => println!("{}", render_json(&stations)?),
                OutputFormat::Csv => println!("{}", stations_to_csv(&stations)?),
            }
        }
        Commands::Station { id, narrate } => {
            let provider = WaqiProvider::from_config(&config.air_quality);
            let station = provider.station(id).await?;
            match cli.output {
                OutputFormat::Table => println!("{}", render_station_table(&station)),
                OutputFormat::Json => println!("{}", render_json(&station)?),
                OutputFormat::Csv => json_fallback("station", &station)?,
            }
            if *narrate {
                let narrative = build_narrator(&config)?.narrate_air(&station).await;
                match cli.output {
                    OutputFormat::Table => println!("\n{}", narrative.text),
                    _ => println!("{}", render_json(&narrative)?),
                }
            }
        }
        Commands::Config { .. } | Commands::Serve { .. } => {}
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &PathBuf) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn load_catalog(config: &Config) -> Result<TenderCatalog> {
    let path = config.resolved_dataset_path();
    TenderCatalog::resolve(path.as_deref()).context("failed loading tender dataset")
}

fn build_narrator(config: &Config) -> Result<Narrator> {
    Narrator::from_config(&config.ai).context("failed building AI client")
}

fn parse_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --now timestamp: {raw}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn json_fallback<T: Serialize + ?Sized>(command: &str, value: &T) -> Result<()> {
    warn!("CSV output for {command} not implemented, using JSON");
    println!("{}", render_json(value)?);
    Ok(())
}
