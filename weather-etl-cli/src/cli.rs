use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use weather_etl_core::{
    Config, Extractor, Loader, OpenWeatherProvider, Pipeline, QueryCache, QueryOptions, Scheduler,
    SqliteStore, WeatherRecord,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-etl", version, about = "Weather ETL service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key in the config file.
    Configure {
        /// API key for api.openweathermap.org.
        api_key: String,
    },

    /// Run the ETL pipeline on the configured interval until interrupted.
    Run,

    /// Run the ETL pipeline exactly once and exit.
    RunOnce,

    /// Query stored records through the cache-backed read path.
    Query {
        /// Substring filter on the location name.
        #[arg(long)]
        filter: Option<String>,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Records per page.
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { api_key } => {
                let mut config = Config::load()?;
                config.api_key = Some(api_key);
                config.save()?;
                println!("API key saved to {}", Config::config_file_path()?.display());
            }
            Command::Run => {
                let config = Config::load()?;
                let pipeline = build_pipeline(&config)?;
                info!(
                    interval_secs = config.interval_secs,
                    source_keys = config.source_keys().len(),
                    "starting scheduler"
                );
                let scheduler = Scheduler::new(Arc::new(pipeline));
                scheduler.run_forever(config.interval()).await;
            }
            Command::RunOnce => {
                let config = Config::load()?;
                let pipeline = build_pipeline(&config)?;
                let report = pipeline.run().await?;
                println!(
                    "Run complete: {} requested, {} extracted, {} loaded.",
                    report.requested, report.extracted, report.loaded
                );
            }
            Command::Query { filter, page, limit } => {
                let config = Config::load()?;
                let store = open_store(&config)?;
                let cache = QueryCache::new(store, config.cache_ttl());

                let options = QueryOptions { filter, page, limit };
                let records = cache.get_data(&options).await.context("Failed to query records")?;

                if records.is_empty() {
                    println!("No records for page {page} (limit {limit}).");
                }
                for record in &records {
                    print_record(record);
                }
            }
        }

        Ok(())
    }
}

fn open_store(config: &Config) -> anyhow::Result<Arc<SqliteStore>> {
    let path = config.database_file_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }
    let store = SqliteStore::open(&path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let api_key = config.require_api_key()?.to_string();
    let store = open_store(config)?;

    let provider = Arc::new(OpenWeatherProvider::new(api_key));
    let extractor = Extractor::new(provider, config.retry.clone());
    let loader = Loader::new(store);

    Ok(Pipeline::new(extractor, loader, config.source_keys()))
}

fn print_record(record: &WeatherRecord) {
    println!(
        "{}  {}  {:.1}°C / {:.1}°F  humidity {}%  {}  observed {}",
        record.id,
        record.location_name,
        record.temperature_c,
        record.temperature_f,
        record.humidity_pct,
        record.condition,
        record.observed_at.format("%Y-%m-%d %H:%M UTC"),
    );
}
