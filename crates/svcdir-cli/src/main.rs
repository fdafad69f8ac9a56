mod geocode;
mod search;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use svcdir_core::{AppConfig, Vocabulary};
use svcdir_geocode::{GeocodeClient, GeocodeClientConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "svcdir-cli")]
#[command(about = "Services directory command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run a search through the full pipeline and print the JSON response
    Search {
        query: String,
        /// Device latitude; requires --lng
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Device longitude; requires --lat
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Postal code to anchor the search on when no coordinates are given
        #[arg(long)]
        zip: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Geocode a single address with the fallback cascade
    Geocode {
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
    },
    /// Fill in coordinates for providers that have none
    BackfillCoordinates {
        /// Maximum number of providers to process
        #[arg(long, default_value = "100")]
        limit: i64,
        /// Print what would be written without touching the database
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

fn load_vocabulary(config: &AppConfig) -> anyhow::Result<Arc<Vocabulary>> {
    let vocabulary = match &config.vocabulary_path {
        Some(path) => svcdir_core::load_vocabulary(path)
            .with_context(|| format!("loading vocabulary from {}", path.display()))?,
        None => Vocabulary::default(),
    };
    Ok(Arc::new(vocabulary))
}

fn build_geocoder(config: &AppConfig) -> anyhow::Result<Arc<GeocodeClient>> {
    let client = GeocodeClient::new(&GeocodeClientConfig::from_app_config(config))
        .context("failed to build geocoding client")?;
    Ok(Arc::new(client))
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = svcdir_db::PoolConfig::from_app_config(config);
    svcdir_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("failed to connect to database")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("svcdir-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = svcdir_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    svcdir_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    svcdir_db::run_migrations(&pool).await?;
                    println!("migrations applied");
                }
            }
        }
        Commands::Search {
            query,
            lat,
            lng,
            zip,
            limit,
            offset,
        } => {
            let pool = connect(&config).await?;
            let request = search::build_request(query, lat, lng, zip, limit, offset);
            search::run_search(&config, pool, load_vocabulary(&config)?, build_geocoder(&config)?, &request)
                .await?;
        }
        Commands::Geocode {
            address,
            city,
            state,
            zip,
        } => {
            let parts = svcdir_search::AddressParts {
                address,
                city,
                state,
                zip,
            };
            geocode::run_geocode(&config, load_vocabulary(&config)?, build_geocoder(&config)?, &parts).await;
        }
        Commands::BackfillCoordinates { limit, dry_run } => {
            let pool = connect(&config).await?;
            geocode::run_backfill(
                &pool,
                &config,
                load_vocabulary(&config)?,
                build_geocoder(&config)?,
                limit,
                dry_run,
            )
            .await?;
        }
    }

    Ok(())
}
