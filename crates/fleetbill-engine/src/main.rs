//! FleetBill CLI
//!
//! Bills trips against tenant contracts held in a JSON seed fixture.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fleetbill_engine::{BillingService, FleetBillConfig, InMemoryTripRepository, ENGINE_VERSION};

#[derive(Debug, Parser)]
#[command(name = "fleetbill", version, about = "Trip billing calculation engine")]
struct Cli {
    /// Config file (without extension is fine), e.g. `fleetbill.toml`
    #[arg(long, global = true)]
    config: Option<String>,

    /// Seed fixture with contracts and trips; overrides `seed_path`
    #[arg(long, global = true)]
    seed: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Calculate the cost of one trip
    Calculate {
        #[arg(long)]
        trip: String,
        #[arg(long)]
        client: String,
    },
    /// Show the contract currently governing a tenant
    Contract {
        #[arg(long)]
        client: String,
    },
    /// Bill every trip of a tenant and summarize spend
    Report {
        #[arg(long)]
        client: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = FleetBillConfig::load(cli.config.as_deref())?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("Starting FleetBill v{}", ENGINE_VERSION);

    run(cli, config).await.map_err(|err| {
        error!("{err:#}");
        err
    })
}

async fn run(cli: Cli, config: FleetBillConfig) -> Result<()> {
    let output = execute(cli, config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Run one subcommand and return its JSON document
async fn execute(cli: Cli, config: FleetBillConfig) -> Result<Value> {
    let seed_path = cli
        .seed
        .or(config.seed_path)
        .context("no seed fixture given; pass --seed or set FLEETBILL__SEED_PATH")?;
    let repository = InMemoryTripRepository::from_seed_file(&seed_path)
        .with_context(|| format!("failed to load seed fixture {seed_path}"))?;

    let service = BillingService::new(Arc::new(repository), config.cache.capacity)?;

    let output = match cli.command {
        Command::Calculate { trip, client } => {
            serde_json::to_value(service.calculate_trip_cost(&trip, &client).await?)?
        }
        Command::Contract { client } => {
            serde_json::to_value(service.get_active_contract(&client).await?)?
        }
        Command::Report { client } => serde_json::to_value(service.client_report(&client).await?)?,
    };
    Ok(output)
}
