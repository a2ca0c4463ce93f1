//! Appraiser CLI: drives the collateral capture workflow without a device UI.
//!
//! Reads DATABASE_URL and the other settings from the environment (`.env` supported).
//! `capture --dry-run` runs without a database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use appraiser_cli::{client_table_row, parse_fix, run_capture, CaptureRequest};
use appraiser_core::{AppraiserConfig, CollateralClass};
use appraiser_db::{
    setup_database, ClientDirectory, ClientRepository, CollateralRecordStore,
    CollateralRepository,
};
use appraiser_infra::telemetry::{init_telemetry, shutdown_telemetry};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "appraiser", about = "Collateral appraisal photo capture")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// List clients waiting for appraisal
    Clients {
        /// Workflow stage marker (defaults to CLIENT_STEP_STATUS)
        #[arg(long)]
        step: Option<String>,
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show the collateral class recorded for a control number
    Class {
        control_number: String,
    },
    /// Run a capture session over image files and recorded GPS fixes
    Capture {
        #[arg(long)]
        individual_id: String,
        #[arg(long)]
        control_number: String,
        #[arg(long)]
        employee_id: String,
        /// Collateral class; looked up from the database when omitted
        #[arg(long)]
        class: Option<String>,
        /// Image file, one per photo
        #[arg(long = "photo", required = true)]
        photos: Vec<PathBuf>,
        /// Photo title, one per photo
        #[arg(long = "title", required = true)]
        titles: Vec<String>,
        /// Description applied to every photo
        #[arg(long)]
        description: String,
        /// Recorded `lat,lon` fix, replayed one per capture
        #[arg(long = "fix")]
        fixes: Vec<String>,
        /// Surveyed property position as `lat,lon`
        #[arg(long)]
        property: Option<String>,
        /// Behave as if location permission was refused
        #[arg(long)]
        no_location: bool,
        /// Keep writes in memory instead of the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Record the property coordinate of a case
    SaveCoordinate {
        individual_id: String,
        control_number: String,
        employee_id: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Fail when a coordinate is already recorded for the case
        #[arg(long)]
        strict: bool,
    },
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Arc::new(AppraiserConfig::from_env().context("Failed to load configuration")?);
    init_telemetry(config.log_format)?;
    tracing::debug!(
        environment = %config.environment,
        production = config.is_production(),
        "Configuration loaded"
    );
    let result = run(cli.command, config).await;

    shutdown_telemetry();
    result
}

async fn run(command: Commands, config: Arc<AppraiserConfig>) -> Result<()> {
    match command {
        Commands::Migrate => {
            setup_database(&config, true).await?;
            print_json(&serde_json::json!({ "migrated": true }))?;
        }
        Commands::Clients { step, format } => {
            let pool = setup_database(&config, false).await?;
            let step = step.unwrap_or_else(|| config.client_step_status.clone());
            let clients = ClientRepository::new(pool).list_clients(&step).await?;

            match format.as_str() {
                "json" => print_json(&clients)?,
                _ => {
                    println!("{:<12} {:<16} NAME", "ID", "CONTROL NO");
                    for client in &clients {
                        println!("{}", client_table_row(client));
                    }
                    println!("{} client(s) at {}", clients.len(), step);
                }
            }
        }
        Commands::Class { control_number } => {
            let pool = setup_database(&config, false).await?;
            let class = ClientRepository::new(pool)
                .collateral_class(&control_number)
                .await?
                .unwrap_or_else(CollateralClass::unknown);
            print_json(&serde_json::json!({
                "control_number": control_number,
                "class": class,
                "persistable": class.is_persistable(),
            }))?;
        }
        Commands::Capture {
            individual_id,
            control_number,
            employee_id,
            class,
            photos,
            titles,
            description,
            fixes,
            property,
            no_location,
            dry_run,
        } => {
            let fixes = fixes
                .iter()
                .map(|raw| parse_fix(raw))
                .collect::<Result<Vec<_>>>()?;
            let property = property.as_deref().map(parse_fix).transpose()?;
            let request = CaptureRequest {
                individual_id,
                control_number,
                employee_id,
                class,
                photos,
                titles,
                description,
                fixes,
                property,
                no_location,
                dry_run,
            };

            let token = CancellationToken::new();
            let interrupt = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, closing capture session");
                    interrupt.cancel();
                }
            });

            let summary = run_capture(request, &config, token).await?;
            print_json(&summary)?;
        }
        Commands::SaveCoordinate {
            individual_id,
            control_number,
            employee_id,
            lat,
            lon,
            strict,
        } => {
            let pool = setup_database(&config, false).await?;
            let outcome = CollateralRepository::new(pool)
                .save_coordinate(&individual_id, &control_number, &employee_id, lat, lon)
                .await?;
            if strict {
                outcome.require_created()?;
            }
            print_json(&serde_json::json!({
                "individual_id": individual_id,
                "control_number": control_number,
                "outcome": outcome.as_str(),
            }))?;
        }
    }

    Ok(())
}
