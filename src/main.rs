use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use estimate_cache::{
    config::{database, settings},
    core::export::{self, CacheStatus},
    errors::Result,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Operator tool for estimate export caches.
#[derive(Debug, Parser)]
#[command(name = "estimate-cache", version, about)]
struct Cli {
    /// Path to the settings file
    #[arg(long, default_value = "config.toml", env = "ESTIMATE_CACHE_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recompute the export cache of one estimate, or of all estimates
    Recompute {
        #[arg(long)]
        estimate_id: Option<i64>,
    },
    /// Compare an estimate's cache with its live data
    Status {
        #[arg(long)]
        estimate_id: i64,
    },
    /// Print an estimate's cached snapshot as JSON
    Show {
        #[arg(long)]
        estimate_id: i64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal: variables can be set externally
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Load settings
    let settings = settings::load_settings(&cli.config)
        .inspect_err(|e| error!("Failed to load settings: {e}"))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect(|_| info!("Database connected."))
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;

    match cli.command {
        Command::Recompute {
            estimate_id: Some(id),
        } => {
            let row = export::recompute_export_cache(&db, id).await?;
            println!("estimate {id}: grand total {}", row.grand_total);
        }
        Command::Recompute { estimate_id: None } => {
            let report = export::recompute_all_export_caches(&db).await?;
            println!(
                "recomputed {}, failed {}",
                report.succeeded.len(),
                report.failed.len()
            );
            for (id, reason) in &report.failed {
                println!("  estimate {id}: {reason}");
            }
        }
        Command::Status { estimate_id } => {
            match export::check_cache_drift(&db, estimate_id).await? {
                CacheStatus::Missing => println!("estimate {estimate_id}: no cache"),
                CacheStatus::Fresh => println!("estimate {estimate_id}: fresh"),
                CacheStatus::Stale {
                    cached_grand_total,
                    live_grand_total,
                } => println!(
                    "estimate {estimate_id}: stale (cached {cached_grand_total}, live {live_grand_total})"
                ),
            }
        }
        Command::Show { estimate_id } => {
            let snapshot = export::read_export_cache(&db, &settings.export, estimate_id).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot.to_json_value())?);
        }
    }

    Ok(())
}
