use anyhow::{Context, Result};
use calbundle_core::{IngestConfig, IngestStats, Store, ingest};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Paths come from `~/.config/calbundle/config.toml` or `CALBUNDLE_*`.
#[derive(Parser)]
#[command(name = "calbundle", version)]
#[command(about = "Snapshot a desktop calendar store into a SQLite database")]
struct Cli {}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging()?;

    Cli::parse();

    let config = IngestConfig::load()?;

    let source = config.source_path();
    let database = config.database_path();
    info!(source = %source.display(), database = %database.display(), "Starting ingestion");

    let store = Store::open(&database)
        .await
        .with_context(|| format!("Could not open database {}", database.display()))?;

    let stats = ingest::run(&source, &store)
        .await
        .with_context(|| format!("Ingestion of {} failed", source.display()))?;

    println!("{}", render_stats(&stats));

    Ok(())
}

fn init_logging() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn render_stats(stats: &IngestStats) -> String {
    let mut line = format!(
        "Ingested {} calendars, {} events",
        stats.calendars.green(),
        stats.events_inserted.green()
    );
    if stats.duplicates_skipped > 0 {
        line.push_str(&format!(
            " ({} duplicates skipped)",
            stats.duplicates_skipped.yellow()
        ));
    }
    line
}
