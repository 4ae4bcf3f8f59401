mod db;
mod error;
mod fetch;
mod ingest;
mod parser;
mod report;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use fetch::{FileFetcher, Fetcher, HttpFetcher};
use settings::Settings;

#[derive(Parser)]
#[command(name = "strn_nodes", about = "Saturn node stats scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the nodes table
    Init,
    /// Fetch the stats page and store a snapshot of active nodes
    Ingest {
        /// Read a saved copy of the page instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Print node counts grouped by ISP and region as JSON
    Report {
        /// Read a saved copy of the page instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Show store statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;
    info!(settings = ?settings, "Starting");

    let result = run(cli.command, &settings);

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

// Errors come back as values so the caller still prints the timing footer.
fn run(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Commands::Init => {
            db::SqliteStore::open(&settings.db_path)?;
            println!("Schema ready in {:?}", settings.db_path);
            Ok(())
        }
        Commands::Ingest { html } => {
            let fetcher = make_fetcher(settings, html)?;
            let mut store = db::SqliteStore::open(&settings.db_path)?;
            let n = ingest::run_ingestion(fetcher.as_ref(), &mut store, &settings.stats_url)
                .context("Ingestion failed")?;
            println!("Inserted {} active nodes", n);
            Ok(())
        }
        Commands::Report { html, pretty } => {
            let fetcher = make_fetcher(settings, html)?;
            let report = report::build_report(fetcher.as_ref(), &settings.stats_url)
                .context("Report failed")?;
            let json = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", json);
            Ok(())
        }
        Commands::Stats => {
            let store = db::SqliteStore::open(&settings.db_path)?;
            let s = db::get_stats(store.conn())?;
            println!("Rows:        {}", s.rows);
            println!("Nodes:       {}", s.nodes);
            println!("Last insert: {}", s.last_insert.as_deref().unwrap_or("-"));
            Ok(())
        }
    }
}

fn make_fetcher(settings: &Settings, html: Option<PathBuf>) -> anyhow::Result<Box<dyn Fetcher>> {
    Ok(match html {
        Some(path) => Box::new(FileFetcher::new(path)),
        None => Box::new(HttpFetcher::new(settings.http_timeout())?),
    })
}
