use anyhow::Result;
use clap::Parser;
use price_harvest::database_ops::adapters::SourceKind;
use price_harvest::orchestrator::{Orchestrator, ScrapeConfig};
use price_harvest::util::env as env_util;
use tracing::{error, info};

/// Scrape one configured (store, category) listing and save it in one batch.
///
/// Runs with no arguments; everything comes from the environment (.env).
#[derive(Parser, Debug)]
#[command(name = "scrape", version)]
struct Args {
    /// Store to scrape (overrides SCRAPE_SOURCE).
    #[arg(long, value_enum)]
    source: Option<SourceKind>,
    /// Category label written with every product (overrides SCRAPE_CATEGORY).
    #[arg(long)]
    category: Option<String>,
    /// Print products as JSON lines instead of saving them.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_util::init_env();
    price_harvest::logging::init_tracing("info")?;
    let args = Args::parse();

    env_util::preflight_check(
        "scrape",
        &[],
        &[
            "SCRAPE_SOURCE",
            "SCRAPE_CATEGORY",
            "SCRAPE_BASE_URL",
            "SCRAPE_PAGE_SIZE",
            "DATABASE_URL",
            "DB_HOST",
            "DB_PORT",
            "DB_DATABASE",
            "DB_USERNAME",
            "DB_PASSWORD",
            "DB_TABLE",
        ],
    )?;

    let mut config = ScrapeConfig::from_env(args.source)?;
    if let Some(category) = args.category {
        config.adapter.category = category;
    }

    let orchestrator = Orchestrator::new(config);
    match orchestrator.run(args.dry_run).await {
        Ok(summary) => {
            info!(
                source = %summary.source,
                category = %summary.category,
                fetched = summary.fetched,
                saved = summary.persisted,
                stop = ?summary.stop,
                "done"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "scrape failed");
            Err(e)
        }
    }
}
