use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jobscan_client::{ProxyConfig, ProxyFetcher, SelectorExtractor};
use jobscan_core::models::{JobRecord, SearchQuery};
use jobscan_core::source::SourceKind;
use jobscan_core::traits::JobStore;
use jobscan_core::{HarvestConfig, HarvestService, MemoryStore, TracingHarvestReporter};
use jobscan_db::{Database, DatabaseConfig, JobListingRepository};

#[derive(Parser)]
#[command(name = "jobscan", version, about = "Job-board harvester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one harvest for a source and print the stored records
    Harvest {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        proxy: ProxyArgs,

        /// Page tasks allowed in flight at once
        #[arg(long, env = "JOBSCAN_MAX_IN_FLIGHT")]
        max_in_flight: Option<usize>,

        /// Persist to PostgreSQL (requires DATABASE_URL) instead of memory
        #[arg(long, default_value_t = false)]
        save: bool,

        /// Print records as CSV instead of JSON
        #[arg(long, default_value_t = false)]
        csv: bool,
    },

    /// Print the stored records for a source
    List {
        /// linkedin, indeed, glassdoor or stepstone
        #[arg(short, long)]
        source: SourceKind,

        /// Print records as CSV instead of JSON
        #[arg(long, default_value_t = false)]
        csv: bool,
    },

    /// Show recent harvest runs for a source
    History {
        /// linkedin, indeed, glassdoor or stepstone
        #[arg(short, long)]
        source: SourceKind,

        /// Number of runs to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Print the page URLs a harvest would fetch, without fetching them
    Plan {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// linkedin, indeed, glassdoor or stepstone
    #[arg(short, long)]
    source: SourceKind,

    /// Job title to search for
    #[arg(short, long)]
    job_title: Option<String>,

    /// Location to search in
    #[arg(short, long)]
    location: Option<String>,
}

impl QueryArgs {
    fn resolve(&self) -> Result<SearchQuery> {
        self.source
            .descriptor()
            .resolve_query(self.job_title.as_deref(), self.location.as_deref())
            .map_err(|e| anyhow::anyhow!(e))
    }
}

#[derive(Args)]
struct ProxyArgs {
    /// Scraping proxy access key
    #[arg(long, env = "SCRAPER_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Scraping proxy endpoint
    #[arg(long, env = "SCRAPER_API_URL", default_value = jobscan_client::fetcher::DEFAULT_PROXY_ENDPOINT)]
    proxy_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "SCRAPER_TIMEOUT_SECS", default_value_t = 70)]
    proxy_timeout: u64,

    /// Proxy calls allowed in flight at once
    #[arg(long, env = "SCRAPER_MAX_CONCURRENCY", default_value_t = 10)]
    proxy_concurrency: usize,
}

impl ProxyArgs {
    fn config(&self) -> ProxyConfig {
        ProxyConfig::new(self.api_key.clone())
            .with_endpoint(self.proxy_url.clone())
            .with_timeout(Duration::from_secs(self.proxy_timeout))
            .with_max_concurrency(self.proxy_concurrency)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobscan=info".parse()?))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Harvest {
            query,
            proxy,
            max_in_flight,
            save,
            csv,
        } => {
            let search = query.resolve()?;
            let mut config = HarvestConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
            if let Some(n) = max_in_flight {
                config = config.with_max_in_flight(n);
            }

            if save {
                let db = connect_db().await?;
                let result =
                    cmd_harvest(db.listing_repo(), query.source, &search, &proxy, config, csv)
                        .await;
                db.close().await;
                result?;
            } else {
                cmd_harvest(MemoryStore::new(), query.source, &search, &proxy, config, csv)
                    .await?;
            }
        }
        Commands::List { source, csv } => {
            let db = connect_db().await?;
            let records = db
                .listing_repo()
                .find_all(source)
                .await
                .map_err(|e| anyhow::anyhow!(e));
            db.close().await;
            print_records(&records?, csv)?;
        }
        Commands::History { source, limit } => {
            let db = connect_db().await?;
            let result = cmd_history(&db.listing_repo(), source, limit).await;
            db.close().await;
            result?;
        }
        Commands::Plan { query } => {
            let search = query.resolve()?;
            for page in query.source.descriptor().plan(&search) {
                let tier = if page.premium { "premium" } else { "standard" };
                println!("{:>3}  {tier:<8}  {}", page.page, page.url);
            }
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let db = Database::connect(&config)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to connect to database")?;
    db.migrate().await.map_err(|e| anyhow::anyhow!(e))?;
    tracing::debug!(max_connections = config.max_connections, "Database ready");
    Ok(db)
}

async fn cmd_harvest<S: JobStore>(
    store: S,
    source: SourceKind,
    query: &SearchQuery,
    proxy: &ProxyArgs,
    config: HarvestConfig,
    csv: bool,
) -> Result<()> {
    let fetcher = ProxyFetcher::new(&proxy.config()).map_err(|e| anyhow::anyhow!(e))?;
    let extractor = SelectorExtractor::new().map_err(|e| anyhow::anyhow!(e))?;
    let service = HarvestService::new(fetcher, extractor, store, config);

    let report = service
        .harvest(source, query, &TracingHarvestReporter)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    eprintln!(
        "{source}: {} records ({} new, {} updated, {} unchanged), {}/{} pages failed, mode {}",
        report.record_count,
        report.summary.inserted,
        report.summary.updated,
        report.summary.unchanged,
        report.pages_failed,
        report.pages_planned,
        report.mode,
    );

    let records = service.list(source).await.map_err(|e| anyhow::anyhow!(e))?;
    print_records(&records, csv)
}

async fn cmd_history(repo: &JobListingRepository, source: SourceKind, limit: usize) -> Result<()> {
    let runs = repo
        .harvest_history(source, limit)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if runs.is_empty() {
        println!("No harvests recorded for {source}");
        return Ok(());
    }

    println!("Harvest history for {source}:\n");
    for run in &runs {
        println!(
            "  {}  {:<7}  {} in {}: {} records, {} new, {} updated, {}/{} pages failed ({})",
            run.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
            run.persistence_mode,
            run.query_title,
            run.query_location,
            run.record_count,
            run.inserted,
            run.updated,
            run.pages_failed,
            run.pages_planned,
            run.id,
        );
    }
    println!("\nTotal: {} runs", runs.len());

    Ok(())
}

fn print_records(records: &[JobRecord], csv: bool) -> Result<()> {
    if csv {
        let mut writer = csv::Writer::from_writer(io::stdout());
        for record in records {
            writer.serialize(record).context("Failed to write CSV row")?;
        }
        writer.flush()?;
    } else {
        println!("{}", serde_json::to_string_pretty(records)?);
    }
    Ok(())
}
