use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use persona_etl::config::{parse_query_string, Config, DataLayout};
use persona_etl::ingest::{HttpPageFetcher, Ingestor};
use persona_etl::logging;
use persona_etl::mart::DataMart;
use persona_etl::storage::{BatchStore, ParquetDirStore};
use persona_etl::transform::BatchProcessor;

#[derive(Parser)]
#[command(name = "persona_etl")]
#[command(about = "Batch ETL pipeline for paginated person records")]
#[command(version = "0.1.0")]
struct Cli {
    /// Root directory holding the data/raw, data/intermediate and data/mart areas
    #[arg(long, default_value = ".")]
    root_dir: PathBuf,

    /// Optional TOML config file; CLI flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// API endpoint to fetch person records from
    #[arg(long)]
    url: Option<String>,

    /// Extra query parameters as a raw query string (k=v&k=v)
    #[arg(long)]
    params: Option<String>,

    /// Number of records to fetch and process per batch
    #[arg(long)]
    batch_size: Option<u64>,

    /// Total number of records to fetch
    #[arg(long)]
    total_records: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch raw pages from the remote source into the raw area
    Ingest,
    /// Anonymize raw batches into the intermediate area
    Transform,
    /// Compute mart aggregates from the transformed dataset
    Mart,
    /// Run ingest, transform and mart sequentially
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(url) = cli.url {
        config.api.url = url;
    }
    if let Some(params) = &cli.params {
        config.api.params = parse_query_string(params)?;
    }
    if let Some(size) = cli.batch_size {
        config.batch.size = size;
    }
    if let Some(total) = cli.total_records {
        config.batch.total_records = total;
    }

    let layout = DataLayout::under(&cli.root_dir);
    layout.ensure()?;
    let store: Arc<dyn BatchStore> = Arc::new(ParquetDirStore::new());

    match cli.command {
        Commands::Ingest => run_ingest(&config, &layout, store).await?,
        Commands::Transform => run_transform(&config, &layout, store)?,
        Commands::Mart => run_mart(&layout, store)?,
        Commands::Run => {
            run_ingest(&config, &layout, store.clone()).await?;
            run_transform(&config, &layout, store.clone())?;
            run_mart(&layout, store)?;
        }
    }
    Ok(())
}

async fn run_ingest(
    config: &Config,
    layout: &DataLayout,
    store: Arc<dyn BatchStore>,
) -> anyhow::Result<()> {
    println!("🔄 Fetching and storing raw data...");
    info!(url = %config.api.url, "starting ingestion");

    let fetcher = Arc::new(HttpPageFetcher::new(config.api.url.clone()));
    let ingestor = Ingestor::new(
        fetcher,
        store,
        config.api.retry.policy(),
        config.api.params.clone(),
        layout.raw.clone(),
    );
    let summary = ingestor
        .run(config.batch.total_records, config.batch.size)
        .await?;

    println!("📊 Ingest results:");
    println!("   Pages fetched: {}", summary.pages);
    println!("   Records stored: {}", summary.records);
    Ok(())
}

fn run_transform(
    config: &Config,
    layout: &DataLayout,
    store: Arc<dyn BatchStore>,
) -> anyhow::Result<()> {
    println!("🔨 Processing raw data into intermediate data...");

    let processor = BatchProcessor::new(
        store,
        layout.raw.clone(),
        layout.intermediate.clone(),
        config.batch.size as usize,
    );
    let summary = processor.process()?;

    println!("📊 Transform results:");
    println!("   Batches processed: {}", summary.batches);
    println!("   Rows anonymized: {}", summary.rows);
    Ok(())
}

fn run_mart(layout: &DataLayout, store: Arc<dyn BatchStore>) -> anyhow::Result<()> {
    println!("📈 Calculating analytics...");

    let mart = DataMart::new(store, layout.intermediate.clone(), layout.mart.clone());
    let report = mart.run()?;

    println!("   Percentage of Gmail users in Germany: {}%", report.gmail_in_germany_pct);
    println!("   Top countries using Gmail:");
    for entry in &report.top_gmail_countries {
        println!(
            "     #{} {} ({} users)",
            entry.rank, entry.country, entry.gmail_users
        );
    }
    println!("   Gmail users over age 60: {}", report.gmail_users_over_60);
    Ok(())
}
