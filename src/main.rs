use std::time::Instant;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use shardex::{
    DataDir,
    Indexer,
    IndexerConfig,
    SearchRequest,
    error,
    loader,
    search,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("SHARDEX_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config = IndexerConfig::new(data_dir.indexes_dir())
        .with_shards(cli.shards)
        .with_batch_size(cli.batch_size);

    let mut indexer = Indexer::new(config)?;
    indexer.open()?;

    let outcome = load_index_search(&cli, &indexer);
    let closed = indexer
        .close()
        .inspect_err(|err| warn!(error = %err, "closing indexer"));
    outcome?;
    closed
}

fn load_index_search(cli: &Cli, indexer: &Indexer) -> error::Result<()> {
    let start = Instant::now();
    let records = loader::load_records(&cli.csv)?;
    info!(
        records = records.len(),
        elapsed = ?start.elapsed(),
        "loaded {}",
        cli.csv.display()
    );

    let start = Instant::now();
    indexer.index(&records)?;
    info!(elapsed = ?start.elapsed(), "indexing done");

    let request = SearchRequest::new(&cli.query).with_size(cli.count);
    let results = indexer.search(&request)?;
    if cli.json {
        println!("{}", search::format_json(&results, &cli.query)?);
    } else {
        print!("{}", search::format_human(&results));
    }
    Ok(())
}
