use std::path::PathBuf;

use clap::Parser;
use shardex::IndexerConfig;

#[derive(Debug, Parser)]
#[command(
    name = "shardex",
    about = "Index a CSV of hotels across shards and search it"
)]
pub struct Cli {
    /// The search query
    #[arg(default_value = "Sofitel")]
    pub query: String,

    /// CSV file to index (the first line is a header)
    #[arg(long, default_value = "i.csv")]
    pub csv: PathBuf,

    /// Override the XDG data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Number of shards
    #[arg(long, default_value_t = IndexerConfig::DEFAULT_SHARDS)]
    pub shards: usize,

    /// Records per write batch
    #[arg(long, default_value_t = IndexerConfig::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["shardex"]);
        assert_eq!(cli.query, "Sofitel");
        assert_eq!(cli.csv, PathBuf::from("i.csv"));
        assert_eq!(cli.shards, 20);
        assert_eq!(cli.batch_size, 2000);
        assert_eq!(cli.count, 10);
        assert!(cli.data_dir.is_none());
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_overrides() {
        let cli = Cli::parse_from([
            "shardex",
            "--shards",
            "3",
            "--batch-size",
            "50",
            "-n",
            "2",
            "--json",
            "-vv",
            "Lutetia",
        ]);
        assert_eq!(cli.query, "Lutetia");
        assert_eq!(cli.shards, 3);
        assert_eq!(cli.batch_size, 50);
        assert_eq!(cli.count, 2);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}
