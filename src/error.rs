use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index engine error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("invalid query: {0}")]
    Query(#[from] tantivy::query::QueryParserError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage root does not exist and could not be created: {0}")]
    StorageRoot(PathBuf),

    #[error("couldn't create shard {shard} at {}: {source}", path.display())]
    ShardCreate {
        shard: usize,
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("shard {shard}: could not index record '{record}': {source}")]
    Stage {
        shard: usize,
        record: String,
        #[source]
        source: Box<Error>,
    },

    #[error("shard {shard}: could not submit batch {batch}: {source}")]
    Submit {
        shard: usize,
        batch: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("{} shard(s) failed to index: {}", .0.len(), join(.0))]
    Index(Vec<Error>),

    #[error("shard {shard}: search failed: {source}")]
    Search {
        shard: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("line {line}: {reason}")]
    Load { line: u64, reason: String },

    #[error("index writer lock poisoned")]
    Poisoned,

    #[error("indexer is already open")]
    AlreadyOpen,

    #[error("indexer is not open")]
    NotOpen,
}

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
