//! shardex - full-text search over tabular records spread across shards.
//!
//! Records are split into contiguous ranges, one per shard. Each shard is
//! an independent [Tantivy](https://github.com/quickwit-oss/tantivy) index
//! written in batches. Queries fan out to every shard in parallel and the
//! hits are merged into one ranked list.
//!
//! # Quick start
//!
//! ```no_run
//! use shardex::{Indexer, IndexerConfig, SearchRequest};
//!
//! let config = IndexerConfig::new("indexes")
//!     .with_shards(4)
//!     .with_batch_size(500);
//! let mut indexer = Indexer::new(config).unwrap();
//! indexer.open().unwrap();
//!
//! let records = shardex::loader::load_records("i.csv".as_ref()).unwrap();
//! indexer.index(&records).unwrap();
//!
//! let results = indexer.search(&SearchRequest::new("Sofitel")).unwrap();
//! for hit in &results.hits {
//!     println!("{} (score: {:.3})", hit.record.name, hit.score);
//! }
//! ```

pub mod aggregator;
pub mod batch;
pub mod data_dir;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod loader;
pub mod partition;
pub mod record;
pub mod schema;
pub mod search;
pub mod shard;
pub mod shard_set;

pub use aggregator::Aggregator;
pub use data_dir::DataDir;
pub use engine::{IndexEngine, TantivyEngine};
pub use error::{Error, Result};
pub use indexer::{IndexReport, Indexer, IndexerConfig};
pub use record::Record;
pub use search::{Hit, SearchRequest, SearchResults};
pub use shard::Shard;
pub use shard_set::ShardSet;
