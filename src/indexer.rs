use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{info, warn};

use crate::{
    aggregator::Aggregator,
    batch::WriteStats,
    engine::{EngineFactory, IndexEngine, MIN_WRITER_MEMORY, TantivyEngine},
    error::{Error, Result},
    partition::{PartitionPolicy, TailRemainder},
    record::Record,
    search::{SearchRequest, SearchResults},
    shard_set::ShardSet,
};

/// Settings fixed for the lifetime of an [`Indexer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Storage root; shard `n` lives in `<root>/<n>`.
    pub root: PathBuf,
    pub shard_count: usize,
    /// Records per write batch (the first batch of a write holds one more).
    pub batch_size: usize,
    /// Writer memory budget per shard, in bytes.
    pub writer_memory: usize,
}

impl IndexerConfig {
    pub const DEFAULT_SHARDS: usize = 20;
    pub const DEFAULT_BATCH_SIZE: usize = 2000;

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            shard_count: Self::DEFAULT_SHARDS,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            writer_memory: MIN_WRITER_MEMORY,
        }
    }

    pub fn with_shards(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_writer_memory(mut self, writer_memory: usize) -> Self {
        self.writer_memory = writer_memory;
        self
    }

    /// Check the settings, returning the shard count and batch size.
    pub fn validate(&self) -> Result<(NonZeroUsize, NonZeroUsize)> {
        let shards = NonZeroUsize::new(self.shard_count).ok_or_else(|| {
            Error::Config("shard count must be at least 1".to_string())
        })?;
        let batch_size = NonZeroUsize::new(self.batch_size).ok_or_else(|| {
            Error::Config("batch size must be at least 1".to_string())
        })?;
        if self.writer_memory < MIN_WRITER_MEMORY {
            return Err(Error::Config(format!(
                "writer memory must be at least {MIN_WRITER_MEMORY} bytes, \
                 got {}",
                self.writer_memory
            )));
        }
        Ok((shards, batch_size))
    }
}

/// Per-shard outcome of a successful [`Indexer::index`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Indexed by shard ordinal.
    pub shards: Vec<WriteStats>,
}

impl IndexReport {
    pub fn records(&self) -> usize {
        self.shards.iter().map(|s| s.records).sum()
    }

    pub fn batches(&self) -> usize {
        self.shards.iter().map(|s| s.batches).sum()
    }
}

struct Opened<E> {
    shards: ShardSet<E>,
    aggregator: Aggregator<E>,
}

/// Spreads records over a fixed number of shards and searches them as
/// one index.
///
/// The lifecycle is `new` → `open` → any mix of `index` and `search` →
/// `close`. `index` expects to be the only bulk-index call in flight;
/// `search` may run concurrently with anything but `open` and `close`.
pub struct Indexer<E: IndexEngine = TantivyEngine> {
    root: PathBuf,
    shard_count: NonZeroUsize,
    batch_size: NonZeroUsize,
    factory: Box<EngineFactory<E>>,
    policy: Arc<dyn PartitionPolicy>,
    opened: Option<Opened<E>>,
}

impl Indexer<TantivyEngine> {
    /// An indexer backed by on-disk tantivy indexes.
    pub fn new(config: IndexerConfig) -> Result<Self> {
        let writer_memory = config.writer_memory;
        Self::with_engine(config, move |_: usize, path: &Path| {
            TantivyEngine::create(path, writer_memory)
        })
    }
}

impl<E: IndexEngine> Indexer<E> {
    /// An indexer whose shards are built by `factory`, which receives the
    /// shard ordinal and its storage directory.
    pub fn with_engine(
        config: IndexerConfig,
        factory: impl Fn(usize, &Path) -> Result<E> + Send + Sync + 'static,
    ) -> Result<Self> {
        let (shard_count, batch_size) = config.validate()?;
        Ok(Self {
            root: config.root,
            shard_count,
            batch_size,
            factory: Box::new(factory),
            policy: Arc::new(TailRemainder),
            opened: None,
        })
    }

    /// Split later `index` calls with `policy` instead of
    /// [`TailRemainder`]. Takes effect on the next `open`.
    pub fn with_policy(
        mut self,
        policy: impl PartitionPolicy + 'static,
    ) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count.get()
    }

    pub fn is_open(&self) -> bool {
        self.opened.is_some()
    }

    /// Create the storage root and every shard.
    ///
    /// If a shard cannot be created, the shards opened so far are released
    /// and the indexer stays closed, so `open` may be retried. Their
    /// directories are left on disk.
    pub fn open(&mut self) -> Result<()> {
        if self.opened.is_some() {
            return Err(Error::AlreadyOpen);
        }

        std::fs::create_dir_all(&self.root)
            .map_err(|_| Error::StorageRoot(self.root.clone()))?;

        let mut aggregator = Aggregator::new();
        let shards = ShardSet::create(
            &self.root,
            self.shard_count,
            &*self.factory,
            &mut aggregator,
        )
        .inspect_err(|err| {
            warn!(
                created = aggregator.len(),
                error = %err,
                "releasing shards after failed open"
            );
        })?
        .with_policy(Arc::clone(&self.policy));

        info!(
            root = %self.root.display(),
            shards = shards.len(),
            "indexer open"
        );
        self.opened = Some(Opened { shards, aggregator });
        Ok(())
    }

    /// Partition `records` across the shards and write them all in
    /// parallel, returning once every shard is done.
    ///
    /// Each record is keyed by its position within its shard's range, so
    /// a later call overwrites documents at the same positions.
    ///
    /// If some shards fail, the error lists each of them. Shards that
    /// succeeded keep their records, and a failed shard keeps every batch
    /// it submitted before the failure: the index may be partially
    /// written.
    pub fn index(&self, records: &[Record]) -> Result<IndexReport> {
        let opened = self.opened.as_ref().ok_or(Error::NotOpen)?;

        let mut report = IndexReport::default();
        let mut failures = Vec::new();
        for outcome in opened.shards.write_all(records, self.batch_size)? {
            match outcome {
                Ok(stats) => report.shards.push(stats),
                Err(err) => failures.push(err),
            }
        }

        if !failures.is_empty() {
            return Err(Error::Index(failures));
        }
        info!(
            records = report.records(),
            batches = report.batches(),
            "indexed"
        );
        Ok(report)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let opened = self.opened.as_ref().ok_or(Error::NotOpen)?;
        opened.aggregator.search(request)
    }

    /// Release every shard. The indexer may be opened again afterwards.
    pub fn close(&mut self) -> Result<()> {
        let Opened { shards, aggregator } =
            self.opened.take().ok_or(Error::NotOpen)?;
        drop(aggregator);
        shards.close()?;
        info!(root = %self.root.display(), "indexer closed");
        Ok(())
    }
}

impl<E: IndexEngine> std::fmt::Debug for Indexer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("root", &self.root)
            .field("shard_count", &self.shard_count)
            .field("batch_size", &self.batch_size)
            .field("policy", &self.policy)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
