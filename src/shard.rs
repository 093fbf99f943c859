use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    batch::{BatchWriter, WriteStats},
    engine::{EngineFactory, IndexEngine, ShardHits},
    error::{Error, Result},
    record::Record,
    search::SearchRequest,
};

/// One index partition: an ordinal, its storage directory and a private
/// engine.
#[derive(Debug)]
pub struct Shard<E> {
    ordinal: usize,
    path: PathBuf,
    engine: E,
}

/// Storage directory of shard `ordinal` under `root`.
pub fn shard_path(root: &Path, ordinal: usize) -> PathBuf {
    root.join(ordinal.to_string())
}

impl<E: IndexEngine> Shard<E> {
    pub fn create(
        root: &Path,
        ordinal: usize,
        factory: &EngineFactory<E>,
    ) -> Result<Self> {
        let path = shard_path(root, ordinal);
        let engine = factory(ordinal, &path).map_err(|e| Error::ShardCreate {
            shard: ordinal,
            path: path.clone(),
            source: Box::new(e),
        })?;

        Ok(Self {
            ordinal,
            path,
            engine,
        })
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Write `records` in order, keyed by their position in the slice.
    ///
    /// On error, batches submitted before the failure stay indexed.
    pub fn write_all(
        &self,
        records: &[Record],
        batch_size: NonZeroUsize,
    ) -> Result<WriteStats> {
        let mut writer =
            BatchWriter::new(&self.engine, self.ordinal, batch_size);
        for record in records {
            writer.stage(record)?;
        }
        let stats = writer.finish()?;

        debug!(
            shard = self.ordinal,
            records = stats.records,
            batches = stats.batches,
            "shard written"
        );
        Ok(stats)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<ShardHits> {
        self.engine.search(request).map_err(|e| Error::Search {
            shard: self.ordinal,
            source: Box::new(e),
        })
    }

    pub fn close(self) -> Result<()> {
        self.engine.close()
    }
}
