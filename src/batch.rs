//! Accumulate/flush state machine for one shard's writes.

use std::{num::NonZeroUsize, ops::Range};

use tracing::debug;

use crate::{
    engine::IndexEngine,
    error::{Error, Result},
    record::Record,
};

/// Whether the batch must be submitted right after staging the record at
/// `position`.
///
/// The first flush happens after position `batch_size`, so the first batch
/// of a write holds one record more than the following ones.
pub fn should_flush(position: usize, batch_size: NonZeroUsize) -> bool {
    position != 0 && position % batch_size.get() == 0
}

/// Positions covered by each batch a write of `len` records submits, in
/// submission order.
///
/// The last range is always present, even when empty: the remaining batch
/// is submitted unconditionally.
pub fn flush_plan(len: usize, batch_size: NonZeroUsize) -> Vec<Range<usize>> {
    let mut plan = Vec::new();
    let mut start = 0;
    for position in 0..len {
        if should_flush(position, batch_size) {
            plan.push(start..position + 1);
            start = position + 1;
        }
    }
    plan.push(start..len);
    plan
}

/// What a completed shard write did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub records: usize,
    pub batches: usize,
}

/// Stages records into an open batch and submits it whenever
/// [`should_flush`] says so.
///
/// Staged records only become visible once [`BatchWriter::finish`]
/// submits the trailing batch. Dropping the writer discards that batch.
pub struct BatchWriter<'a, E: IndexEngine> {
    engine: &'a E,
    shard: usize,
    batch_size: NonZeroUsize,
    open: E::Batch,
    position: usize,
    submitted: usize,
}

impl<'a, E: IndexEngine> BatchWriter<'a, E> {
    pub fn new(engine: &'a E, shard: usize, batch_size: NonZeroUsize) -> Self {
        Self {
            engine,
            shard,
            batch_size,
            open: engine.new_batch(),
            position: 0,
            submitted: 0,
        }
    }

    /// Stage `record` under its local position and flush if the threshold
    /// was reached.
    pub fn stage(&mut self, record: &Record) -> Result<()> {
        let key = self.position.to_string();
        self.engine
            .stage(&mut self.open, &key, record)
            .map_err(|e| Error::Stage {
                shard: self.shard,
                record: record.name.clone(),
                source: Box::new(e),
            })?;

        if should_flush(self.position, self.batch_size) {
            self.flush()?;
        }
        self.position += 1;
        Ok(())
    }

    /// Submit the remaining batch, empty or not.
    pub fn finish(mut self) -> Result<WriteStats> {
        self.flush()?;
        Ok(WriteStats {
            records: self.position,
            batches: self.submitted,
        })
    }

    fn flush(&mut self) -> Result<()> {
        let batch = std::mem::replace(&mut self.open, self.engine.new_batch());
        self.engine.submit(batch).map_err(|e| Error::Submit {
            shard: self.shard,
            batch: self.submitted,
            source: Box::new(e),
        })?;
        debug!(
            shard = self.shard,
            batch = self.submitted,
            through = self.position,
            "submitted batch"
        );
        self.submitted += 1;
        Ok(())
    }
}
