use std::{num::NonZeroUsize, ops::Range, path::Path, sync::Arc};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    aggregator::Aggregator,
    batch::WriteStats,
    engine::{EngineFactory, IndexEngine},
    error::Result,
    partition::{self, PartitionPolicy, TailRemainder},
    record::Record,
    shard::Shard,
};

/// The fixed, ordered set of shards created by one `open`.
#[derive(Debug)]
pub struct ShardSet<E> {
    shards: Vec<Arc<Shard<E>>>,
    count: NonZeroUsize,
    policy: Arc<dyn PartitionPolicy>,
}

impl<E: IndexEngine> ShardSet<E> {
    /// Create `count` shards under `root`, registering each with
    /// `aggregator` as soon as it exists.
    ///
    /// Stops at the first shard that cannot be created. Shards created
    /// before it stay registered with `aggregator`; dropping the aggregator
    /// releases them.
    pub fn create(
        root: &Path,
        count: NonZeroUsize,
        factory: &EngineFactory<E>,
        aggregator: &mut Aggregator<E>,
    ) -> Result<Self> {
        let mut shards = Vec::with_capacity(count.get());
        for ordinal in 0..count.get() {
            let shard = Arc::new(Shard::create(root, ordinal, factory)?);
            info!(
                shard = ordinal,
                path = %shard.path().display(),
                "adding shard"
            );
            aggregator.register(Arc::clone(&shard));
            shards.push(shard);
        }

        Ok(Self {
            shards,
            count,
            policy: Arc::new(TailRemainder),
        })
    }

    /// Replace the partition policy used by later [`ShardSet::write_all`]
    /// calls.
    pub fn with_policy(mut self, policy: Arc<dyn PartitionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shard<E>> {
        self.shards.iter().map(AsRef::as_ref)
    }

    /// Range of `len` input records each shard receives, in shard order.
    ///
    /// Fails with [`Error::Config`](crate::Error::Config) if the policy
    /// does not hand every record to exactly one shard.
    pub fn assign(&self, len: usize) -> Result<Vec<Range<usize>>> {
        let ranges = self.policy.ranges(len, self.count);
        partition::check_ranges(&ranges, len, self.count)?;
        Ok(ranges)
    }

    /// Write `records` across all shards in parallel and wait for every
    /// shard to finish.
    ///
    /// Returns one outcome per shard, in shard order. A failing shard does
    /// not stop the others. Nothing is written if the partition is invalid.
    pub fn write_all(
        &self,
        records: &[Record],
        batch_size: NonZeroUsize,
    ) -> Result<Vec<Result<WriteStats>>> {
        let ranges = self.assign(records.len())?;
        debug!(?ranges, "partitioned records");

        let outcomes = self
            .shards
            .par_iter()
            .zip(ranges)
            .map(|(shard, range)| {
                let outcome = shard.write_all(&records[range], batch_size);
                if let Err(err) = &outcome {
                    warn!(
                        shard = shard.ordinal(),
                        error = %err,
                        "shard write failed"
                    );
                }
                outcome
            })
            .collect();
        Ok(outcomes)
    }

    /// Close every shard, continuing past failures.
    ///
    /// Shards still referenced elsewhere (e.g. by a live aggregator) are
    /// only dropped here.
    pub fn close(self) -> Result<()> {
        let mut first_error = None;
        for shard in self.shards {
            let ordinal = shard.ordinal();
            match Arc::try_unwrap(shard) {
                Ok(shard) => {
                    if let Err(err) = shard.close() {
                        warn!(shard = ordinal, error = %err, "closing shard");
                        first_error.get_or_insert(err);
                    }
                }
                Err(_) => {
                    warn!(shard = ordinal, "shard still in use, not closed")
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{MIN_WRITER_MEMORY, TantivyEngine},
        error::Error,
        search::SearchRequest,
    };

    fn tantivy() -> Box<EngineFactory<TantivyEngine>> {
        Box::new(|_: usize, path: &Path| {
            TantivyEngine::create(path, MIN_WRITER_MEMORY)
        })
    }

    fn count(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn create(
        root: &Path,
        n: usize,
        agg: &mut Aggregator<TantivyEngine>,
    ) -> Result<ShardSet<TantivyEngine>> {
        ShardSet::create(root, count(n), &*tantivy(), agg)
    }

    fn hotels(n: usize) -> Vec<Record> {
        (0..n).map(|i| Record::named(format!("hotel{i}"))).collect()
    }

    /// Sends everything to the first shard.
    #[derive(Debug)]
    struct FrontLoaded;

    impl PartitionPolicy for FrontLoaded {
        fn ranges(
            &self,
            len: usize,
            shards: NonZeroUsize,
        ) -> Vec<Range<usize>> {
            let mut ranges = vec![len..len; shards.get()];
            ranges[0] = 0..len;
            ranges
        }
    }

    /// Only covers the first half of the input, with a single range.
    #[derive(Debug)]
    struct FirstHalf;

    impl PartitionPolicy for FirstHalf {
        fn ranges(&self, len: usize, _: NonZeroUsize) -> Vec<Range<usize>> {
            vec![0..len / 2]
        }
    }

    /// Points past the end of the input.
    #[derive(Debug)]
    struct Overreaching;

    impl PartitionPolicy for Overreaching {
        fn ranges(
            &self,
            len: usize,
            shards: NonZeroUsize,
        ) -> Vec<Range<usize>> {
            let mut ranges = TailRemainder.ranges(len, shards);
            if let Some(last) = ranges.last_mut() {
                last.end += 10;
            }
            ranges
        }
    }

    #[test]
    fn every_shard_is_registered() {
        let tmp = tempfile::tempdir().unwrap();
        let mut agg = Aggregator::new();
        let set = create(tmp.path(), 4, &mut agg).unwrap();

        assert_eq!(set.len(), 4);
        assert_eq!(agg.len(), 4);
        let ordinals: Vec<_> = set.iter().map(Shard::ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3]);
        for ordinal in 0..4 {
            assert!(tmp.path().join(ordinal.to_string()).is_dir());
        }
    }

    #[test]
    fn creation_stops_at_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("2"), "in the way").unwrap();

        let mut agg = Aggregator::new();
        let err = create(tmp.path(), 4, &mut agg).unwrap_err();

        assert!(matches!(err, Error::ShardCreate { shard: 2, .. }));
        assert_eq!(agg.len(), 2);
        assert!(!tmp.path().join("3").exists());
    }

    #[test]
    fn records_land_in_their_assigned_shard() {
        let tmp = tempfile::tempdir().unwrap();
        let mut agg = Aggregator::new();
        let set = create(tmp.path(), 3, &mut agg).unwrap();

        let records = hotels(8);
        let outcomes = set.write_all(&records, count(2)).unwrap();
        let written: Vec<_> = outcomes
            .into_iter()
            .map(|o| o.unwrap().records)
            .collect();
        assert_eq!(written, vec![2, 2, 4]);

        let counts: Vec<_> = set
            .iter()
            .map(|s| s.engine().num_docs().unwrap())
            .collect();
        assert_eq!(counts, vec![2, 2, 4]);

        let found = agg.search(&SearchRequest::new("hotel7")).unwrap();
        assert_eq!(found.hits.len(), 1);
        assert_eq!(found.hits[0].shard, 2);
        assert_eq!(found.hits[0].key, "3");
    }

    #[test]
    fn policy_is_swappable() {
        let tmp = tempfile::tempdir().unwrap();
        let mut agg = Aggregator::new();
        let set = create(tmp.path(), 3, &mut agg)
            .unwrap()
            .with_policy(Arc::new(FrontLoaded));

        assert_eq!(set.assign(5).unwrap(), vec![0..5, 5..5, 5..5]);

        let outcomes = set.write_all(&hotels(5), count(2)).unwrap();
        let written: Vec<_> = outcomes
            .into_iter()
            .map(|o| o.unwrap().records)
            .collect();
        assert_eq!(written, vec![5, 0, 0]);
    }

    #[test]
    fn partial_partition_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut agg = Aggregator::new();
        let set = create(tmp.path(), 3, &mut agg)
            .unwrap()
            .with_policy(Arc::new(FirstHalf));

        let err = set.write_all(&hotels(6), count(2)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let counts: Vec<_> = set
            .iter()
            .map(|s| s.engine().num_docs().unwrap())
            .collect();
        assert_eq!(counts, vec![0, 0, 0]);
    }

    #[test]
    fn out_of_bounds_partition_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut agg = Aggregator::new();
        let set = create(tmp.path(), 2, &mut agg)
            .unwrap()
            .with_policy(Arc::new(Overreaching));

        let err = set.write_all(&hotels(4), count(2)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn close_releases_unshared_shards() {
        let tmp = tempfile::tempdir().unwrap();
        let mut agg = Aggregator::new();
        let set = create(tmp.path(), 2, &mut agg).unwrap();
        drop(agg);

        set.close().unwrap();
        // The writer locks are gone, so the shards can be opened again.
        let mut agg = Aggregator::new();
        create(tmp.path(), 2, &mut agg).unwrap();
    }
}
