//! How a bulk-index call is split across shards.

use std::{num::NonZeroUsize, ops::Range};

use crate::error::{Error, Result};

/// Decides which contiguous range of the input each shard receives.
///
/// Implementations must return exactly `shards` ranges that are
/// contiguous, in order, and together cover `0..len`.
pub trait PartitionPolicy: std::fmt::Debug + Send + Sync {
    fn ranges(&self, len: usize, shards: NonZeroUsize) -> Vec<Range<usize>>;
}

/// Check that `ranges` give each of `shards` shards one contiguous slice
/// and together cover `0..len`, in order.
pub fn check_ranges(
    ranges: &[Range<usize>],
    len: usize,
    shards: NonZeroUsize,
) -> Result<()> {
    if ranges.len() != shards.get() {
        return Err(Error::Config(format!(
            "partition policy returned {} ranges for {shards} shards",
            ranges.len()
        )));
    }

    let mut expected = 0;
    for (shard, range) in ranges.iter().enumerate() {
        if range.start != expected || range.end < range.start {
            return Err(Error::Config(format!(
                "partition policy gave shard {shard} {range:?}, \
                 expected a range starting at {expected}"
            )));
        }
        expected = range.end;
    }
    if expected != len {
        return Err(Error::Config(format!(
            "partition policy covered 0..{expected} of {len} records"
        )));
    }
    Ok(())
}

/// Every shard gets `len / shards` records and the last one also takes
/// the `len % shards` leftover.
///
/// The last shard can end up noticeably larger than the others. That is
/// the intended layout; a balanced split would be a different policy.
///
/// ```
/// use std::num::NonZeroUsize;
/// use shardex::partition::{PartitionPolicy, TailRemainder};
///
/// let ranges = TailRemainder.ranges(11, NonZeroUsize::new(3).unwrap());
/// assert_eq!(ranges, vec![0..3, 3..6, 6..11]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TailRemainder;

impl PartitionPolicy for TailRemainder {
    fn ranges(&self, len: usize, shards: NonZeroUsize) -> Vec<Range<usize>> {
        let shards = shards.get();
        let per_shard = len / shards;
        let leftovers = len % shards;

        let mut from = 0;
        (0..shards)
            .map(|shard| {
                let mut to = from + per_shard;
                if shard == shards - 1 {
                    to += leftovers;
                }
                let range = from..to;
                from = to;
                range
            })
            .collect()
    }
}
