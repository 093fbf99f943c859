use std::{sync::Arc, time::Instant};

use rayon::prelude::*;

use crate::{
    engine::{IndexEngine, ShardHits},
    error::Result,
    search::{Hit, SearchRequest, SearchResults},
    shard::Shard,
};

/// A storage-less index alias over every registered shard.
///
/// A query goes to all members in parallel. Their hits are merged by
/// descending score; equal scores keep shard order, then in-shard rank.
#[derive(Debug)]
pub struct Aggregator<E> {
    members: Vec<Arc<Shard<E>>>,
}

impl<E> Default for Aggregator<E> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<E: IndexEngine> Aggregator<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly created shard. There is no way to remove one.
    pub fn register(&mut self, shard: Arc<Shard<E>>) {
        self.members.push(shard);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Search every member and merge the hits.
    ///
    /// Fails as a whole if any shard fails; the reported error is the one
    /// of the lowest failing ordinal.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let start = Instant::now();
        let answers: Vec<Result<ShardHits>> = self
            .members
            .par_iter()
            .map(|shard| shard.search(request))
            .collect();

        let answers = answers.into_iter().collect::<Result<Vec<_>>>()?;
        let ordinals = self.members.iter().map(|shard| shard.ordinal());

        let mut results = merge(ordinals.zip(answers), request);
        results.took = start.elapsed();
        Ok(results)
    }
}

/// Merge per-shard answers, given in shard order, into one page.
fn merge(
    answers: impl IntoIterator<Item = (usize, ShardHits)>,
    request: &SearchRequest,
) -> SearchResults {
    let mut total = 0;
    let mut hits = Vec::new();
    for (shard, answer) in answers {
        total += answer.total;
        hits.extend(answer.hits.into_iter().map(|hit| Hit {
            shard,
            key: hit.key,
            score: hit.score,
            record: hit.record,
        }));
    }

    // Stable, so ties stay in shard order then in-shard rank.
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    let max_score = hits.first().map(|hit| hit.score);
    let hits = hits
        .into_iter()
        .skip(request.from)
        .take(request.size)
        .collect();

    SearchResults {
        total,
        max_score,
        hits,
        took: Default::default(),
    }
}
