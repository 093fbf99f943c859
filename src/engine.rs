//! The single-node index engine each shard is built on.
//!
//! The sharding layer only talks to [`IndexEngine`]. [`TantivyEngine`] is
//! the implementation used outside of tests.

use std::{path::Path, sync::Mutex};

use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    TantivyDocument,
    Term,
    collector::{Count, TopDocs},
    query::QueryParser,
};
use tracing::warn;

use crate::{
    error::{Error, Result},
    record::Record,
    schema::{self, SchemaFields},
    search::SearchRequest,
};

/// Smallest writer memory budget tantivy accepts for one indexing thread.
pub const MIN_WRITER_MEMORY: usize = 15_000_000;

/// A hit as reported by one engine, before it is merged with other shards.
#[derive(Debug, Clone)]
pub struct EngineHit {
    pub score: f32,
    pub key: String,
    pub record: Record,
}

/// Ranked hits of one engine plus the number of documents that matched.
#[derive(Debug, Clone, Default)]
pub struct ShardHits {
    pub total: usize,
    pub hits: Vec<EngineHit>,
}

/// Capabilities a shard needs from its underlying index.
///
/// Writes go through batches: records are staged into a batch and the
/// batch is submitted as one unit. A submitted batch is either fully
/// visible to later searches or not at all.
pub trait IndexEngine: Send + Sync + Sized {
    type Batch: Send;

    fn new_batch(&self) -> Self::Batch;

    /// Add `record` to `batch` under `key`. Staging an existing key
    /// replaces the stored document once the batch is submitted.
    fn stage(
        &self,
        batch: &mut Self::Batch,
        key: &str,
        record: &Record,
    ) -> Result<()>;

    fn submit(&self, batch: Self::Batch) -> Result<()>;

    /// Return the top `from + size` hits of `request`, best first.
    fn search(&self, request: &SearchRequest) -> Result<ShardHits>;

    /// Release the engine, waiting for any background work it owns.
    fn close(self) -> Result<()> {
        Ok(())
    }
}

/// Builds the engine for a shard, given its ordinal and storage directory.
pub type EngineFactory<E> = dyn Fn(usize, &Path) -> Result<E> + Send + Sync;

/// A persistent tantivy index used as one shard.
pub struct TantivyEngine {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: SchemaFields,
}

impl TantivyEngine {
    /// Open the index at `dir`, creating it if it does not exist yet.
    pub fn create(dir: &Path, writer_memory: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let (schema, fields) = schema::build_schema();

        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        let index = if Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?
        {
            Index::open(mmap_dir)?
        } else {
            Index::create(mmap_dir, schema, tantivy::IndexSettings::default())?
        };

        Self::from_index(index, fields, writer_memory)
    }

    /// Create an in-memory engine (for testing).
    pub fn create_in_ram(writer_memory: usize) -> Result<Self> {
        let (schema, fields) = schema::build_schema();
        let index = Index::create_in_ram(schema);
        Self::from_index(index, fields, writer_memory)
    }

    fn from_index(
        index: Index,
        fields: SchemaFields,
        writer_memory: usize,
    ) -> Result<Self> {
        schema::register_tokenizers(&index);
        let reader = index.reader()?;
        let writer = index.writer_with_num_threads(1, writer_memory)?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
        })
    }

    /// Number of searchable documents as of the last submitted batch.
    pub fn num_docs(&self) -> Result<u64> {
        self.reader.reload()?;
        Ok(self.reader.searcher().num_docs())
    }
}

impl IndexEngine for TantivyEngine {
    type Batch = Vec<(String, TantivyDocument)>;

    fn new_batch(&self) -> Self::Batch {
        Vec::new()
    }

    fn stage(
        &self,
        batch: &mut Self::Batch,
        key: &str,
        record: &Record,
    ) -> Result<()> {
        batch.push((key.to_string(), self.fields.to_document(key, record)));
        Ok(())
    }

    fn submit(&self, batch: Self::Batch) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| Error::Poisoned)?;

        let staged = batch.into_iter().try_for_each(|(key, doc)| {
            writer.delete_term(Term::from_field_text(self.fields.key, &key));
            writer.add_document(doc).map(drop)
        });

        match staged.and_then(|()| writer.commit().map(drop)) {
            Ok(()) => Ok(()),
            Err(err) => {
                // Drop whatever made it into the writer so the batch stays
                // all-or-nothing.
                if let Err(rollback) = writer.rollback() {
                    warn!(error = %rollback, "rollback after failed batch");
                }
                Err(err.into())
            }
        }
    }

    fn search(&self, request: &SearchRequest) -> Result<ShardHits> {
        let parser =
            QueryParser::for_index(&self.index, self.fields.searchable());
        let query = parser.parse_query(&request.query)?;

        self.reader.reload()?;
        let searcher = self.reader.searcher();

        // No shard can return more hits than it holds documents.
        let num_docs =
            usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        let limit = request.from.saturating_add(request.size).min(num_docs);
        if limit == 0 {
            let total = searcher.search(&query, &Count)?;
            return Ok(ShardHits {
                total,
                hits: Vec::new(),
            });
        }

        let (top_docs, total) =
            searcher.search(&query, &(TopDocs::with_limit(limit), Count))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            hits.push(EngineHit {
                score,
                key: schema::extract_text(&doc, self.fields.key),
                record: self.fields.to_record(&doc),
            });
        }

        Ok(ShardHits { total, hits })
    }

    fn close(self) -> Result<()> {
        let writer = self.writer.into_inner().map_err(|_| Error::Poisoned)?;
        writer.wait_merging_threads()?;
        Ok(())
    }
}

impl std::fmt::Debug for TantivyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyEngine").finish_non_exhaustive()
    }
}
