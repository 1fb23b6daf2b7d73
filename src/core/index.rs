use std::path::Path;
use std::sync::Arc;

use crate::analysis::TokenizerRegistry;
use crate::core::config::IndexConfig;
use crate::core::error::{Error, Result};
use crate::core::types::SnapshotId;
use crate::query::QueryParser;
use crate::reader::{IndexReader, QueryCache};
use crate::schema::{Document, Schema};
use crate::storage::directory::{Directory, FsDirectory, RamDirectory};
use crate::storage::layout::SCHEMA_FILE;
use crate::storage::snapshot::{list_snapshots, load_snapshot, SnapshotTracker};
use crate::writer::IndexWriter;

/// Counters describing the current published state of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub snapshot_id: SnapshotId,
    pub segments: usize,
    pub live_docs: u64,
    pub deleted_docs: u64,
}

/// An index ties a schema, a storage backend, and a tokenizer registry
/// together, and hands out writers and readers.
pub struct Index {
    schema: Schema,
    directory: Arc<dyn Directory>,
    registry: Arc<TokenizerRegistry>,
    tracker: Arc<SnapshotTracker>,
    config: IndexConfig,
    cache: Option<Arc<QueryCache>>,
}

impl Index {
    /// Create a fresh index on `directory`, persisting the schema.
    pub fn create(directory: Arc<dyn Directory>, schema: Schema) -> Result<Index> {
        Self::create_with_config(directory, schema, IndexConfig::default())
    }

    pub fn create_with_config(
        directory: Arc<dyn Directory>,
        schema: Schema,
        config: IndexConfig,
    ) -> Result<Index> {
        if directory.exists(SCHEMA_FILE) {
            return Err(Error::storage("an index already exists in this directory"));
        }
        let schema_json = serde_json::to_vec_pretty(&schema)?;
        directory.write_atomic(SCHEMA_FILE, &schema_json)?;
        Ok(Self::assemble(directory, schema, config, 0))
    }

    /// Ephemeral in-memory index, mostly for tests and scratch work.
    pub fn create_in_ram(schema: Schema) -> Result<Index> {
        Self::create(Arc::new(RamDirectory::new()), schema)
    }

    pub fn create_in_dir(path: impl AsRef<Path>, schema: Schema) -> Result<Index> {
        Self::create(Arc::new(FsDirectory::open(path.as_ref())?), schema)
    }

    /// Directory-backed index honoring the config's durability policy.
    pub fn create_in_dir_with_config(
        path: impl AsRef<Path>,
        schema: Schema,
        config: IndexConfig,
    ) -> Result<Index> {
        let directory = FsDirectory::open_with_durability(path.as_ref(), config.durability)?;
        Self::create_with_config(Arc::new(directory), schema, config)
    }

    /// Open an existing index, reading back its schema and latest
    /// snapshot.
    pub fn open(directory: Arc<dyn Directory>) -> Result<Index> {
        Self::open_with_config(directory, IndexConfig::default())
    }

    pub fn open_with_config(directory: Arc<dyn Directory>, config: IndexConfig) -> Result<Index> {
        let schema_bytes = directory.read(SCHEMA_FILE)?;
        let schema: Schema = serde_json::from_slice(&schema_bytes)?;
        let latest = list_snapshots(directory.as_ref())?.last().copied().unwrap_or(0);
        Ok(Self::assemble(directory, schema, config, latest))
    }

    pub fn open_in_dir(path: impl AsRef<Path>) -> Result<Index> {
        Self::open(Arc::new(FsDirectory::open(path.as_ref())?))
    }

    fn assemble(
        directory: Arc<dyn Directory>,
        schema: Schema,
        config: IndexConfig,
        latest: SnapshotId,
    ) -> Index {
        let tracker = SnapshotTracker::new(directory.clone(), latest);
        let cache = QueryCache::new(config.query_cache_size);
        Index {
            schema,
            directory,
            registry: Arc::new(TokenizerRegistry::default()),
            tracker,
            config,
            cache,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The index's analyzer catalog. Custom registrations must happen
    /// before the affected fields are indexed or queried.
    pub fn tokenizers(&self) -> &Arc<TokenizerRegistry> {
        &self.registry
    }

    /// Open the single writer. Fails with `WriterLockHeld` while
    /// another writer on this index is alive.
    pub fn writer(&self) -> Result<IndexWriter> {
        self.writer_with_budget(self.config.memory_budget)
    }

    pub fn writer_with_budget(&self, memory_budget: usize) -> Result<IndexWriter> {
        IndexWriter::new(
            self.schema.clone(),
            self.directory.clone(),
            self.registry.clone(),
            self.tracker.clone(),
            memory_budget,
            self.config.worker_count(),
        )
    }

    /// Reader bound to the latest snapshot; `reload` to follow commits.
    pub fn reader(&self) -> Result<IndexReader> {
        IndexReader::open(
            self.schema.clone(),
            self.directory.clone(),
            self.tracker.clone(),
            self.cache.clone(),
        )
    }

    /// Query parser over this index's schema and analyzers.
    pub fn parser(&self, default_fields: &[&str]) -> QueryParser {
        QueryParser::new(
            self.schema.clone(),
            self.registry.clone(),
            default_fields.iter().map(|f| f.to_string()).collect(),
        )
    }

    /// Convenience single-document ingestion: opens a short-lived
    /// writer, commits, and closes. Bulk loads should hold their own
    /// writer instead.
    pub fn add_document(&self, doc: &Document) -> Result<SnapshotId> {
        let mut writer = self.writer()?;
        writer.add_document(doc)?;
        writer.commit()
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let snapshot_id = self.tracker.latest();
        if snapshot_id == 0 {
            return Ok(IndexStats {
                snapshot_id: 0,
                segments: 0,
                live_docs: 0,
                deleted_docs: 0,
            });
        }
        let meta = load_snapshot(self.directory.as_ref(), snapshot_id)?;
        let mut live_docs = 0;
        let mut deleted_docs = 0;
        for segment in &meta.segments {
            let deleted = segment.deleted_docs()?.len();
            deleted_docs += deleted;
            live_docs += segment.doc_count as u64 - deleted;
        }
        Ok(IndexStats {
            snapshot_id,
            segments: meta.segments.len(),
            live_docs,
            deleted_docs,
        })
    }

    /// Eagerly reap superseded, unreferenced snapshots. Also runs
    /// automatically when a searcher releases the last reference to a
    /// superseded snapshot.
    pub fn garbage_collect(&self) -> Result<usize> {
        self.tracker.garbage_collect()
    }
}
