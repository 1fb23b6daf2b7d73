use roaring::RoaringBitmap;
use std::sync::Arc;

use crate::analysis::TokenizerRegistry;
use crate::core::config::MIN_MEMORY_BUDGET;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{SegmentId, SnapshotId};
use crate::query::Query;
use crate::reader::segment_reader::SegmentReader;
use crate::schema::{validate_document, CompactDocument, Document, Schema, Value};
use crate::search::executor::matching_docs;
use crate::storage::directory::{Directory, DirectoryLock};
use crate::storage::layout;
use crate::storage::snapshot::{
    commit_snapshot, latest_snapshot, SegmentRef, SnapshotMeta, SnapshotTracker,
};
use crate::writer::segment_builder::build_segment;

/// A segment materialized ahead of commit but not yet published.
#[derive(Debug, Clone, Copy)]
struct PendingSegment {
    id: SegmentId,
    doc_count: u32,
}

/// Single writer over an index, holding the exclusive writer lock for
/// its whole lifetime. Buffers documents and staged deletions; nothing
/// becomes reader-visible before [`IndexWriter::commit`] returns.
pub struct IndexWriter {
    schema: Schema,
    directory: Arc<dyn Directory>,
    registry: Arc<TokenizerRegistry>,
    tracker: Arc<SnapshotTracker>,
    _lock: Box<dyn DirectoryLock>,
    pool: rayon::ThreadPool,
    memory_budget: usize,
    buffer: Vec<CompactDocument>,
    buffered_bytes: usize,
    staged_deletes: Vec<Query>,
    pending: Vec<PendingSegment>,
    drop_prior: bool,
}

impl std::fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriter").finish_non_exhaustive()
    }
}

impl IndexWriter {
    pub(crate) fn new(
        schema: Schema,
        directory: Arc<dyn Directory>,
        registry: Arc<TokenizerRegistry>,
        tracker: Arc<SnapshotTracker>,
        memory_budget: usize,
        workers: usize,
    ) -> Result<IndexWriter> {
        let lock = directory.acquire_lock(layout::WRITER_LOCK)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .map_err(|e| Error::storage(format!("worker pool: {}", e)))?;
        Ok(IndexWriter {
            schema,
            directory,
            registry,
            tracker,
            _lock: lock,
            pool,
            memory_budget: memory_budget.max(MIN_MEMORY_BUDGET),
            buffer: Vec::new(),
            buffered_bytes: 0,
            staged_deletes: Vec::new(),
            pending: Vec::new(),
            drop_prior: false,
        })
    }

    /// Validate and buffer one document. May preemptively materialize a
    /// segment when the memory budget is exceeded; nothing is published
    /// either way.
    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        let compact = validate_document(&self.schema, doc)?;
        self.buffered_bytes += estimate_doc_bytes(&compact);
        self.buffer.push(compact);
        if self.buffered_bytes >= self.memory_budget {
            self.flush()?;
        }
        Ok(())
    }

    /// Stage a deletion. Applied against every segment, old and new, at
    /// the next commit.
    pub fn delete_documents(&mut self, query: Query) -> Result<()> {
        query.validate(&self.schema)?;
        self.staged_deletes.push(query);
        Ok(())
    }

    /// Drop everything staged so far and mark all previously published
    /// documents deleted at the next commit. Documents added after this
    /// call survive.
    pub fn delete_all_documents(&mut self) -> Result<()> {
        self.discard_pending()?;
        self.buffer.clear();
        self.buffered_bytes = 0;
        self.staged_deletes.clear();
        self.drop_prior = true;
        Ok(())
    }

    /// Number of documents currently buffered in memory.
    pub fn buffered_docs(&self) -> usize {
        self.buffer.len()
    }

    /// Materialize the in-memory buffer into an unpublished segment.
    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let docs = std::mem::take(&mut self.buffer);
        self.buffered_bytes = 0;
        let segment = self
            .pool
            .install(|| build_segment(&self.schema, &self.registry, &docs))?;
        let bytes = segment.to_bytes()?;
        self.directory
            .write_atomic(&layout::segment_file(segment.segment_id), &bytes)?;
        log::debug!(
            "flushed segment {} ({} docs, {} bytes)",
            segment.segment_id.short(),
            segment.doc_count,
            bytes.len()
        );
        self.pending.push(PendingSegment {
            id: segment.segment_id,
            doc_count: segment.doc_count,
        });
        Ok(())
    }

    /// Materialize the remaining buffer, apply staged deletions, and
    /// atomically publish the next snapshot. On error the writer state
    /// is preserved for retry.
    pub fn commit(&mut self) -> Result<SnapshotId> {
        self.flush()?;

        let prior: Vec<SegmentRef> = if self.drop_prior {
            Vec::new()
        } else {
            latest_snapshot(self.directory.as_ref())?
                .map(|meta| meta.segments)
                .unwrap_or_default()
        };

        let mut segments: Vec<(SegmentId, u32, RoaringBitmap)> = Vec::new();
        for segment_ref in &prior {
            segments.push((
                segment_ref.segment_id,
                segment_ref.doc_count,
                segment_ref.deleted_docs()?,
            ));
        }
        for pending in &self.pending {
            segments.push((pending.id, pending.doc_count, RoaringBitmap::new()));
        }

        // Deletions apply at publication, against old and new segments
        // alike.
        if !self.staged_deletes.is_empty() {
            for (segment_id, _, deleted) in &mut segments {
                let bytes = self.directory.read(&layout::segment_file(*segment_id))?;
                let reader = SegmentReader::open(&bytes, deleted.clone())?;
                for query in &self.staged_deletes {
                    for doc in matching_docs(&self.schema, &reader, query)? {
                        deleted.insert(doc);
                    }
                }
            }
        }

        let snapshot_id = self.tracker.latest() + 1;
        let mut meta = SnapshotMeta::empty(snapshot_id);
        for (segment_id, doc_count, deleted) in &segments {
            meta.segments
                .push(SegmentRef::new(*segment_id, *doc_count, deleted)?);
        }
        commit_snapshot(self.directory.as_ref(), &meta)
            .map_err(|e| Error::new(ErrorKind::Commit, e.to_string()))?;
        self.tracker.publish(snapshot_id);
        log::info!(
            "committed snapshot {} ({} segments, {} staged deletions)",
            snapshot_id,
            meta.segments.len(),
            self.staged_deletes.len()
        );

        self.pending.clear();
        self.staged_deletes.clear();
        self.drop_prior = false;
        Ok(snapshot_id)
    }

    /// Discard buffered documents, staged deletions, and any
    /// pre-flushed segments. The published snapshot is untouched.
    pub fn rollback(&mut self) -> Result<()> {
        self.buffer.clear();
        self.buffered_bytes = 0;
        self.staged_deletes.clear();
        self.drop_prior = false;
        self.discard_pending()?;
        log::debug!("writer rolled back to snapshot {}", self.tracker.latest());
        Ok(())
    }

    fn discard_pending(&mut self) -> Result<()> {
        for pending in std::mem::take(&mut self.pending) {
            // A pending segment was never published; its file is ours.
            if let Err(e) = self.directory.delete(&layout::segment_file(pending.id)) {
                log::warn!(
                    "could not remove unpublished segment {}: {}",
                    pending.id.short(),
                    e
                );
            }
        }
        Ok(())
    }
}

/// Rough heap cost of a buffered document, for budget accounting.
fn estimate_doc_bytes(doc: &CompactDocument) -> usize {
    let mut bytes = 64;
    for (_, value) in &doc.values {
        bytes += 24
            + match value {
                Value::Text(text) => text.len() * 2,
                Value::Bytes(buf) => buf.len(),
                Value::Json(json) => json.to_string().len() * 2,
                Value::Facet(facet) => facet.as_str().len() * 2,
                Value::PreTokenized(pre) => pre.text.len() + pre.tokens.len() * 48,
                _ => 8,
            };
    }
    bytes
}
