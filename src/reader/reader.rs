use parking_lot::RwLock;
use std::sync::Arc;

use crate::core::error::Result;
use crate::reader::cache::QueryCache;
use crate::reader::searcher::Searcher;
use crate::reader::segment_reader::SegmentReader;
use crate::schema::Schema;
use crate::storage::directory::Directory;
use crate::storage::layout;
use crate::storage::snapshot::{load_snapshot, SnapshotTracker};

/// Reader handle over an index. Hands out point-in-time [`Searcher`]s
/// bound to the snapshot that was latest at the last `reload` (or
/// open). Cheap to clone a searcher; reload to pick up new commits.
pub struct IndexReader {
    schema: Schema,
    directory: Arc<dyn Directory>,
    tracker: Arc<SnapshotTracker>,
    cache: Option<Arc<QueryCache>>,
    current: RwLock<Arc<Searcher>>,
}

impl IndexReader {
    pub(crate) fn open(
        schema: Schema,
        directory: Arc<dyn Directory>,
        tracker: Arc<SnapshotTracker>,
        cache: Option<Arc<QueryCache>>,
    ) -> Result<IndexReader> {
        let searcher = load_searcher(&schema, &directory, &tracker, &cache)?;
        Ok(IndexReader {
            schema,
            directory,
            tracker,
            cache,
            current: RwLock::new(Arc::new(searcher)),
        })
    }

    /// The current point-in-time searcher. Holding the returned `Arc`
    /// pins its snapshot even across reloads.
    pub fn searcher(&self) -> Arc<Searcher> {
        self.current.read().clone()
    }

    /// Rebind to the latest published snapshot.
    pub fn reload(&self) -> Result<()> {
        let searcher = load_searcher(&self.schema, &self.directory, &self.tracker, &self.cache)?;
        *self.current.write() = Arc::new(searcher);
        Ok(())
    }
}

fn load_searcher(
    schema: &Schema,
    directory: &Arc<dyn Directory>,
    tracker: &Arc<SnapshotTracker>,
    cache: &Option<Arc<QueryCache>>,
) -> Result<Searcher> {
    let latest = tracker.latest();
    let guard = tracker.retain(latest);
    let mut segments = Vec::new();
    if latest > 0 {
        let meta = load_snapshot(directory.as_ref(), latest)?;
        for segment_ref in &meta.segments {
            let bytes = directory.read(&layout::segment_file(segment_ref.segment_id))?;
            let reader = SegmentReader::open(&bytes, segment_ref.deleted_docs()?)?;
            segments.push(Arc::new(reader));
        }
    }
    Ok(Searcher::new(schema.clone(), segments, guard, cache.clone()))
}
