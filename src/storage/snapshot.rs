use parking_lot::Mutex;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::error::{Error, Result};
use crate::core::types::{SegmentId, SnapshotId};
use crate::storage::directory::Directory;
use crate::storage::layout;

/// One segment's entry in a snapshot descriptor: identity plus the
/// deletion bitmap as of this snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRef {
    pub segment_id: SegmentId,
    pub doc_count: u32,
    /// Serialized roaring bitmap; empty means nothing deleted.
    pub deletes: Vec<u8>,
}

impl SegmentRef {
    pub fn new(segment_id: SegmentId, doc_count: u32, deleted: &RoaringBitmap) -> Result<Self> {
        let mut deletes = Vec::new();
        if !deleted.is_empty() {
            deleted
                .serialize_into(&mut deletes)
                .map_err(|e| Error::storage(format!("bitmap serialize: {}", e)))?;
        }
        Ok(SegmentRef {
            segment_id,
            doc_count,
            deletes,
        })
    }

    pub fn deleted_docs(&self) -> Result<RoaringBitmap> {
        if self.deletes.is_empty() {
            return Ok(RoaringBitmap::new());
        }
        RoaringBitmap::deserialize_from(&self.deletes[..])
            .map_err(|e| Error::storage(format!("bitmap deserialize: {}", e)))
    }

    pub fn live_doc_count(&self) -> Result<u64> {
        Ok(self.doc_count as u64 - self.deleted_docs()?.len())
    }
}

/// Atomically published description of what a reader may see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub id: SnapshotId,
    pub segments: Vec<SegmentRef>,
}

impl SnapshotMeta {
    pub fn empty(id: SnapshotId) -> Self {
        SnapshotMeta {
            id,
            segments: Vec::new(),
        }
    }
}

pub fn list_snapshots(directory: &dyn Directory) -> Result<Vec<SnapshotId>> {
    let mut ids: Vec<SnapshotId> = directory
        .list()?
        .iter()
        .filter_map(|name| layout::parse_snapshot_file(name))
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

pub fn load_snapshot(directory: &dyn Directory, id: SnapshotId) -> Result<SnapshotMeta> {
    let bytes = directory.read(&layout::snapshot_file(id)).map_err(|_| {
        Error::new(
            crate::core::error::ErrorKind::SnapshotGone,
            format!("snapshot {} is no longer on storage", id),
        )
    })?;
    Ok(bincode::deserialize(&bytes)?)
}

pub fn latest_snapshot(directory: &dyn Directory) -> Result<Option<SnapshotMeta>> {
    match list_snapshots(directory)?.last() {
        Some(&id) => Ok(Some(load_snapshot(directory, id)?)),
        None => Ok(None),
    }
}

/// Durably publish a snapshot descriptor. The write is all-or-nothing;
/// on failure the previous snapshot remains the latest.
pub fn commit_snapshot(directory: &dyn Directory, meta: &SnapshotMeta) -> Result<()> {
    let bytes = bincode::serialize(meta)?;
    directory.write_atomic(&layout::snapshot_file(meta.id), &bytes)
}

/// Tracks which snapshots live readers still reference, and reaps
/// superseded, unreferenced snapshots together with their orphan
/// segment files.
pub struct SnapshotTracker {
    directory: Arc<dyn Directory>,
    refs: Mutex<HashMap<SnapshotId, usize>>,
    latest: AtomicU64,
}

impl SnapshotTracker {
    pub fn new(directory: Arc<dyn Directory>, latest: SnapshotId) -> Arc<Self> {
        Arc::new(SnapshotTracker {
            directory,
            refs: Mutex::new(HashMap::new()),
            latest: AtomicU64::new(latest),
        })
    }

    pub fn latest(&self) -> SnapshotId {
        self.latest.load(Ordering::Acquire)
    }

    pub fn publish(&self, id: SnapshotId) {
        self.latest.store(id, Ordering::Release);
    }

    pub fn retain(self: &Arc<Self>, id: SnapshotId) -> SnapshotRefGuard {
        *self.refs.lock().entry(id).or_insert(0) += 1;
        SnapshotRefGuard {
            id,
            tracker: self.clone(),
        }
    }

    fn release(&self, id: SnapshotId) {
        let mut refs = self.refs.lock();
        if let Some(count) = refs.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                refs.remove(&id);
            }
        }
        drop(refs);
        if id < self.latest() {
            // The snapshot is superseded and just lost its last reader.
            if let Err(e) = self.garbage_collect() {
                log::warn!("snapshot gc failed: {}", e);
            }
        }
    }

    /// Delete every snapshot that is superseded and unreferenced, then
    /// every segment file no remaining snapshot references.
    pub fn garbage_collect(&self) -> Result<usize> {
        let latest = self.latest();
        let referenced: HashSet<SnapshotId> = self.refs.lock().keys().copied().collect();
        let mut reaped = 0;

        for id in list_snapshots(self.directory.as_ref())? {
            if id < latest && !referenced.contains(&id) {
                self.directory.delete(&layout::snapshot_file(id))?;
                log::debug!("reaped snapshot {}", id);
                reaped += 1;
            }
        }

        // Segment files still referenced by any remaining snapshot stay.
        let mut live_segments: HashSet<String> = HashSet::new();
        for id in list_snapshots(self.directory.as_ref())? {
            let meta = load_snapshot(self.directory.as_ref(), id)?;
            for segment in &meta.segments {
                live_segments.insert(layout::segment_file(segment.segment_id));
            }
        }
        for name in self.directory.list()? {
            if layout::is_segment_file(&name) && !live_segments.contains(&name) {
                self.directory.delete(&name)?;
                log::debug!("reaped segment file {}", name);
            }
        }
        Ok(reaped)
    }
}

/// Keeps one snapshot alive for the lifetime of a searcher.
pub struct SnapshotRefGuard {
    id: SnapshotId,
    tracker: Arc<SnapshotTracker>,
}

impl SnapshotRefGuard {
    pub fn id(&self) -> SnapshotId {
        self.id
    }
}

impl Drop for SnapshotRefGuard {
    fn drop(&mut self) {
        self.tracker.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::directory::RamDirectory;

    #[test]
    fn test_snapshot_meta_round_trip() {
        let directory = RamDirectory::new();
        let mut deleted = RoaringBitmap::new();
        deleted.insert(3);
        let meta = SnapshotMeta {
            id: 1,
            segments: vec![SegmentRef::new(SegmentId::generate(), 10, &deleted).unwrap()],
        };
        commit_snapshot(&directory, &meta).unwrap();
        let reread = load_snapshot(&directory, 1).unwrap();
        assert_eq!(reread.segments.len(), 1);
        assert_eq!(reread.segments[0].live_doc_count().unwrap(), 9);
        assert!(reread.segments[0].deleted_docs().unwrap().contains(3));
    }

    #[test]
    fn test_gc_keeps_referenced_and_latest_snapshots() {
        let directory: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        for id in 1..=3u64 {
            commit_snapshot(directory.as_ref(), &SnapshotMeta::empty(id)).unwrap();
        }
        let tracker = SnapshotTracker::new(directory.clone(), 3);
        let guard = tracker.retain(2);
        tracker.garbage_collect().unwrap();
        // 1 is reaped; 2 is referenced; 3 is latest.
        assert_eq!(list_snapshots(directory.as_ref()).unwrap(), vec![2, 3]);
        drop(guard);
        // Releasing the last reference on a superseded snapshot reaps it.
        assert_eq!(list_snapshots(directory.as_ref()).unwrap(), vec![3]);
    }

    #[test]
    fn test_missing_snapshot_is_snapshot_gone() {
        let directory = RamDirectory::new();
        let err = load_snapshot(&directory, 42).unwrap_err();
        assert_eq!(
            err.kind,
            crate::core::error::ErrorKind::SnapshotGone
        );
    }
}
