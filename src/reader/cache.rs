use lru::LruCache;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::types::SnapshotId;
use crate::query::Query;
use crate::search::SearchHit;

/// LRU cache of top-K results, keyed by (snapshot, query, limit).
/// Snapshot immutability makes entries valid for their whole lifetime;
/// a reload simply stops producing the old snapshot's keys.
pub struct QueryCache {
    entries: Mutex<LruCache<u64, Arc<Vec<SearchHit>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Option<Arc<QueryCache>> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Arc::new(QueryCache {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }))
    }

    pub fn key(snapshot: SnapshotId, query: &Query, limit: usize) -> u64 {
        let mut hasher = DefaultHasher::new();
        snapshot.hash(&mut hasher);
        limit.hash(&mut hasher);
        // The AST serializes deterministically; hashing the rendering
        // avoids a Hash impl over f32 boosts.
        if let Ok(rendered) = serde_json::to_string(query) {
            rendered.hash(&mut hasher);
        }
        hasher.finish()
    }

    pub fn get(&self, key: u64) -> Option<Arc<Vec<SearchHit>>> {
        let found = self.entries.lock().get(&key).cloned();
        match &found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn put(&self, key: u64, hits: Arc<Vec<SearchHit>>) {
        self.entries.lock().put(key, hits);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
