use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document id local to one segment. Assigned densely from 0 in ingestion order.
pub type DocId = u32;

/// Monotonic id of a published snapshot.
pub type SnapshotId = u64;

/// Stable identifier of an immutable segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn generate() -> Self {
        SegmentId(Uuid::new_v4())
    }

    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

/// Globally addressable document location within a snapshot.
///
/// Ordering (segment ordinal, then in-segment doc id) is the score
/// tie-break order for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocAddress {
    pub segment_ord: u32,
    pub doc: DocId,
}

impl DocAddress {
    pub fn new(segment_ord: u32, doc: DocId) -> Self {
        DocAddress { segment_ord, doc }
    }
}
