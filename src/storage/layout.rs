use crate::core::types::{SegmentId, SnapshotId};

/// File naming inside an index directory. Everything lives flat under
/// the root; names are the only structure.

pub const SCHEMA_FILE: &str = "schema.json";
pub const WRITER_LOCK: &str = "writer.lock";

const SNAPSHOT_PREFIX: &str = "snapshot-";
const SNAPSHOT_SUFFIX: &str = ".meta";
const SEGMENT_PREFIX: &str = "segment-";
const SEGMENT_SUFFIX: &str = ".seg";

/// Zero-padded so lexicographic file order equals snapshot order.
pub fn snapshot_file(id: SnapshotId) -> String {
    format!("{}{:020}{}", SNAPSHOT_PREFIX, id, SNAPSHOT_SUFFIX)
}

pub fn parse_snapshot_file(name: &str) -> Option<SnapshotId> {
    name.strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(SNAPSHOT_SUFFIX)?
        .parse()
        .ok()
}

pub fn segment_file(id: SegmentId) -> String {
    format!("{}{}{}", SEGMENT_PREFIX, id.0.simple(), SEGMENT_SUFFIX)
}

pub fn is_segment_file(name: &str) -> bool {
    name.starts_with(SEGMENT_PREFIX) && name.ends_with(SEGMENT_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_names_round_trip_and_sort() {
        assert_eq!(parse_snapshot_file(&snapshot_file(7)), Some(7));
        assert_eq!(parse_snapshot_file("segment-x.seg"), None);
        assert!(snapshot_file(2) < snapshot_file(10));
    }

    #[test]
    fn test_segment_name_shape() {
        let name = segment_file(SegmentId::generate());
        assert!(is_segment_file(&name));
    }
}
