pub mod bytes;
pub mod directory;
pub mod layout;
pub mod snapshot;

pub use bytes::OwnedBytes;
pub use directory::{Directory, DirectoryLock, Durability, FsDirectory, RamDirectory};
pub use snapshot::{SegmentRef, SnapshotMeta, SnapshotRefGuard, SnapshotTracker};
