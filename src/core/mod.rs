pub mod config;
pub mod error;
pub mod index;
pub mod types;

pub use config::IndexConfig;
pub use error::{Error, ErrorKind, Result};
pub use index::{Index, IndexStats};
pub use types::{DocAddress, DocId, SegmentId, SnapshotId};
