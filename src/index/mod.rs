pub mod column;
pub mod posting;
pub mod segment;
pub mod term;

pub use column::{Column, ColumnKind, IpColumn, NumericColumn, StrColumn};
pub use posting::{Posting, PostingList, PostingListBuilder};
pub use segment::{FieldIndexData, FieldStats, SegmentData};
