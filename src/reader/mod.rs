pub mod cache;
#[allow(clippy::module_inception)]
pub mod reader;
pub mod searcher;
pub mod segment_reader;

pub use cache::QueryCache;
pub use reader::IndexReader;
pub use searcher::Searcher;
pub use segment_reader::{FieldReader, SegmentReader};
