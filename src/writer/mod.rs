pub mod index_writer;
pub mod segment_builder;

pub use index_writer::IndexWriter;
pub use segment_builder::build_segment;
