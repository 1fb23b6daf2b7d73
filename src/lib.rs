//! lantern — an embeddable full-text search engine.
//!
//! The crate covers the whole corpus lifecycle: typed schemas,
//! analyzer pipelines, buffered writing with atomic snapshot commits
//! and rollback, BM25 search over a tagged query tree with a query
//! string parser, nestable bucket/metric aggregations, and an
//! in-process coordinator that merges results across shards.
//!
//! ```
//! use lantern::schema::{FieldOptions, Schema};
//! use lantern::{Document, Index};
//!
//! let mut builder = Schema::builder();
//! builder.add_text_field("title", FieldOptions::text_stored()).unwrap();
//! builder.add_u64_field("ts", FieldOptions::fast_stored()).unwrap();
//! let schema = builder.build();
//!
//! let index = Index::create_in_ram(schema).unwrap();
//! let mut writer = index.writer().unwrap();
//! let mut doc = Document::new();
//! doc.add_text("title", "The Quick Brown Fox").add_u64("ts", 100);
//! writer.add_document(&doc).unwrap();
//! writer.commit().unwrap();
//!
//! let reader = index.reader().unwrap();
//! let searcher = reader.searcher();
//! let query = index.parser(&["title"]).parse("quick").unwrap();
//! let hits = searcher.search(&query, 10).unwrap();
//! assert_eq!(hits.len(), 1);
//! ```
//!
//! Readers are snapshot-isolated: a [`reader::Searcher`] sees exactly
//! the segments of one committed snapshot, concurrent writers
//! notwithstanding. Writers are exclusive per index, enforced through
//! an advisory lock on the storage backend.

pub mod aggregation;
pub mod analysis;
pub mod core;
pub mod distributed;
pub mod index;
pub mod query;
pub mod reader;
pub mod schema;
pub mod scoring;
pub mod search;
pub mod storage;
pub mod writer;

pub use crate::core::{
    DocAddress, DocId, Error, ErrorKind, Index, IndexConfig, IndexStats, Result, SegmentId,
    SnapshotId,
};
pub use crate::query::{Query, QueryParser};
pub use crate::reader::{IndexReader, Searcher};
pub use crate::schema::{Document, Schema};
pub use crate::search::SearchHit;
pub use crate::writer::IndexWriter;
