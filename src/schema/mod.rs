pub mod document;
pub mod facet;
pub mod field;
#[allow(clippy::module_inception)]
pub mod schema;
pub mod value;

pub use document::{validate_document, CompactDocument, Document};
pub use facet::Facet;
pub use field::{Field, FieldEntry, FieldOptions, FieldType};
pub use schema::{Schema, SchemaBuilder};
pub use value::Value;
