use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, Result};

/// Stable handle to a schema field, assigned in declaration order.
///
/// Handles are the only field identifier persisted inside segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    U64,
    I64,
    F64,
    Bool,
    Date,
    Bytes,
    Json,
    IpAddr,
    Facet,
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::U64 | FieldType::I64 | FieldType::F64 | FieldType::Bool | FieldType::Date
        )
    }
}

/// Indexing options for a field.
///
/// Built through the chainable constructors; composites such as
/// [`FieldOptions::indexed_stored`] mirror the common combinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldOptions {
    pub indexed: bool,
    pub stored: bool,
    pub fast: bool,
    pub positions: bool,
    /// Analyzer name for Text (and Json leaf text). `None` means `"default"`.
    pub tokenizer: Option<String>,
}

impl FieldOptions {
    pub fn indexed() -> Self {
        FieldOptions {
            indexed: true,
            ..Default::default()
        }
    }

    pub fn stored() -> Self {
        FieldOptions {
            stored: true,
            ..Default::default()
        }
    }

    pub fn fast() -> Self {
        FieldOptions {
            fast: true,
            ..Default::default()
        }
    }

    pub fn indexed_stored() -> Self {
        Self::indexed().and_stored()
    }

    pub fn fast_stored() -> Self {
        Self::fast().and_stored()
    }

    /// Full-text default: indexed with positions under the `default` analyzer.
    pub fn text() -> Self {
        Self::indexed().and_positions()
    }

    pub fn text_stored() -> Self {
        Self::text().and_stored()
    }

    pub fn and_indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn and_stored(mut self) -> Self {
        self.stored = true;
        self
    }

    pub fn and_fast(mut self) -> Self {
        self.fast = true;
        self
    }

    pub fn and_positions(mut self) -> Self {
        self.positions = true;
        self
    }

    pub fn with_tokenizer(mut self, name: &str) -> Self {
        self.tokenizer = Some(name.to_string());
        self
    }

    pub fn tokenizer_name(&self) -> &str {
        self.tokenizer.as_deref().unwrap_or("default")
    }

    pub(crate) fn validate_for(&self, field_type: FieldType, name: &str) -> Result<()> {
        let invalid = |msg: String| Err(Error::new(ErrorKind::InvalidOptions, msg));
        if self.tokenizer.is_some() && !matches!(field_type, FieldType::Text | FieldType::Json) {
            return invalid(format!(
                "field '{}': tokenizer is only valid on text and json fields",
                name
            ));
        }
        if self.positions && !matches!(field_type, FieldType::Text | FieldType::Json) {
            return invalid(format!(
                "field '{}': positions are only recorded for tokenized fields",
                name
            ));
        }
        if self.fast && matches!(field_type, FieldType::Bytes | FieldType::Json) {
            return invalid(format!(
                "field '{}': fast columns are not supported for {:?} fields",
                name, field_type
            ));
        }
        if !self.indexed && !self.stored && !self.fast && field_type != FieldType::Facet {
            return invalid(format!(
                "field '{}' is neither indexed, stored nor fast",
                name
            ));
        }
        Ok(())
    }
}

/// One field declaration inside a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    pub field_type: FieldType,
    pub options: FieldOptions,
}

impl FieldEntry {
    /// Facet fields are always indexed regardless of declared options.
    pub fn is_indexed(&self) -> bool {
        self.options.indexed || self.field_type == FieldType::Facet
    }

    /// Facet fields always carry a value column for counting.
    pub fn is_fast(&self) -> bool {
        self.options.fast || self.field_type == FieldType::Facet
    }

    pub fn is_stored(&self) -> bool {
        self.options.stored
    }

    pub fn has_positions(&self) -> bool {
        self.options.positions
    }
}
