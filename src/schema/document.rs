use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::core::error::{Error, Result};
use crate::schema::facet::Facet;
use crate::schema::field::{Field, FieldType};
use crate::schema::schema::Schema;
use crate::schema::value::{normalize_date, Value};

/// String-keyed document as supplied by the host. Repeated names make a
/// field multi-valued.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub values: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn add_value(&mut self, name: &str, value: Value) -> &mut Self {
        self.values.push((name.to_string(), value));
        self
    }

    pub fn add_text(&mut self, name: &str, text: &str) -> &mut Self {
        self.add_value(name, Value::Text(text.to_string()))
    }

    pub fn add_u64(&mut self, name: &str, v: u64) -> &mut Self {
        self.add_value(name, Value::U64(v))
    }

    pub fn add_i64(&mut self, name: &str, v: i64) -> &mut Self {
        self.add_value(name, Value::I64(v))
    }

    pub fn add_f64(&mut self, name: &str, v: f64) -> &mut Self {
        self.add_value(name, Value::F64(v))
    }

    pub fn add_bool(&mut self, name: &str, v: bool) -> &mut Self {
        self.add_value(name, Value::Bool(v))
    }

    pub fn add_date(&mut self, name: &str, dt: DateTime<Utc>) -> &mut Self {
        self.add_value(name, Value::Date(dt))
    }

    pub fn add_facet(&mut self, name: &str, facet: Facet) -> &mut Self {
        self.add_value(name, Value::Facet(facet))
    }

    /// Build a document from a JSON object; arrays become multi-values.
    pub fn from_json(json: &serde_json::Value) -> Result<Document> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::schema_mismatch("document json must be an object"))?;
        let mut doc = Document::new();
        for (name, value) in object {
            match value {
                serde_json::Value::Array(items) => {
                    for item in items {
                        doc.add_value(name, json_scalar_to_value(item)?);
                    }
                }
                other => {
                    doc.add_value(name, json_scalar_to_value(other)?);
                }
            }
        }
        Ok(doc)
    }
}

fn json_scalar_to_value(json: &serde_json::Value) -> Result<Value> {
    match json {
        serde_json::Value::String(text) => Ok(Value::Text(text.clone())),
        serde_json::Value::Bool(v) => Ok(Value::Bool(*v)),
        serde_json::Value::Number(num) => {
            if let Some(v) = num.as_u64() {
                Ok(Value::U64(v))
            } else if let Some(v) = num.as_i64() {
                Ok(Value::I64(v))
            } else {
                Ok(Value::F64(num.as_f64().unwrap_or(f64::NAN)))
            }
        }
        serde_json::Value::Object(_) => Ok(Value::Json(json.clone())),
        serde_json::Value::Null => Err(Error::schema_mismatch("null is not a field value")),
        serde_json::Value::Array(_) => {
            Err(Error::schema_mismatch("nested arrays are not supported"))
        }
    }
}

/// Handle-keyed, type-normalized document. This is the representation
/// all internal paths (indexing, storage, shard transport) operate on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompactDocument {
    pub values: Vec<(Field, Value)>,
}

impl CompactDocument {
    pub fn values_for(&self, field: Field) -> impl Iterator<Item = &Value> {
        self.values
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    pub fn first_value(&self, field: Field) -> Option<&Value> {
        self.values_for(field).next()
    }

    /// Project back to a JSON object keyed by field name.
    pub fn to_json(&self, schema: &Schema) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (field, value) in &self.values {
            let name = schema.field_name(*field).to_string();
            let rendered = value.to_json();
            match object.get_mut(&name) {
                None => {
                    object.insert(name, rendered);
                }
                Some(serde_json::Value::Array(items)) => items.push(rendered),
                Some(existing) => {
                    let prior = existing.take();
                    *existing = serde_json::Value::Array(vec![prior, rendered]);
                }
            }
        }
        serde_json::Value::Object(object)
    }

    /// Keep only the stored subset, as written to the document store.
    pub fn stored_subset(&self, schema: &Schema) -> CompactDocument {
        CompactDocument {
            values: self
                .values
                .iter()
                .filter(|(field, _)| schema.field_entry(*field).is_stored())
                .cloned()
                .collect(),
        }
    }
}

/// Validate and normalize a host document against a schema.
///
/// Unknown fields are an error unless the schema is permissive, in which
/// case they are silently dropped. Value kinds are coerced only when the
/// conversion is lossless.
pub fn validate_document(schema: &Schema, doc: &Document) -> Result<CompactDocument> {
    let mut compact = CompactDocument::default();
    for (name, value) in &doc.values {
        let field = match schema.field_by_name(name) {
            Ok(field) => field,
            Err(_) if schema.is_permissive() => continue,
            Err(_) => {
                return Err(Error::schema_mismatch(format!(
                    "document references unknown field '{}'",
                    name
                )))
            }
        };
        let entry = schema.field_entry(field);
        let normalized = coerce_value(entry.field_type, name, value)?;
        compact.values.push((field, normalized));
    }
    Ok(compact)
}

pub(crate) fn coerce_value(field_type: FieldType, name: &str, value: &Value) -> Result<Value> {
    let mismatch = || {
        Error::schema_mismatch(format!(
            "field '{}' expects {:?}, got {}",
            name,
            field_type,
            value.type_name()
        ))
    };
    match (field_type, value) {
        (FieldType::Text, Value::Text(_)) | (FieldType::Text, Value::PreTokenized(_)) => {
            Ok(value.clone())
        }
        (FieldType::U64, Value::U64(_)) => Ok(value.clone()),
        (FieldType::U64, Value::I64(v)) if *v >= 0 => Ok(Value::U64(*v as u64)),
        (FieldType::U64, Value::F64(v)) => float_to_integer(*v, name)
            .and_then(|i| u64::try_from(i).map_err(|_| mismatch()))
            .map(Value::U64),
        (FieldType::U64, Value::Text(text)) => {
            text.trim().parse::<u64>().map(Value::U64).map_err(|_| mismatch())
        }
        (FieldType::I64, Value::I64(_)) => Ok(value.clone()),
        (FieldType::I64, Value::U64(v)) => {
            i64::try_from(*v).map(Value::I64).map_err(|_| mismatch())
        }
        (FieldType::I64, Value::F64(v)) => float_to_integer(*v, name).map(Value::I64),
        (FieldType::I64, Value::Text(text)) => {
            text.trim().parse::<i64>().map(Value::I64).map_err(|_| mismatch())
        }
        (FieldType::F64, Value::F64(_)) => Ok(value.clone()),
        (FieldType::F64, Value::U64(v)) => Ok(Value::F64(*v as f64)),
        (FieldType::F64, Value::I64(v)) => Ok(Value::F64(*v as f64)),
        (FieldType::F64, Value::Text(text)) => {
            text.trim().parse::<f64>().map(Value::F64).map_err(|_| mismatch())
        }
        (FieldType::Bool, Value::Bool(_)) => Ok(value.clone()),
        (FieldType::Bool, Value::Text(text)) => match text.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch()),
        },
        (FieldType::Date, Value::Date(dt)) => Ok(Value::Date(normalize_date(*dt))),
        (FieldType::Date, Value::Text(text)) => parse_date(text).map(Value::Date),
        (FieldType::Date, Value::I64(secs)) => epoch_to_date(*secs).map(Value::Date),
        (FieldType::Date, Value::U64(secs)) => {
            let secs = i64::try_from(*secs).map_err(|_| mismatch())?;
            epoch_to_date(secs).map(Value::Date)
        }
        (FieldType::Bytes, Value::Bytes(_)) => Ok(value.clone()),
        (FieldType::Bytes, Value::Text(text)) => base64::decode(text.trim())
            .map(Value::Bytes)
            .map_err(|_| Error::schema_mismatch(format!("field '{}': invalid base64", name))),
        (FieldType::Json, Value::Json(_)) => Ok(value.clone()),
        (FieldType::Json, Value::Text(text)) => serde_json::from_str(text)
            .map(Value::Json)
            .map_err(|_| mismatch()),
        (FieldType::IpAddr, Value::IpAddr(_)) => Ok(value.clone()),
        (FieldType::IpAddr, Value::Text(text)) => text
            .trim()
            .parse::<IpAddr>()
            .map(Value::IpAddr)
            .map_err(|_| mismatch()),
        (FieldType::Facet, Value::Facet(_)) => Ok(value.clone()),
        (FieldType::Facet, Value::Text(text)) => Facet::from_text(text).map(Value::Facet),
        _ => Err(mismatch()),
    }
}

fn float_to_integer(v: f64, name: &str) -> Result<i64> {
    if v.fract() != 0.0 || !v.is_finite() || v < i64::MIN as f64 || v > i64::MAX as f64 {
        return Err(Error::schema_mismatch(format!(
            "field '{}': float {} does not coerce losslessly to an integer",
            name, v
        )));
    }
    Ok(v as i64)
}

fn parse_date(text: &str) -> Result<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(normalize_date(dt.with_timezone(&Utc)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::schema_mismatch("invalid date"))?;
        return Ok(DateTime::from_naive_utc_and_offset(midnight, Utc));
    }
    Err(Error::schema_mismatch(format!(
        "'{}' is not an ISO-8601 date",
        trimmed
    )))
}

fn epoch_to_date(secs: i64) -> Result<DateTime<Utc>> {
    chrono::TimeZone::timestamp_opt(&Utc, secs, 0)
        .single()
        .ok_or_else(|| Error::schema_mismatch(format!("epoch seconds {} out of range", secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::schema::field::FieldOptions;

    fn schema(permissive: bool) -> Schema {
        let mut builder = Schema::builder().permissive(permissive);
        builder
            .add_text_field("title", FieldOptions::text_stored())
            .unwrap();
        builder
            .add_u64_field("count", FieldOptions::fast_stored())
            .unwrap();
        builder
            .add_date_field("when", FieldOptions::fast())
            .unwrap();
        builder
            .add_facet_field("category", FieldOptions::default())
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_unknown_field_rejected_in_strict_mode() {
        let mut doc = Document::new();
        doc.add_text("mystery", "x");
        let err = validate_document(&schema(false), &doc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaMismatch);
        assert!(validate_document(&schema(true), &doc)
            .unwrap()
            .values
            .is_empty());
    }

    #[test]
    fn test_lossless_numeric_coercion() {
        let mut doc = Document::new();
        doc.add_text("count", "42");
        let compact = validate_document(&schema(false), &doc).unwrap();
        assert_eq!(compact.values[0].1, Value::U64(42));

        let mut doc = Document::new();
        doc.add_f64("count", 7.0);
        let compact = validate_document(&schema(false), &doc).unwrap();
        assert_eq!(compact.values[0].1, Value::U64(7));

        let mut doc = Document::new();
        doc.add_f64("count", 7.5);
        assert!(validate_document(&schema(false), &doc).is_err());
    }

    #[test]
    fn test_iso_date_parsing_normalizes_to_seconds() {
        let mut doc = Document::new();
        doc.add_text("when", "2024-03-01T12:30:45.500Z");
        let compact = validate_document(&schema(false), &doc).unwrap();
        match &compact.values[0].1 {
            Value::Date(dt) => {
                assert_eq!(dt.timestamp_subsec_nanos(), 0);
                assert_eq!(dt.timestamp(), 1709296245);
            }
            other => panic!("expected date, got {:?}", other),
        }
    }

    #[test]
    fn test_facet_coercion_checks_shape() {
        let mut doc = Document::new();
        doc.add_text("category", "/books/rust");
        assert!(validate_document(&schema(false), &doc).is_ok());

        let mut doc = Document::new();
        doc.add_text("category", "books");
        assert!(validate_document(&schema(false), &doc).is_err());
    }

    #[test]
    fn test_from_json_multivalue() {
        let json = serde_json::json!({"title": ["a", "b"], "count": 3});
        let doc = Document::from_json(&json).unwrap();
        assert_eq!(doc.values.len(), 3);
    }
}
