use std::collections::BTreeMap;

use crate::analysis::{Token, TokenizerRegistry};
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, SegmentId};
use crate::index::column::{
    f64_to_u64, i64_to_u64, Column, ColumnKind, IpColumn, NumericColumn, StrColumn,
};
use crate::index::posting::PostingListBuilder;
use crate::index::segment::{encode_stored_block, FieldIndexData, FieldStats, SegmentData};
use crate::index::term;
use crate::schema::{CompactDocument, Field, FieldEntry, FieldType, Schema, Value};

/// Position gap inserted between the token streams of a multi-valued
/// text field, so phrases never match across value boundaries.
const POSITION_GAP: u32 = 2;

struct FieldBuilder {
    postings: BTreeMap<Vec<u8>, PostingListBuilder>,
    norms: Vec<u32>,
    numeric: Option<NumericColumn>,
    strs: Option<StrColumn>,
    ips: Option<IpColumn>,
    stats: FieldStats,
    tokenized: bool,
}

impl FieldBuilder {
    fn new() -> FieldBuilder {
        FieldBuilder {
            postings: BTreeMap::new(),
            norms: Vec::new(),
            numeric: None,
            strs: None,
            ips: None,
            stats: FieldStats::default(),
            tokenized: false,
        }
    }

    fn record_term(&mut self, bytes: Vec<u8>, doc: DocId, position: Option<u32>) {
        self.postings
            .entry(bytes)
            .or_default()
            .record(doc, position);
    }

    fn numeric_mut(&mut self, kind: ColumnKind) -> &mut NumericColumn {
        self.numeric.get_or_insert_with(|| NumericColumn::new(kind))
    }

    fn finish(self, doc_count: u32) -> Result<FieldIndexData> {
        let mut dict_builder = fst::MapBuilder::memory();
        let mut postings = Vec::with_capacity(self.postings.len());
        for (ordinal, (term_bytes, builder)) in self.postings.into_iter().enumerate() {
            dict_builder
                .insert(&term_bytes, ordinal as u64)
                .map_err(|e| Error::storage(format!("dictionary build: {}", e)))?;
            postings.push(builder.build());
        }
        let dict = dict_builder
            .into_inner()
            .map_err(|e| Error::storage(format!("dictionary build: {}", e)))?;

        let mut norms = self.norms;
        if self.tokenized {
            norms.resize(doc_count as usize, 0);
        }

        let column = if let Some(mut numeric) = self.numeric {
            numeric.seal();
            Some(Column::Numeric(numeric))
        } else if let Some(strs) = self.strs {
            Some(Column::Str(strs))
        } else {
            self.ips.map(Column::Ip)
        };

        Ok(FieldIndexData {
            dict,
            postings,
            norms,
            column,
            stats: self.stats,
        })
    }
}

/// Invert a batch of normalized documents into an immutable segment.
/// Doc ids are the batch ordinals. Fields invert independently, so the
/// work fans out one task per field on the caller's rayon pool.
pub fn build_segment(
    schema: &Schema,
    registry: &TokenizerRegistry,
    docs: &[CompactDocument],
) -> Result<SegmentData> {
    use rayon::prelude::*;

    // Regroup values by field; within one field they stay in doc order.
    let mut per_field: BTreeMap<u32, Vec<(DocId, &Value)>> = BTreeMap::new();
    for (ordinal, doc) in docs.iter().enumerate() {
        for (field, value) in &doc.values {
            per_field
                .entry(field.0)
                .or_default()
                .push((ordinal as DocId, value));
        }
    }

    let doc_count = docs.len() as u32;
    let field_entries: Vec<(u32, Vec<(DocId, &Value)>)> = per_field.into_iter().collect();
    let built: Vec<(u32, FieldIndexData)> = field_entries
        .into_par_iter()
        .map(|(handle, values)| -> Result<(u32, FieldIndexData)> {
            let entry = schema.field_entry(Field(handle));
            let mut builder = FieldBuilder::new();
            let mut current_doc = DocId::MAX;
            let mut position_base = 0u32;
            for (doc, value) in values {
                if doc != current_doc {
                    current_doc = doc;
                    position_base = 0;
                }
                index_value(
                    registry,
                    &mut builder,
                    entry,
                    doc,
                    value,
                    &mut position_base,
                )?;
            }
            if builder.tokenized {
                builder.stats.docs_with_field =
                    builder.norms.iter().filter(|&&n| n > 0).count() as u32;
                builder.stats.total_tokens = builder.norms.iter().map(|&n| n as u64).sum();
            }
            Ok((handle, builder.finish(doc_count)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let stored: Vec<CompactDocument> = docs
        .iter()
        .map(|doc| doc.stored_subset(schema))
        .collect();

    Ok(SegmentData {
        segment_id: SegmentId::generate(),
        doc_count,
        fields: built.into_iter().collect(),
        stored: encode_stored_block(&stored)?,
    })
}

fn index_value(
    registry: &TokenizerRegistry,
    builder: &mut FieldBuilder,
    entry: &FieldEntry,
    doc: DocId,
    value: &Value,
    position_base: &mut u32,
) -> Result<()> {
    match (entry.field_type, value) {
        (FieldType::Text, Value::Text(text)) => {
            if entry.is_indexed() {
                let analyzer = registry.require(entry.options.tokenizer_name())?;
                let tokens = analyzer.analyze(text);
                index_tokens(builder, entry, doc, &tokens, position_base);
            }
            if entry.is_fast() {
                builder
                    .strs
                    .get_or_insert_with(StrColumn::default)
                    .push(doc, text.clone());
            }
        }
        (FieldType::Text, Value::PreTokenized(pre)) => {
            if entry.is_indexed() {
                index_tokens(builder, entry, doc, &pre.tokens, position_base);
            }
            if entry.is_fast() {
                builder
                    .strs
                    .get_or_insert_with(StrColumn::default)
                    .push(doc, pre.text.clone());
            }
        }
        (FieldType::U64, Value::U64(v)) => {
            index_numeric(builder, entry, doc, term::u64_term(*v), *v, ColumnKind::U64);
        }
        (FieldType::I64, Value::I64(v)) => {
            index_numeric(
                builder,
                entry,
                doc,
                term::i64_term(*v),
                i64_to_u64(*v),
                ColumnKind::I64,
            );
        }
        (FieldType::F64, Value::F64(v)) => {
            index_numeric(
                builder,
                entry,
                doc,
                term::f64_term(*v),
                f64_to_u64(*v),
                ColumnKind::F64,
            );
        }
        (FieldType::Bool, Value::Bool(v)) => {
            index_numeric(
                builder,
                entry,
                doc,
                term::bool_term(*v),
                i64_to_u64(*v as i64),
                ColumnKind::Bool,
            );
        }
        (FieldType::Date, Value::Date(dt)) => {
            let secs = dt.timestamp();
            index_numeric(
                builder,
                entry,
                doc,
                term::date_term(secs),
                i64_to_u64(secs),
                ColumnKind::Date,
            );
        }
        (FieldType::Bytes, Value::Bytes(bytes)) => {
            if entry.is_indexed() {
                builder.record_term(term::bytes_term(bytes), doc, None);
            }
        }
        (FieldType::IpAddr, Value::IpAddr(ip)) => {
            if entry.is_indexed() {
                builder.record_term(term::ip_term(ip), doc, None);
            }
            if entry.is_fast() {
                builder
                    .ips
                    .get_or_insert_with(IpColumn::default)
                    .push(doc, term::ip_to_u128(ip));
            }
        }
        (FieldType::Facet, Value::Facet(facet)) => {
            // Facets are always indexed and always counted.
            builder.record_term(term::facet_term(facet.as_str()), doc, None);
            builder
                .strs
                .get_or_insert_with(StrColumn::default)
                .push(doc, facet.as_str().to_string());
        }
        (FieldType::Json, Value::Json(json)) => {
            if entry.is_indexed() {
                let analyzer = registry.require(entry.options.tokenizer_name())?;
                let mut leaves = Vec::new();
                flatten_json("", json, &mut leaves);
                for (path, leaf) in leaves {
                    match leaf {
                        JsonLeaf::Text(text) => {
                            for token in analyzer.analyze(&text) {
                                builder.record_term(
                                    term::json_term(&path, &token.text),
                                    doc,
                                    Some(token.position),
                                );
                            }
                        }
                        JsonLeaf::Literal(literal) => {
                            builder.record_term(term::json_term(&path, &literal), doc, None);
                        }
                    }
                }
            }
        }
        (field_type, value) => {
            // Validation normalizes documents before they reach the
            // builder; anything else is an internal inconsistency.
            return Err(Error::schema_mismatch(format!(
                "field '{}' of type {:?} cannot index a {} value",
                entry.name,
                field_type,
                value.type_name()
            )));
        }
    }
    Ok(())
}

fn index_tokens(
    builder: &mut FieldBuilder,
    entry: &FieldEntry,
    doc: DocId,
    tokens: &[Token],
    position_base: &mut u32,
) {
    builder.tokenized = true;
    if builder.norms.len() <= doc as usize {
        builder.norms.resize(doc as usize + 1, 0);
    }
    let with_positions = entry.has_positions();
    let mut last_position = *position_base;
    for token in tokens {
        let position = *position_base + token.position;
        last_position = position;
        builder.record_term(
            term::text_term(&token.text),
            doc,
            with_positions.then_some(position),
        );
    }
    builder.norms[doc as usize] += tokens.len() as u32;
    if !tokens.is_empty() {
        *position_base = last_position + POSITION_GAP;
    }
}

fn index_numeric(
    builder: &mut FieldBuilder,
    entry: &FieldEntry,
    doc: DocId,
    term_bytes: Vec<u8>,
    mapped: u64,
    kind: ColumnKind,
) {
    if entry.is_indexed() {
        builder.record_term(term_bytes, doc, None);
    }
    if entry.is_fast() {
        builder.numeric_mut(kind).push(doc, mapped);
    }
}

enum JsonLeaf {
    /// Free text, analyzed with the field tokenizer.
    Text(String),
    /// Non-string scalar, indexed verbatim.
    Literal(String),
}

fn flatten_json(prefix: &str, json: &serde_json::Value, out: &mut Vec<(String, JsonLeaf)>) {
    match json {
        serde_json::Value::Object(object) => {
            for (key, value) in object {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_json(&path, value, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                flatten_json(prefix, item, out);
            }
        }
        serde_json::Value::String(text) => {
            out.push((prefix.to_string(), JsonLeaf::Text(text.clone())));
        }
        serde_json::Value::Number(num) => {
            out.push((prefix.to_string(), JsonLeaf::Literal(num.to_string())));
        }
        serde_json::Value::Bool(v) => {
            out.push((prefix.to_string(), JsonLeaf::Literal(v.to_string())));
        }
        serde_json::Value::Null => {}
    }
}
