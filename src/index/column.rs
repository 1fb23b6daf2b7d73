use serde::{Deserialize, Serialize};

use crate::core::types::DocId;

/// Value domain of a numeric fast column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    U64,
    I64,
    F64,
    Bool,
    /// Epoch seconds, i64 representation.
    Date,
}

/// Order-preserving u64 image of an i64.
pub fn i64_to_u64(v: i64) -> u64 {
    (v as u64) ^ (1 << 63)
}

pub fn u64_to_i64(raw: u64) -> i64 {
    (raw ^ (1 << 63)) as i64
}

/// Order-preserving u64 image of an f64 (NaNs sort last).
pub fn f64_to_u64(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits & (1 << 63) == 0 {
        bits | (1 << 63)
    } else {
        !bits
    }
}

pub fn u64_to_f64(raw: u64) -> f64 {
    let bits = if raw & (1 << 63) != 0 {
        raw & !(1 << 63)
    } else {
        !raw
    };
    f64::from_bits(bits)
}

impl ColumnKind {
    /// Decode a raw column word into the aggregation value domain.
    pub fn decode_f64(&self, raw: u64) -> f64 {
        match self {
            ColumnKind::U64 => raw as f64,
            ColumnKind::I64 | ColumnKind::Date => u64_to_i64(raw) as f64,
            ColumnKind::F64 => u64_to_f64(raw),
            ColumnKind::Bool => u64_to_i64(raw) as f64,
        }
    }
}

/// Column of order-mapped u64 words, laid out both by value (for range
/// scans) and by doc (for per-document access). Multi-valued docs
/// contribute one row per value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub kind: ColumnKind,
    /// (mapped value, doc), sorted by value then doc.
    pub by_value: Vec<(u64, DocId)>,
    /// (doc, mapped value), sorted by doc then insertion order.
    pub by_doc: Vec<(DocId, u64)>,
}

impl Default for ColumnKind {
    fn default() -> Self {
        ColumnKind::U64
    }
}

impl NumericColumn {
    pub fn new(kind: ColumnKind) -> Self {
        NumericColumn {
            kind,
            by_value: Vec::new(),
            by_doc: Vec::new(),
        }
    }

    pub fn push(&mut self, doc: DocId, mapped: u64) {
        self.by_doc.push((doc, mapped));
        self.by_value.push((mapped, doc));
    }

    /// Finalize after all rows are in: order the value index.
    pub fn seal(&mut self) {
        self.by_value.sort_unstable();
    }

    /// Docs whose mapped value lies in `[lo, hi]` (inclusive), deduplicated,
    /// ascending.
    pub fn docs_in_range(&self, lo: u64, hi: u64) -> Vec<DocId> {
        if lo > hi {
            return Vec::new();
        }
        let start = self.by_value.partition_point(|&(v, _)| v < lo);
        let end = self.by_value.partition_point(|&(v, _)| v <= hi);
        let mut docs: Vec<DocId> = self.by_value[start..end].iter().map(|&(_, d)| d).collect();
        docs.sort_unstable();
        docs.dedup();
        docs
    }

    /// All mapped values of one document.
    pub fn values_for(&self, doc: DocId) -> &[(DocId, u64)] {
        let start = self.by_doc.partition_point(|&(d, _)| d < doc);
        let end = self.by_doc.partition_point(|&(d, _)| d <= doc);
        &self.by_doc[start..end]
    }
}

/// Raw string values (text keyword / facet paths) by document, for
/// terms aggregations and facet counting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrColumn {
    /// (doc, value), sorted by doc.
    pub by_doc: Vec<(DocId, String)>,
}

impl StrColumn {
    pub fn push(&mut self, doc: DocId, value: String) {
        self.by_doc.push((doc, value));
    }

    pub fn values_for(&self, doc: DocId) -> impl Iterator<Item = &str> {
        let start = self.by_doc.partition_point(|(d, _)| *d < doc);
        self.by_doc[start..]
            .iter()
            .take_while(move |(d, _)| *d == doc)
            .map(|(_, v)| v.as_str())
    }
}

/// IP addresses, stored as their IPv6-mapped u128.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpColumn {
    pub by_doc: Vec<(DocId, u128)>,
}

impl IpColumn {
    pub fn push(&mut self, doc: DocId, value: u128) {
        self.by_doc.push((doc, value));
    }
}

/// A fast column of any supported domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Numeric(NumericColumn),
    Str(StrColumn),
    Ip(IpColumn),
}
