use fst::{IntoStreamer, Streamer};
use roaring::RoaringBitmap;
use std::collections::HashMap;
use std::ops::Bound;

use crate::core::error::{Error, Result};
use crate::core::types::{DocId, SegmentId};
use crate::index::column::{Column, IpColumn, NumericColumn, StrColumn};
use crate::index::posting::PostingList;
use crate::index::segment::{FieldIndexData, FieldStats, SegmentData};
use crate::schema::{CompactDocument, Field};

/// Decoded, query-ready view of one field inside a segment.
pub struct FieldReader {
    dict: fst::Map<Vec<u8>>,
    postings: Vec<PostingList>,
    norms: Vec<u32>,
    column: Option<Column>,
    pub stats: FieldStats,
}

impl FieldReader {
    fn from_data(data: FieldIndexData) -> Result<FieldReader> {
        let dict = fst::Map::new(data.dict)?;
        Ok(FieldReader {
            dict,
            postings: data.postings,
            norms: data.norms,
            column: data.column,
            stats: data.stats,
        })
    }

    pub fn postings(&self, term: &[u8]) -> Option<&PostingList> {
        self.dict
            .get(term)
            .map(|ordinal| &self.postings[ordinal as usize])
    }

    pub fn doc_freq(&self, term: &[u8]) -> u64 {
        self.postings(term).map(|p| p.doc_freq() as u64).unwrap_or(0)
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    /// Posting lists of all terms within the byte range.
    pub fn postings_in_range(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
    ) -> Vec<&PostingList> {
        let mut builder = self.dict.range();
        builder = match lower {
            Bound::Included(bytes) => builder.ge(bytes),
            Bound::Excluded(bytes) => builder.gt(bytes),
            Bound::Unbounded => builder,
        };
        builder = match upper {
            Bound::Included(bytes) => builder.le(bytes),
            Bound::Excluded(bytes) => builder.lt(bytes),
            Bound::Unbounded => builder,
        };
        let mut lists = Vec::new();
        let mut stream = builder.into_stream();
        while let Some((_, ordinal)) = stream.next() {
            lists.push(&self.postings[ordinal as usize]);
        }
        lists
    }

    /// Terms starting at `prefix`, streamed in order until the prefix no
    /// longer matches.
    pub fn terms_with_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, &PostingList)> {
        let mut results = Vec::new();
        let mut stream = self.dict.range().ge(prefix).into_stream();
        while let Some((term, ordinal)) = stream.next() {
            if !term.starts_with(prefix) {
                break;
            }
            results.push((term.to_vec(), &self.postings[ordinal as usize]));
        }
        results
    }

    /// Every term in the dictionary. Used by leading-wildcard and regex
    /// queries, which cannot bound their scan.
    pub fn all_terms(&self) -> Vec<(Vec<u8>, &PostingList)> {
        let mut results = Vec::new();
        let mut stream = self.dict.stream();
        while let Some((term, ordinal)) = stream.next() {
            results.push((term.to_vec(), &self.postings[ordinal as usize]));
        }
        results
    }

    pub fn norm(&self, doc: DocId) -> u32 {
        self.norms.get(doc as usize).copied().unwrap_or(0)
    }

    pub fn numeric_column(&self) -> Option<&NumericColumn> {
        match &self.column {
            Some(Column::Numeric(column)) => Some(column),
            _ => None,
        }
    }

    pub fn str_column(&self) -> Option<&StrColumn> {
        match &self.column {
            Some(Column::Str(column)) => Some(column),
            _ => None,
        }
    }

    pub fn ip_column(&self) -> Option<&IpColumn> {
        match &self.column {
            Some(Column::Ip(column)) => Some(column),
            _ => None,
        }
    }
}

/// Point-in-time view of one segment plus its deletion bitmap as of
/// the owning snapshot.
pub struct SegmentReader {
    pub segment_id: SegmentId,
    pub doc_count: u32,
    fields: HashMap<u32, FieldReader>,
    stored: Vec<CompactDocument>,
    deleted: RoaringBitmap,
}

impl SegmentReader {
    pub fn open(bytes: &[u8], deleted: RoaringBitmap) -> Result<SegmentReader> {
        let data = SegmentData::from_bytes(bytes)?;
        Self::from_data(data, deleted)
    }

    pub fn from_data(data: SegmentData, deleted: RoaringBitmap) -> Result<SegmentReader> {
        let stored = data.decode_stored()?;
        let mut fields = HashMap::new();
        for (handle, field_data) in data.fields {
            fields.insert(handle, FieldReader::from_data(field_data)?);
        }
        Ok(SegmentReader {
            segment_id: data.segment_id,
            doc_count: data.doc_count,
            fields,
            stored,
            deleted,
        })
    }

    pub fn field(&self, field: Field) -> Option<&FieldReader> {
        self.fields.get(&field.0)
    }

    pub fn is_deleted(&self, doc: DocId) -> bool {
        self.deleted.contains(doc)
    }

    pub fn num_deleted(&self) -> u64 {
        self.deleted.len()
    }

    pub fn num_live_docs(&self) -> u64 {
        self.doc_count as u64 - self.deleted.len()
    }

    pub fn live_docs(&self) -> impl Iterator<Item = DocId> + '_ {
        (0..self.doc_count).filter(move |doc| !self.deleted.contains(*doc))
    }

    pub fn doc(&self, doc: DocId) -> Result<&CompactDocument> {
        self.stored.get(doc as usize).ok_or_else(|| {
            Error::storage(format!(
                "doc {} out of bounds for segment {}",
                doc,
                self.segment_id.short()
            ))
        })
    }
}
