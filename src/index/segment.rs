use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{Error, Result};
use crate::core::types::SegmentId;
use crate::index::column::Column;
use crate::index::posting::PostingList;
use crate::schema::CompactDocument;

/// Per-field scoring statistics within one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub docs_with_field: u32,
    pub total_tokens: u64,
}

impl FieldStats {
    pub fn average_field_length(&self) -> f32 {
        if self.docs_with_field == 0 {
            0.0
        } else {
            self.total_tokens as f32 / self.docs_with_field as f32
        }
    }
}

/// Serialized index data of one field inside a segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldIndexData {
    /// `fst::Map` bytes mapping term bytes to a posting-list ordinal.
    pub dict: Vec<u8>,
    pub postings: Vec<PostingList>,
    /// Per-doc token counts for length normalization; empty unless the
    /// field is tokenized.
    pub norms: Vec<u32>,
    pub column: Option<Column>,
    pub stats: FieldStats,
}

/// An immutable segment: everything one materialization of the writer
/// buffer produced. Serialized as one checksummed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentData {
    pub segment_id: SegmentId,
    pub doc_count: u32,
    /// Keyed by field handle.
    pub fields: BTreeMap<u32, FieldIndexData>,
    /// lz4-compressed bincode of `Vec<CompactDocument>` (stored subset).
    pub stored: Vec<u8>,
}

impl SegmentData {
    /// Serialize with a trailing crc32 over the payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut payload = bincode::serialize(self)?;
        let crc = crc32fast::hash(&payload);
        payload.extend_from_slice(&crc.to_le_bytes());
        Ok(payload)
    }

    /// Deserialize, verifying the checksum. Corruption is a storage
    /// integrity error, never a panic.
    pub fn from_bytes(bytes: &[u8]) -> Result<SegmentData> {
        if bytes.len() < 4 {
            return Err(Error::storage("segment file truncated"));
        }
        let (payload, crc_bytes) = bytes.split_at(bytes.len() - 4);
        let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let actual = crc32fast::hash(payload);
        if expected != actual {
            return Err(Error::storage(format!(
                "segment checksum mismatch: expected {:08x}, found {:08x}",
                expected, actual
            )));
        }
        Ok(bincode::deserialize(payload)?)
    }

    pub fn decode_stored(&self) -> Result<Vec<CompactDocument>> {
        decode_stored_block(&self.stored)
    }
}

pub fn encode_stored_block(docs: &[CompactDocument]) -> Result<Vec<u8>> {
    let raw = bincode::serialize(docs)?;
    Ok(lz4_flex::compress_prepend_size(&raw))
}

pub fn decode_stored_block(bytes: &[u8]) -> Result<Vec<CompactDocument>> {
    let raw = lz4_flex::decompress_size_prepended(bytes)
        .map_err(|e| Error::storage(format!("stored block corrupt: {}", e)))?;
    Ok(bincode::deserialize(&raw)?)
}
