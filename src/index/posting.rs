use serde::{Deserialize, Serialize};

use crate::core::types::DocId;

/// One document entry within a term's posting list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocId,
    pub term_freq: u32,
    /// Token positions; empty when the field does not record positions.
    pub positions: Vec<u32>,
}

/// Postings for one term, sorted by doc id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingList {
    pub postings: Vec<Posting>,
}

impl PostingList {
    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn total_term_freq(&self) -> u64 {
        self.postings.iter().map(|p| p.term_freq as u64).sum()
    }

    pub fn docs(&self) -> impl Iterator<Item = DocId> + '_ {
        self.postings.iter().map(|p| p.doc)
    }

    pub fn find(&self, doc: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc, |p| p.doc)
            .ok()
            .map(|idx| &self.postings[idx])
    }
}

/// Accumulates postings for one term while a segment is being built.
#[derive(Debug, Default)]
pub struct PostingListBuilder {
    postings: Vec<Posting>,
}

impl PostingListBuilder {
    /// Record one occurrence. Docs arrive in ascending order, so the
    /// current doc is always the last entry or a new one.
    pub fn record(&mut self, doc: DocId, position: Option<u32>) {
        match self.postings.last_mut() {
            Some(last) if last.doc == doc => {
                last.term_freq += 1;
                if let Some(pos) = position {
                    last.positions.push(pos);
                }
            }
            _ => {
                self.postings.push(Posting {
                    doc,
                    term_freq: 1,
                    positions: position.into_iter().collect(),
                });
            }
        }
    }

    pub fn build(self) -> PostingList {
        PostingList {
            postings: self.postings,
        }
    }

    /// Rough heap footprint, for the writer's memory accounting.
    pub fn memory_estimate(&self) -> usize {
        self.postings.len() * std::mem::size_of::<Posting>()
            + self
                .postings
                .iter()
                .map(|p| p.positions.len() * 4)
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_merges_same_doc() {
        let mut builder = PostingListBuilder::default();
        builder.record(0, Some(0));
        builder.record(0, Some(4));
        builder.record(2, Some(1));
        let list = builder.build();
        assert_eq!(list.doc_freq(), 2);
        assert_eq!(list.postings[0].term_freq, 2);
        assert_eq!(list.postings[0].positions, vec![0, 4]);
        assert_eq!(list.find(2).unwrap().term_freq, 1);
        assert!(list.find(1).is_none());
    }
}
