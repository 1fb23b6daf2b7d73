use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::types::DocAddress;
use crate::schema::CompactDocument;

/// One search hit. `doc` carries the stored subset of the document.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub score: f32,
    pub address: DocAddress,
    pub doc: CompactDocument,
}

/// Scored doc before stored-field resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredAddress {
    pub score: f32,
    pub address: DocAddress,
}

impl Eq for ScoredAddress {}

impl Ord for ScoredAddress {
    /// Descending score; equal scores break ties by ascending address.
    fn cmp(&self, other: &Self) -> Ordering {
        match self
            .score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => other.address.cmp(&self.address),
            ordering => ordering,
        }
    }
}

impl PartialOrd for ScoredAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keeps the best `k` results while per-segment streams come in.
pub struct TopKCollector {
    k: usize,
    // Min-heap via Reverse ordering: the root is the weakest kept hit.
    heap: BinaryHeap<std::cmp::Reverse<ScoredAddress>>,
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub fn collect(&mut self, entry: ScoredAddress) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(std::cmp::Reverse(entry));
        } else if let Some(weakest) = self.heap.peek() {
            if entry > weakest.0 {
                self.heap.pop();
                self.heap.push(std::cmp::Reverse(entry));
            }
        }
    }

    /// Best-first output.
    pub fn into_sorted(self) -> Vec<ScoredAddress> {
        let mut entries: Vec<ScoredAddress> = self.heap.into_iter().map(|r| r.0).collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: f32, segment: u32, doc: u32) -> ScoredAddress {
        ScoredAddress {
            score,
            address: DocAddress::new(segment, doc),
        }
    }

    #[test]
    fn test_top_k_keeps_best_scores() {
        let mut collector = TopKCollector::new(2);
        for (score, doc) in [(1.0, 0), (3.0, 1), (2.0, 2), (0.5, 3)] {
            collector.collect(entry(score, 0, doc));
        }
        let sorted = collector.into_sorted();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].address.doc, 1);
        assert_eq!(sorted[1].address.doc, 2);
    }

    #[test]
    fn test_ties_break_by_ascending_address() {
        let mut collector = TopKCollector::new(3);
        collector.collect(entry(1.0, 1, 0));
        collector.collect(entry(1.0, 0, 2));
        collector.collect(entry(1.0, 0, 1));
        let sorted = collector.into_sorted();
        assert_eq!(sorted[0].address, DocAddress::new(0, 1));
        assert_eq!(sorted[1].address, DocAddress::new(0, 2));
        assert_eq!(sorted[2].address, DocAddress::new(1, 0));
    }
}
