use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

use crate::aggregation::{run_aggregations, AggregationLimits, AggregationRequest, AggregationResults};
use crate::core::error::Result;
use crate::core::types::{DocAddress, SnapshotId};
use crate::query::Query;
use crate::reader::cache::QueryCache;
use crate::reader::segment_reader::SegmentReader;
use crate::schema::{CompactDocument, Schema};
use crate::scoring::Bm25Params;
use crate::search::executor::{eval_segment, matching_docs, ExecutionContext};
use crate::search::results::{ScoredAddress, SearchHit, TopKCollector};
use crate::storage::snapshot::SnapshotRefGuard;

/// Point-in-time searcher. Bound to exactly one snapshot; holds a
/// reference that keeps the snapshot out of garbage collection, and
/// sees no writes committed after its creation.
pub struct Searcher {
    schema: Schema,
    segments: Vec<Arc<SegmentReader>>,
    guard: SnapshotRefGuard,
    params: Bm25Params,
    cache: Option<Arc<QueryCache>>,
    agg_limits: AggregationLimits,
}

impl Searcher {
    pub(crate) fn new(
        schema: Schema,
        segments: Vec<Arc<SegmentReader>>,
        guard: SnapshotRefGuard,
        cache: Option<Arc<QueryCache>>,
    ) -> Searcher {
        Searcher {
            schema,
            segments,
            guard,
            params: Bm25Params::default(),
            cache,
            agg_limits: AggregationLimits::default(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn snapshot_id(&self) -> SnapshotId {
        self.guard.id()
    }

    pub fn segment_readers(&self) -> &[Arc<SegmentReader>] {
        &self.segments
    }

    /// Live documents across the snapshot.
    pub fn num_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.num_live_docs()).sum()
    }

    /// Top-`limit` hits in descending score order, stored fields attached.
    pub fn search(&self, query: &Query, limit: usize) -> Result<Vec<SearchHit>> {
        self.search_with_deadline(query, limit, None)
    }

    /// As [`Searcher::search`], aborting with `Timeout` once `deadline`
    /// passes. The deadline is checked between segments and between
    /// Boolean clauses.
    pub fn search_with_deadline(
        &self,
        query: &Query,
        limit: usize,
        deadline: Option<Instant>,
    ) -> Result<Vec<SearchHit>> {
        query.validate(&self.schema)?;

        let cache_key = self
            .cache
            .as_ref()
            .map(|cache| (cache.clone(), QueryCache::key(self.snapshot_id(), query, limit)));
        if let Some((cache, key)) = &cache_key {
            if let Some(hits) = cache.get(*key) {
                return Ok(hits.as_ref().clone());
            }
        }

        let per_segment: Vec<Vec<crate::search::Scored>> = self
            .segments
            .par_iter()
            .map(|segment| {
                let ctx = ExecutionContext::new(&self.schema).with_deadline(deadline);
                eval_segment(&ctx, segment.as_ref(), query)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut collector = TopKCollector::new(limit);
        for (segment_ord, scored) in per_segment.into_iter().enumerate() {
            for entry in scored {
                collector.collect(ScoredAddress {
                    score: entry.score,
                    address: DocAddress::new(segment_ord as u32, entry.doc),
                });
            }
        }

        let mut hits = Vec::new();
        for entry in collector.into_sorted() {
            hits.push(SearchHit {
                score: entry.score,
                address: entry.address,
                doc: self.doc(entry.address)?,
            });
        }

        if let Some((cache, key)) = cache_key {
            cache.put(key, Arc::new(hits.clone()));
        }
        Ok(hits)
    }

    /// Matching live-document count, without scoring or retrieval.
    pub fn count(&self, query: &Query) -> Result<u64> {
        query.validate(&self.schema)?;
        let counts: Vec<u64> = self
            .segments
            .par_iter()
            .map(|segment| {
                matching_docs(&self.schema, segment.as_ref(), query).map(|docs| docs.len() as u64)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(counts.into_iter().sum())
    }

    /// Retrieve the stored subset of one document.
    pub fn doc(&self, address: DocAddress) -> Result<CompactDocument> {
        let segment = self.segments.get(address.segment_ord as usize).ok_or_else(|| {
            crate::core::error::Error::storage(format!(
                "segment ordinal {} out of bounds",
                address.segment_ord
            ))
        })?;
        segment.doc(address.doc).cloned()
    }

    /// Execute the query once, returning both the top-`limit` hits and
    /// the aggregation results over the full match set.
    pub fn search_with_aggregation(
        &self,
        query: &Query,
        limit: usize,
        request: &AggregationRequest,
    ) -> Result<(Vec<SearchHit>, AggregationResults)> {
        query.validate(&self.schema)?;
        let docs_per_segment: Vec<Vec<u32>> = self
            .segments
            .par_iter()
            .map(|segment| matching_docs(&self.schema, segment.as_ref(), query))
            .collect::<Result<Vec<_>>>()?;
        let aggregations = run_aggregations(
            &self.schema,
            &self.segments,
            &docs_per_segment,
            request,
            &self.agg_limits,
        )?;
        let hits = self.search(query, limit)?;
        Ok((hits, aggregations))
    }

    pub fn bm25_params(&self) -> Bm25Params {
        self.params
    }
}
