use chrono::{Datelike, TimeZone, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::aggregation::request::{
    Aggregation, AggregationRequest, AggregationVariant, CalendarInterval,
    DateHistogramAggregation, HistogramAggregation, MetricAggregation, PercentilesAggregation,
    RangeAggregation, SortDirection, TermsAggregation,
};
use crate::aggregation::response::{
    AggregationResult, AggregationResults, BucketEntry, BucketKey, MetricResult,
};
use crate::aggregation::tdigest::TDigest;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::column::{NumericColumn, StrColumn};
use crate::reader::segment_reader::SegmentReader;
use crate::schema::{FieldType, Schema};

/// Execution limits; exceeding either fails the request rather than
/// truncating results.
#[derive(Debug, Clone)]
pub struct AggregationLimits {
    pub max_depth: usize,
    pub memory_budget: usize,
}

impl Default for AggregationLimits {
    fn default() -> Self {
        AggregationLimits {
            max_depth: 3,
            memory_budget: 16 * 1024 * 1024,
        }
    }
}

struct MemoryCounter {
    used: usize,
    budget: usize,
}

impl MemoryCounter {
    fn charge(&mut self, bytes: usize) -> Result<()> {
        self.used += bytes;
        if self.used > self.budget {
            return Err(Error::new(
                ErrorKind::AggregationLimitExceeded,
                format!(
                    "aggregation memory {} exceeds budget {}",
                    self.used, self.budget
                ),
            ));
        }
        Ok(())
    }
}

/// Run an aggregation request over the per-segment match sets of a
/// query.
pub fn run_aggregations(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    request: &AggregationRequest,
    limits: &AggregationLimits,
) -> Result<AggregationResults> {
    let mut counter = MemoryCounter {
        used: 0,
        budget: limits.memory_budget,
    };
    exec_request(schema, segments, docs, request, limits, 1, &mut counter)
}

#[allow(clippy::too_many_arguments)]
fn exec_request(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    request: &AggregationRequest,
    limits: &AggregationLimits,
    depth: usize,
    counter: &mut MemoryCounter,
) -> Result<AggregationResults> {
    if depth > limits.max_depth {
        return Err(Error::new(
            ErrorKind::NestingTooDeep,
            format!("aggregation nesting exceeds {} levels", limits.max_depth),
        ));
    }
    let mut results = BTreeMap::new();
    for (name, aggregation) in request {
        if !aggregation.variant.is_bucket() && !aggregation.sub.is_empty() {
            return Err(Error::new(
                ErrorKind::UnsupportedAggregation,
                format!("metric aggregation '{}' cannot nest sub-aggregations", name),
            ));
        }
        let result = exec_one(schema, segments, docs, aggregation, limits, depth, counter)?;
        results.insert(name.clone(), result);
    }
    Ok(results)
}

fn exec_one(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    aggregation: &Aggregation,
    limits: &AggregationLimits,
    depth: usize,
    counter: &mut MemoryCounter,
) -> Result<AggregationResult> {
    match &aggregation.variant {
        AggregationVariant::Terms(terms) => {
            exec_terms(schema, segments, docs, terms, &aggregation.sub, limits, depth, counter)
        }
        AggregationVariant::Histogram(histogram) => exec_histogram(
            schema, segments, docs, histogram, &aggregation.sub, limits, depth, counter,
        ),
        AggregationVariant::DateHistogram(date_histogram) => exec_date_histogram(
            schema, segments, docs, date_histogram, &aggregation.sub, limits, depth, counter,
        ),
        AggregationVariant::Range(range) => exec_range(
            schema, segments, docs, range, &aggregation.sub, limits, depth, counter,
        ),
        AggregationVariant::Avg(metric) => exec_numeric_metric(schema, segments, docs, metric, |values| {
            let (sum, count) = sum_count(values);
            MetricResult::Value {
                value: if count > 0 { Some(sum / count as f64) } else { None },
            }
        }),
        AggregationVariant::Min(metric) => exec_numeric_metric(schema, segments, docs, metric, |values| {
            MetricResult::Value {
                value: values.iter().copied().reduce(f64::min),
            }
        }),
        AggregationVariant::Max(metric) => exec_numeric_metric(schema, segments, docs, metric, |values| {
            MetricResult::Value {
                value: values.iter().copied().reduce(f64::max),
            }
        }),
        AggregationVariant::Sum(metric) => exec_numeric_metric(schema, segments, docs, metric, |values| {
            MetricResult::Value {
                value: Some(values.iter().sum()),
            }
        }),
        AggregationVariant::ValueCount(metric) => exec_value_count(schema, segments, docs, metric),
        AggregationVariant::Stats(metric) => exec_numeric_metric(schema, segments, docs, metric, |values| {
            let (sum, count) = sum_count(values);
            MetricResult::Stats {
                count,
                min: values.iter().copied().reduce(f64::min),
                max: values.iter().copied().reduce(f64::max),
                sum,
                avg: if count > 0 { Some(sum / count as f64) } else { None },
            }
        }),
        AggregationVariant::Percentiles(percentiles) => {
            exec_percentiles(schema, segments, docs, percentiles)
        }
    }
}

fn sum_count(values: &[f64]) -> (f64, u64) {
    (values.iter().sum(), values.len() as u64)
}

// ----------------------------------------------------------- columns

fn numeric_column<'a>(
    schema: &Schema,
    segment: &'a SegmentReader,
    field_name: &str,
) -> Result<Option<&'a NumericColumn>> {
    let field = schema.field_by_name(field_name).map_err(|_| {
        Error::new(
            ErrorKind::AggregationFieldRequired,
            format!("aggregation field '{}' does not exist", field_name),
        )
    })?;
    let entry = schema.field_entry(field);
    if !entry.is_fast() || !entry.field_type.is_numeric() {
        return Err(Error::new(
            ErrorKind::AggregationFieldRequired,
            format!(
                "aggregation field '{}' must be a fast numeric field",
                field_name
            ),
        ));
    }
    Ok(segment.field(field).and_then(|reader| reader.numeric_column()))
}

fn str_or_numeric_column<'a>(
    schema: &Schema,
    segment: &'a SegmentReader,
    field_name: &str,
) -> Result<(Option<&'a StrColumn>, Option<&'a NumericColumn>)> {
    let field = schema.field_by_name(field_name).map_err(|_| {
        Error::new(
            ErrorKind::AggregationFieldRequired,
            format!("aggregation field '{}' does not exist", field_name),
        )
    })?;
    let entry = schema.field_entry(field);
    let reader = match segment.field(field) {
        Some(reader) => reader,
        None => return Ok((None, None)),
    };
    match entry.field_type {
        FieldType::Text | FieldType::Facet => {
            let column = reader.str_column().ok_or_else(|| {
                Error::new(
                    ErrorKind::AggregationFieldRequired,
                    format!("field '{}' carries no value column", field_name),
                )
            })?;
            Ok((Some(column), None))
        }
        t if t.is_numeric() => Ok((None, reader.numeric_column())),
        _ => Err(Error::new(
            ErrorKind::UnsupportedAggregation,
            format!("terms aggregation unsupported on field '{}'", field_name),
        )),
    }
}

fn doc_numeric_values(column: &NumericColumn, doc: DocId, out: &mut Vec<f64>) {
    for &(_, raw) in column.values_for(doc) {
        out.push(column.kind.decode_f64(raw));
    }
}

// -------------------------------------------------------------- terms

#[derive(Debug, Clone, PartialEq)]
enum TermKey {
    Str(String),
    Num(f64),
}

impl Eq for TermKey {}

impl Ord for TermKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TermKey::Str(a), TermKey::Str(b)) => a.cmp(b),
            (TermKey::Num(a), TermKey::Num(b)) => a.total_cmp(b),
            (TermKey::Str(_), TermKey::Num(_)) => Ordering::Greater,
            (TermKey::Num(_), TermKey::Str(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for TermKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct BucketAccum {
    doc_count: u64,
    /// Per-segment doc sets, tracked only when sub-aggregations exist.
    docs: Option<Vec<Vec<DocId>>>,
}

#[allow(clippy::too_many_arguments)]
fn exec_terms(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    terms: &TermsAggregation,
    sub: &AggregationRequest,
    limits: &AggregationLimits,
    depth: usize,
    counter: &mut MemoryCounter,
) -> Result<AggregationResult> {
    let track_docs = !sub.is_empty();
    let mut buckets: BTreeMap<TermKey, BucketAccum> = BTreeMap::new();

    for (segment_ord, segment) in segments.iter().enumerate() {
        let (str_column, num_column) =
            str_or_numeric_column(schema, segment.as_ref(), &terms.field)?;
        for &doc in &docs[segment_ord] {
            let mut keys: Vec<TermKey> = Vec::new();
            if let Some(column) = str_column {
                keys.extend(column.values_for(doc).map(|v| TermKey::Str(v.to_string())));
            }
            if let Some(column) = num_column {
                let mut values = Vec::new();
                doc_numeric_values(column, doc, &mut values);
                keys.extend(values.into_iter().map(TermKey::Num));
            }
            // A doc repeating the same value still counts once per bucket.
            keys.sort();
            keys.dedup();
            for key in keys {
                if !buckets.contains_key(&key) {
                    let key_bytes = match &key {
                        TermKey::Str(s) => s.len(),
                        TermKey::Num(_) => 8,
                    };
                    counter.charge(key_bytes + 48)?;
                }
                let bucket = buckets.entry(key).or_insert_with(|| BucketAccum {
                    doc_count: 0,
                    docs: track_docs.then(|| vec![Vec::new(); segments.len()]),
                });
                bucket.doc_count += 1;
                if let Some(per_segment) = bucket.docs.as_mut() {
                    counter.charge(4)?;
                    per_segment[segment_ord].push(doc);
                }
            }
        }
    }

    let mut entries: Vec<(TermKey, BucketAccum)> = buckets.into_iter().collect();
    sort_term_buckets(&mut entries, terms);
    entries.retain(|(_, bucket)| bucket.doc_count >= terms.min_doc_count);
    entries.truncate(terms.size);

    let mut out = Vec::with_capacity(entries.len());
    for (key, bucket) in entries {
        let mut entry = BucketEntry::new(
            match &key {
                TermKey::Str(s) => BucketKey::Str(s.clone()),
                TermKey::Num(n) => BucketKey::Num(*n),
            },
            bucket.doc_count,
        );
        if let Some(bucket_docs) = bucket.docs {
            entry.sub = exec_request(
                schema,
                segments,
                &bucket_docs,
                sub,
                limits,
                depth + 1,
                counter,
            )?;
        }
        out.push(entry);
    }
    Ok(AggregationResult::Buckets { buckets: out })
}

fn sort_term_buckets(entries: &mut [(TermKey, BucketAccum)], terms: &TermsAggregation) {
    let order = terms.order.clone().unwrap_or_default();
    if let Some(direction) = order.key {
        entries.sort_by(|a, b| {
            let ordering = a.0.cmp(&b.0);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    } else {
        let direction = order.count.unwrap_or(SortDirection::Desc);
        entries.sort_by(|a, b| {
            let ordering = match direction {
                SortDirection::Asc => a.1.doc_count.cmp(&b.1.doc_count),
                SortDirection::Desc => b.1.doc_count.cmp(&a.1.doc_count),
            };
            // Ties break by ascending key.
            ordering.then_with(|| a.0.cmp(&b.0))
        });
    }
}

// ---------------------------------------------------------- histogram

#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF64(f64);

impl Eq for OrdF64 {}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[allow(clippy::too_many_arguments)]
fn exec_histogram(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    histogram: &HistogramAggregation,
    sub: &AggregationRequest,
    limits: &AggregationLimits,
    depth: usize,
    counter: &mut MemoryCounter,
) -> Result<AggregationResult> {
    if !(histogram.interval > 0.0) {
        return Err(Error::new(
            ErrorKind::UnsupportedAggregation,
            "histogram interval must be positive",
        ));
    }
    let track_docs = !sub.is_empty();
    let mut buckets: BTreeMap<OrdF64, BucketAccum> = BTreeMap::new();

    let bucket_key = |value: f64| {
        ((value - histogram.offset) / histogram.interval).floor() * histogram.interval
            + histogram.offset
    };

    for (segment_ord, segment) in segments.iter().enumerate() {
        let column = match numeric_column(schema, segment.as_ref(), &histogram.field)? {
            Some(column) => column,
            None => continue,
        };
        let mut values = Vec::new();
        for &doc in &docs[segment_ord] {
            values.clear();
            doc_numeric_values(column, doc, &mut values);
            let mut keys: Vec<OrdF64> = values.iter().map(|&v| OrdF64(bucket_key(v))).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                if !buckets.contains_key(&key) {
                    counter.charge(56)?;
                }
                let bucket = buckets.entry(key).or_insert_with(|| BucketAccum {
                    doc_count: 0,
                    docs: track_docs.then(|| vec![Vec::new(); segments.len()]),
                });
                bucket.doc_count += 1;
                if let Some(per_segment) = bucket.docs.as_mut() {
                    counter.charge(4)?;
                    per_segment[segment_ord].push(doc);
                }
            }
        }
    }

    // Gap filling: empty buckets appear when min_doc_count is 0, over
    // the observed span extended by extended_bounds.
    if histogram.min_doc_count == 0 && (!buckets.is_empty() || histogram.extended_bounds.is_some())
    {
        let mut lo = buckets.keys().next().map(|k| k.0);
        let mut hi = buckets.keys().next_back().map(|k| k.0);
        if let Some(bounds) = histogram.extended_bounds {
            let bound_lo = bucket_key(bounds.min);
            let bound_hi = bucket_key(bounds.max);
            lo = Some(lo.map_or(bound_lo, |v| v.min(bound_lo)));
            hi = Some(hi.map_or(bound_hi, |v| v.max(bound_hi)));
        }
        if let (Some(lo), Some(hi)) = (lo, hi) {
            let steps = ((hi - lo) / histogram.interval).round() as i64;
            for step in 0..=steps {
                let key = OrdF64(lo + step as f64 * histogram.interval);
                if !buckets.contains_key(&key) {
                    counter.charge(56)?;
                }
                buckets.entry(key).or_insert_with(|| BucketAccum {
                    doc_count: 0,
                    docs: track_docs.then(|| vec![Vec::new(); segments.len()]),
                });
            }
        }
    }

    let mut out = Vec::with_capacity(buckets.len());
    for (key, bucket) in buckets {
        if bucket.doc_count < histogram.min_doc_count {
            continue;
        }
        let mut entry = BucketEntry::new(BucketKey::Num(key.0), bucket.doc_count);
        if let Some(bucket_docs) = bucket.docs {
            entry.sub = exec_request(
                schema,
                segments,
                &bucket_docs,
                sub,
                limits,
                depth + 1,
                counter,
            )?;
        }
        out.push(entry);
    }
    Ok(AggregationResult::Buckets { buckets: out })
}

// ----------------------------------------------------- date histogram

/// Truncate epoch seconds to the start of the enclosing calendar unit.
pub fn truncate_to_interval(secs: i64, interval: CalendarInterval) -> i64 {
    match interval {
        CalendarInterval::Second => secs,
        CalendarInterval::Minute => secs - secs.rem_euclid(60),
        CalendarInterval::Hour => secs - secs.rem_euclid(3600),
        CalendarInterval::Day => secs - secs.rem_euclid(86_400),
        CalendarInterval::Week => {
            // Weeks start on Monday; the epoch was a Thursday.
            let days = secs.div_euclid(86_400);
            let weekday = (days + 3).rem_euclid(7);
            (days - weekday) * 86_400
        }
        CalendarInterval::Month | CalendarInterval::Quarter | CalendarInterval::Year => {
            let dt = match Utc.timestamp_opt(secs, 0).single() {
                Some(dt) => dt,
                None => return secs,
            };
            let (year, month) = match interval {
                CalendarInterval::Year => (dt.year(), 1),
                CalendarInterval::Quarter => (dt.year(), (dt.month0() / 3) * 3 + 1),
                _ => (dt.year(), dt.month()),
            };
            Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
                .single()
                .map(|start| start.timestamp())
                .unwrap_or(secs)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn exec_date_histogram(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    date_histogram: &DateHistogramAggregation,
    sub: &AggregationRequest,
    limits: &AggregationLimits,
    depth: usize,
    counter: &mut MemoryCounter,
) -> Result<AggregationResult> {
    let track_docs = !sub.is_empty();
    let mut buckets: BTreeMap<i64, BucketAccum> = BTreeMap::new();

    for (segment_ord, segment) in segments.iter().enumerate() {
        let column = match numeric_column(schema, segment.as_ref(), &date_histogram.field)? {
            Some(column) => column,
            None => continue,
        };
        let mut values = Vec::new();
        for &doc in &docs[segment_ord] {
            values.clear();
            doc_numeric_values(column, doc, &mut values);
            let mut keys: Vec<i64> = values
                .iter()
                .map(|&v| truncate_to_interval(v as i64, date_histogram.calendar_interval))
                .collect();
            keys.sort_unstable();
            keys.dedup();
            for key in keys {
                if !buckets.contains_key(&key) {
                    counter.charge(56)?;
                }
                let bucket = buckets.entry(key).or_insert_with(|| BucketAccum {
                    doc_count: 0,
                    docs: track_docs.then(|| vec![Vec::new(); segments.len()]),
                });
                bucket.doc_count += 1;
                if let Some(per_segment) = bucket.docs.as_mut() {
                    counter.charge(4)?;
                    per_segment[segment_ord].push(doc);
                }
            }
        }
    }

    let mut out = Vec::with_capacity(buckets.len());
    for (key_secs, bucket) in buckets {
        let mut entry = BucketEntry::new(BucketKey::Num(key_secs as f64), bucket.doc_count);
        entry.key_as_string = Utc.timestamp_opt(key_secs, 0).single().map(|dt| {
            match &date_histogram.format {
                Some(format) => dt.format(format).to_string(),
                None => dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            }
        });
        if let Some(bucket_docs) = bucket.docs {
            entry.sub = exec_request(
                schema,
                segments,
                &bucket_docs,
                sub,
                limits,
                depth + 1,
                counter,
            )?;
        }
        out.push(entry);
    }
    Ok(AggregationResult::Buckets { buckets: out })
}

// -------------------------------------------------------------- range

#[allow(clippy::too_many_arguments)]
fn exec_range(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    range: &RangeAggregation,
    sub: &AggregationRequest,
    limits: &AggregationLimits,
    depth: usize,
    counter: &mut MemoryCounter,
) -> Result<AggregationResult> {
    let track_docs = !sub.is_empty();
    let mut accums: Vec<BucketAccum> = range
        .ranges
        .iter()
        .map(|_| BucketAccum {
            doc_count: 0,
            docs: track_docs.then(|| vec![Vec::new(); segments.len()]),
        })
        .collect();
    counter.charge(range.ranges.len() * 56)?;

    let contains = |spec: &crate::aggregation::request::RangeSpec, value: f64| {
        spec.from.map_or(true, |from| value >= from) && spec.to.map_or(true, |to| value < to)
    };

    for (segment_ord, segment) in segments.iter().enumerate() {
        let column = match numeric_column(schema, segment.as_ref(), &range.field)? {
            Some(column) => column,
            None => continue,
        };
        let mut values = Vec::new();
        for &doc in &docs[segment_ord] {
            values.clear();
            doc_numeric_values(column, doc, &mut values);
            for &value in &values {
                // First matching range wins.
                if let Some(idx) = range.ranges.iter().position(|spec| contains(spec, value)) {
                    let bucket = &mut accums[idx];
                    let duplicate = bucket
                        .docs
                        .as_ref()
                        .map(|d| d[segment_ord].last() == Some(&doc))
                        .unwrap_or(false);
                    if !duplicate {
                        bucket.doc_count += 1;
                        if let Some(per_segment) = bucket.docs.as_mut() {
                            counter.charge(4)?;
                            per_segment[segment_ord].push(doc);
                        }
                    }
                }
            }
        }
    }

    let mut out = Vec::with_capacity(range.ranges.len());
    for (spec, bucket) in range.ranges.iter().zip(accums) {
        let key = spec.key.clone().unwrap_or_else(|| {
            let from = spec.from.map_or("*".to_string(), |v| v.to_string());
            let to = spec.to.map_or("*".to_string(), |v| v.to_string());
            format!("{}-{}", from, to)
        });
        let mut entry = BucketEntry::new(BucketKey::Str(key), bucket.doc_count);
        entry.from = spec.from;
        entry.to = spec.to;
        if let Some(bucket_docs) = bucket.docs {
            entry.sub = exec_request(
                schema,
                segments,
                &bucket_docs,
                sub,
                limits,
                depth + 1,
                counter,
            )?;
        }
        out.push(entry);
    }
    Ok(AggregationResult::Buckets { buckets: out })
}

// ------------------------------------------------------------ metrics

fn exec_numeric_metric(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    metric: &MetricAggregation,
    finish: impl FnOnce(&[f64]) -> MetricResult,
) -> Result<AggregationResult> {
    let mut values: Vec<f64> = Vec::new();
    for (segment_ord, segment) in segments.iter().enumerate() {
        let column = match numeric_column(schema, segment.as_ref(), &metric.field)? {
            Some(column) => column,
            None => continue,
        };
        for &doc in &docs[segment_ord] {
            doc_numeric_values(column, doc, &mut values);
        }
    }
    Ok(AggregationResult::Metric(finish(&values)))
}

fn exec_value_count(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    metric: &MetricAggregation,
) -> Result<AggregationResult> {
    let mut count = 0u64;
    for (segment_ord, segment) in segments.iter().enumerate() {
        let (str_column, num_column) = str_or_numeric_column(schema, segment.as_ref(), &metric.field)?;
        for &doc in &docs[segment_ord] {
            if let Some(column) = str_column {
                count += column.values_for(doc).count() as u64;
            }
            if let Some(column) = num_column {
                count += column.values_for(doc).len() as u64;
            }
        }
    }
    Ok(AggregationResult::Metric(MetricResult::Value {
        value: Some(count as f64),
    }))
}

fn exec_percentiles(
    schema: &Schema,
    segments: &[Arc<SegmentReader>],
    docs: &[Vec<DocId>],
    percentiles: &PercentilesAggregation,
) -> Result<AggregationResult> {
    let mut digest = TDigest::default();
    let mut values = Vec::new();
    for (segment_ord, segment) in segments.iter().enumerate() {
        let column = match numeric_column(schema, segment.as_ref(), &percentiles.field)? {
            Some(column) => column,
            None => continue,
        };
        for &doc in &docs[segment_ord] {
            values.clear();
            doc_numeric_values(column, doc, &mut values);
            for &value in &values {
                digest.add(value);
            }
        }
    }
    let mut out = BTreeMap::new();
    for &percent in &percentiles.percents {
        if let Some(value) = digest.percentile(percent) {
            out.insert(format!("{:?}", percent), value);
        }
    }
    Ok(AggregationResult::Metric(MetricResult::Percentiles {
        values: out,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_truncation() {
        // 2024-03-15T13:45:30Z
        let secs = 1_710_510_330;
        let day = truncate_to_interval(secs, CalendarInterval::Day);
        assert_eq!(day % 86_400, 0);
        let dt = Utc.timestamp_opt(day, 0).single().unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 15));

        let month = truncate_to_interval(secs, CalendarInterval::Month);
        let dt = Utc.timestamp_opt(month, 0).single().unwrap();
        assert_eq!((dt.month(), dt.day()), (3, 1));

        let quarter = truncate_to_interval(secs, CalendarInterval::Quarter);
        let dt = Utc.timestamp_opt(quarter, 0).single().unwrap();
        assert_eq!((dt.month(), dt.day()), (1, 1));

        let week = truncate_to_interval(secs, CalendarInterval::Week);
        let dt = Utc.timestamp_opt(week, 0).single().unwrap();
        assert_eq!(dt.weekday(), chrono::Weekday::Mon);
    }

    #[test]
    fn test_term_key_ordering() {
        let mut keys = vec![
            TermKey::Str("b".to_string()),
            TermKey::Num(2.0),
            TermKey::Str("a".to_string()),
            TermKey::Num(-1.0),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                TermKey::Num(-1.0),
                TermKey::Num(2.0),
                TermKey::Str("a".to_string()),
                TermKey::Str("b".to_string()),
            ]
        );
    }
}
