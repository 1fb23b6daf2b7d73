use regex::Regex;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::Instant;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::column::{f64_to_u64, i64_to_u64};
use crate::index::posting::PostingList;
use crate::index::term;
use crate::query::ast::{Occur, Query, QueryBound};
use crate::reader::segment_reader::{FieldReader, SegmentReader};
use crate::schema::document::coerce_value;
use crate::schema::{Field, FieldEntry, FieldType, Schema, Value};
use crate::scoring::Bm25Params;
use crate::search::fuzzy::FuzzyMatcher;

/// A matching doc with its accumulated score, local to one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub doc: DocId,
    pub score: f32,
}

/// Shared state for one query execution.
pub struct ExecutionContext<'a> {
    pub schema: &'a Schema,
    pub params: Bm25Params,
    pub deadline: Option<Instant>,
    /// When false, every match scores 1.0 and BM25 statistics are
    /// skipped (deletion staging, counting, aggregation input).
    pub scoring: bool,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        ExecutionContext {
            schema,
            params: Bm25Params::default(),
            deadline: None,
            scoring: true,
        }
    }

    pub fn unscored(schema: &'a Schema) -> Self {
        ExecutionContext {
            scoring: false,
            ..Self::new(schema)
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn check_deadline(&self, phase: &'static str) -> Result<()> {
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(Error::timeout(phase));
            }
        }
        Ok(())
    }
}

/// Evaluate a query against one segment. The result is sorted by doc id
/// and contains live documents only.
pub fn eval_segment(
    ctx: &ExecutionContext,
    segment: &SegmentReader,
    query: &Query,
) -> Result<Vec<Scored>> {
    ctx.check_deadline("query evaluation")?;
    match query {
        Query::MatchAll => Ok(segment
            .live_docs()
            .map(|doc| Scored { doc, score: 1.0 })
            .collect()),
        Query::Boost(inner, boost) => {
            let mut scored = eval_segment(ctx, segment, inner)?;
            if ctx.scoring {
                for entry in &mut scored {
                    entry.score *= boost;
                }
            }
            Ok(scored)
        }
        Query::Term(q) => {
            let (field, entry) = resolve(ctx.schema, &q.field)?;
            let reader = match segment.field(field) {
                Some(reader) => reader,
                None => return Ok(Vec::new()),
            };
            let bytes = encode_term(entry, &q.value)?;
            let scored = match reader.postings(&bytes) {
                Some(postings) => score_postings(ctx, segment, reader, postings),
                None => Vec::new(),
            };
            Ok(scored)
        }
        Query::Phrase(q) => eval_phrase(ctx, segment, q),
        Query::Range(q) => eval_range(ctx, segment, q),
        Query::Boolean(q) => eval_boolean(ctx, segment, &q.clauses),
        Query::Fuzzy(q) => {
            let (field, entry) = resolve(ctx.schema, &q.field)?;
            if entry.field_type != FieldType::Text && entry.field_type != FieldType::Json {
                return Err(Error::new(
                    ErrorKind::RangeTypeMismatch,
                    format!("fuzzy queries need a text field, '{}' is not one", q.field),
                ));
            }
            let reader = match segment.field(field) {
                Some(reader) => reader,
                None => return Ok(Vec::new()),
            };
            let prefix: String = q.term.chars().take(q.prefix_len).collect();
            let matcher = FuzzyMatcher::new(&q.term, q.max_edits);
            let lists: Vec<&PostingList> = reader
                .terms_with_prefix(prefix.as_bytes())
                .into_iter()
                .filter(|(term_bytes, _)| matcher.matches(term_bytes))
                .map(|(_, postings)| postings)
                .collect();
            Ok(score_term_set(ctx, segment, reader, &lists))
        }
        Query::Wildcard(q) => {
            let (field, _) = resolve(ctx.schema, &q.field)?;
            let reader = match segment.field(field) {
                Some(reader) => reader,
                None => return Ok(Vec::new()),
            };
            let regex = compile_wildcard(&q.pattern)?;
            let prefix = literal_prefix(&q.pattern);
            let candidates = if prefix.is_empty() {
                reader.all_terms()
            } else {
                reader.terms_with_prefix(prefix.as_bytes())
            };
            let lists: Vec<&PostingList> = candidates
                .into_iter()
                .filter(|(term_bytes, _)| {
                    std::str::from_utf8(term_bytes)
                        .map(|t| regex.is_match(t))
                        .unwrap_or(false)
                })
                .map(|(_, postings)| postings)
                .collect();
            Ok(score_term_set(ctx, segment, reader, &lists))
        }
        Query::Regex(q) => {
            let (field, _) = resolve(ctx.schema, &q.field)?;
            let reader = match segment.field(field) {
                Some(reader) => reader,
                None => return Ok(Vec::new()),
            };
            let regex = Regex::new(&format!("^(?:{})$", q.pattern)).map_err(|e| {
                Error::new(
                    ErrorKind::RangeTypeMismatch,
                    format!("invalid regex '{}': {}", q.pattern, e),
                )
            })?;
            let lists: Vec<&PostingList> = reader
                .all_terms()
                .into_iter()
                .filter(|(term_bytes, _)| {
                    std::str::from_utf8(term_bytes)
                        .map(|t| regex.is_match(t))
                        .unwrap_or(false)
                })
                .map(|(_, postings)| postings)
                .collect();
            Ok(score_term_set(ctx, segment, reader, &lists))
        }
        Query::Facet(q) => {
            let (field, _) = resolve(ctx.schema, &q.field)?;
            let reader = match segment.field(field) {
                Some(reader) => reader,
                None => return Ok(Vec::new()),
            };
            let lists: Vec<&PostingList> = reader
                .terms_with_prefix(q.path.as_bytes())
                .into_iter()
                .filter(|(term_bytes, _)| {
                    std::str::from_utf8(term_bytes)
                        .map(|path| crate::schema::facet::facet_path_is_under(path, &q.path))
                        .unwrap_or(false)
                })
                .map(|(_, postings)| postings)
                .collect();
            Ok(constant_score_union(segment, &lists))
        }
    }
}

/// Unscored match set of a query on one segment, for deletion staging
/// and aggregation input.
pub fn matching_docs(
    schema: &Schema,
    segment: &SegmentReader,
    query: &Query,
) -> Result<Vec<DocId>> {
    let ctx = ExecutionContext::unscored(schema);
    Ok(eval_segment(&ctx, segment, query)?
        .into_iter()
        .map(|scored| scored.doc)
        .collect())
}

fn resolve<'a>(schema: &'a Schema, name: &str) -> Result<(Field, &'a FieldEntry)> {
    let field = schema.field_by_name(name)?;
    Ok((field, schema.field_entry(field)))
}

/// Encode a query-string term into the field's dictionary key space.
pub fn encode_term(entry: &FieldEntry, text: &str) -> Result<Vec<u8>> {
    match entry.field_type {
        FieldType::Text => Ok(term::text_term(text)),
        FieldType::Json => {
            // `path=token` addresses one leaf of the json tree.
            let (path, token) = text.split_once('=').ok_or_else(|| {
                Error::new(
                    ErrorKind::RangeTypeMismatch,
                    format!("json term must look like 'path=value', got '{}'", text),
                )
            })?;
            Ok(term::json_term(path, token))
        }
        field_type => {
            let coerced = coerce_value(field_type, &entry.name, &Value::Text(text.to_string()))
                .map_err(|e| Error::new(ErrorKind::RangeTypeMismatch, e.context))?;
            value_term_bytes(field_type, &coerced).ok_or_else(|| {
                Error::new(
                    ErrorKind::RangeTypeMismatch,
                    format!("'{}' does not encode for field '{}'", text, entry.name),
                )
            })
        }
    }
}

pub fn value_term_bytes(field_type: FieldType, value: &Value) -> Option<Vec<u8>> {
    match (field_type, value) {
        (FieldType::Text, Value::Text(text)) => Some(term::text_term(text)),
        (FieldType::U64, Value::U64(v)) => Some(term::u64_term(*v)),
        (FieldType::I64, Value::I64(v)) => Some(term::i64_term(*v)),
        (FieldType::F64, Value::F64(v)) => Some(term::f64_term(*v)),
        (FieldType::Bool, Value::Bool(v)) => Some(term::bool_term(*v)),
        (FieldType::Date, Value::Date(dt)) => Some(term::date_term(dt.timestamp())),
        (FieldType::Bytes, Value::Bytes(bytes)) => Some(term::bytes_term(bytes)),
        (FieldType::IpAddr, Value::IpAddr(ip)) => Some(term::ip_term(ip)),
        (FieldType::Facet, Value::Facet(facet)) => Some(term::facet_term(facet.as_str())),
        _ => None,
    }
}

// ------------------------------------------------------------ scoring

fn score_postings(
    ctx: &ExecutionContext,
    segment: &SegmentReader,
    reader: &FieldReader,
    postings: &PostingList,
) -> Vec<Scored> {
    if !ctx.scoring {
        return postings
            .postings
            .iter()
            .filter(|p| !segment.is_deleted(p.doc))
            .map(|p| Scored {
                doc: p.doc,
                score: 1.0,
            })
            .collect();
    }
    let idf = ctx
        .params
        .idf(postings.doc_freq() as u64, segment.doc_count as u64);
    let avg_len = reader.stats.average_field_length();
    postings
        .postings
        .iter()
        .filter(|p| !segment.is_deleted(p.doc))
        .map(|p| Scored {
            doc: p.doc,
            score: ctx
                .params
                .score(p.term_freq, reader.norm(p.doc), avg_len, idf),
        })
        .collect()
}

/// Union of several term posting lists; a doc matching several terms
/// keeps the best-scoring one.
fn score_term_set(
    ctx: &ExecutionContext,
    segment: &SegmentReader,
    reader: &FieldReader,
    lists: &[&PostingList],
) -> Vec<Scored> {
    let mut best: BTreeMap<DocId, f32> = BTreeMap::new();
    for postings in lists {
        for scored in score_postings(ctx, segment, reader, postings) {
            let slot = best.entry(scored.doc).or_insert(f32::MIN);
            if scored.score > *slot {
                *slot = scored.score;
            }
        }
    }
    best.into_iter()
        .map(|(doc, score)| Scored { doc, score })
        .collect()
}

fn constant_score_union(segment: &SegmentReader, lists: &[&PostingList]) -> Vec<Scored> {
    let mut docs: Vec<DocId> = lists
        .iter()
        .flat_map(|postings| postings.docs())
        .filter(|&doc| !segment.is_deleted(doc))
        .collect();
    docs.sort_unstable();
    docs.dedup();
    docs.into_iter()
        .map(|doc| Scored { doc, score: 1.0 })
        .collect()
}

// ------------------------------------------------------------- phrase

fn eval_phrase(
    ctx: &ExecutionContext,
    segment: &SegmentReader,
    q: &crate::query::ast::PhraseQuery,
) -> Result<Vec<Scored>> {
    let (field, entry) = resolve(ctx.schema, &q.field)?;
    let reader = match segment.field(field) {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };
    if q.terms.is_empty() {
        return Ok(Vec::new());
    }
    let mut lists = Vec::with_capacity(q.terms.len());
    for text in &q.terms {
        let bytes = encode_term(entry, text)?;
        match reader.postings(&bytes) {
            Some(postings) => lists.push(postings),
            None => return Ok(Vec::new()),
        }
    }

    // Intersect by doc, then verify an ordered window within slop.
    let mut scored = Vec::new();
    let avg_len = reader.stats.average_field_length();
    let idf: f32 = lists
        .iter()
        .map(|postings| {
            ctx.params
                .idf(postings.doc_freq() as u64, segment.doc_count as u64)
        })
        .sum();
    'docs: for posting in &lists[0].postings {
        let doc = posting.doc;
        if segment.is_deleted(doc) {
            continue;
        }
        let mut position_lists: Vec<&[u32]> = Vec::with_capacity(lists.len());
        position_lists.push(&posting.positions);
        for postings in &lists[1..] {
            match postings.find(doc) {
                Some(p) => position_lists.push(&p.positions),
                None => continue 'docs,
            }
        }
        let matches = phrase_window_count(&position_lists, q.slop);
        if matches > 0 {
            let score = if ctx.scoring {
                ctx.params
                    .score(matches, reader.norm(doc), avg_len, idf)
            } else {
                1.0
            };
            scored.push(Scored { doc, score });
        }
    }
    Ok(scored)
}

/// Count window starts where the terms occur in order with total slack
/// at most `slop` (slop 0 means strictly consecutive).
fn phrase_window_count(position_lists: &[&[u32]], slop: u32) -> u32 {
    let first = position_lists[0];
    let rest = &position_lists[1..];
    let mut count = 0u32;
    for &start in first {
        let mut prev = start;
        let mut ok = true;
        for positions in rest {
            // Smallest position strictly after the previous term.
            match positions.iter().copied().find(|&p| p > prev) {
                Some(next) => prev = next,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            let span = prev - start;
            if span <= slop + (position_lists.len() as u32 - 1) {
                count += 1;
            }
        }
    }
    count
}

// -------------------------------------------------------------- range

fn eval_range(
    ctx: &ExecutionContext,
    segment: &SegmentReader,
    q: &crate::query::ast::RangeQuery,
) -> Result<Vec<Scored>> {
    let (field, entry) = resolve(ctx.schema, &q.field)?;
    let reader = match segment.field(field) {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    // Fast column path for numeric domains.
    if entry.field_type.is_numeric() {
        if let Some(column) = reader.numeric_column() {
            let lo = match mapped_bound(entry, &q.lower, true)? {
                Some(lo) => lo,
                None => return Ok(Vec::new()),
            };
            let hi = match mapped_bound(entry, &q.upper, false)? {
                Some(hi) => hi,
                None => return Ok(Vec::new()),
            };
            let docs = column.docs_in_range(lo, hi);
            return Ok(docs
                .into_iter()
                .filter(|&doc| !segment.is_deleted(doc))
                .map(|doc| Scored { doc, score: 1.0 })
                .collect());
        }
    }

    // Dictionary fallback: numeric terms sort numerically by design.
    let lower = query_bound_bytes(entry, &q.lower)?;
    let upper = query_bound_bytes(entry, &q.upper)?;
    let lists = reader.postings_in_range(
        as_byte_bound(&lower),
        as_byte_bound(&upper),
    );
    Ok(constant_score_union(segment, &lists))
}

fn as_byte_bound(bound: &Option<(Vec<u8>, bool)>) -> Bound<&[u8]> {
    match bound {
        None => Bound::Unbounded,
        Some((bytes, true)) => Bound::Included(bytes.as_slice()),
        Some((bytes, false)) => Bound::Excluded(bytes.as_slice()),
    }
}

fn query_bound_bytes(
    entry: &FieldEntry,
    bound: &QueryBound,
) -> Result<Option<(Vec<u8>, bool)>> {
    let (value, inclusive) = match bound {
        QueryBound::Unbounded => return Ok(None),
        QueryBound::Included(value) => (value, true),
        QueryBound::Excluded(value) => (value, false),
    };
    let coerced = coerce_value(entry.field_type, &entry.name, value)
        .map_err(|e| Error::new(ErrorKind::RangeTypeMismatch, e.context))?;
    let bytes = value_term_bytes(entry.field_type, &coerced).ok_or_else(|| {
        Error::new(
            ErrorKind::RangeTypeMismatch,
            format!("bound does not encode for field '{}'", entry.name),
        )
    })?;
    Ok(Some((bytes, inclusive)))
}

/// Inclusive mapped-u64 bound for the column scan; `None` means the
/// range is empty (an excluded endpoint at the domain edge).
fn mapped_bound(
    entry: &FieldEntry,
    bound: &QueryBound,
    is_lower: bool,
) -> Result<Option<u64>> {
    let (value, inclusive) = match bound {
        QueryBound::Unbounded => {
            return Ok(Some(if is_lower { 0 } else { u64::MAX }));
        }
        QueryBound::Included(value) => (value, true),
        QueryBound::Excluded(value) => (value, false),
    };
    let coerced = coerce_value(entry.field_type, &entry.name, value)
        .map_err(|e| Error::new(ErrorKind::RangeTypeMismatch, e.context))?;
    let mapped = match (entry.field_type, &coerced) {
        (FieldType::U64, Value::U64(v)) => *v,
        (FieldType::I64, Value::I64(v)) => i64_to_u64(*v),
        (FieldType::F64, Value::F64(v)) => f64_to_u64(*v),
        (FieldType::Bool, Value::Bool(v)) => i64_to_u64(*v as i64),
        (FieldType::Date, Value::Date(dt)) => i64_to_u64(dt.timestamp()),
        _ => {
            return Err(Error::new(
                ErrorKind::RangeTypeMismatch,
                format!("bound does not fit field '{}'", entry.name),
            ))
        }
    };
    if inclusive {
        return Ok(Some(mapped));
    }
    // Exclusive endpoints shift by one step in the order-preserving
    // mapped domain.
    if is_lower {
        Ok(mapped.checked_add(1))
    } else {
        Ok(mapped.checked_sub(1))
    }
}

// ------------------------------------------------------------ boolean

fn eval_boolean(
    ctx: &ExecutionContext,
    segment: &SegmentReader,
    clauses: &[(Occur, Query)],
) -> Result<Vec<Scored>> {
    let mut musts: Vec<Vec<Scored>> = Vec::new();
    let mut shoulds: Vec<Vec<Scored>> = Vec::new();
    let mut filters: Vec<Vec<Scored>> = Vec::new();
    let mut excluded: Vec<DocId> = Vec::new();

    for (occur, clause) in clauses {
        ctx.check_deadline("boolean clause")?;
        let scored = eval_segment(ctx, segment, clause)?;
        match occur {
            Occur::Must => musts.push(scored),
            Occur::Should => shoulds.push(scored),
            Occur::Filter => filters.push(scored),
            Occur::MustNot => excluded.extend(scored.into_iter().map(|s| s.doc)),
        }
    }

    let mut base: Vec<Scored> = if musts.is_empty() && filters.is_empty() {
        // Pure disjunction: Should clauses become required-any.
        union_sum(&shoulds)
    } else {
        let mut required = musts;
        // Filters restrict without contributing score.
        for filter in &mut filters {
            for entry in filter.iter_mut() {
                entry.score = 0.0;
            }
        }
        required.extend(filters);
        let mut conjunction = intersect_sum(required);
        add_optional_scores(&mut conjunction, &shoulds);
        conjunction
    };

    if !excluded.is_empty() {
        let mut excluded_sorted = excluded;
        excluded_sorted.sort_unstable();
        excluded_sorted.dedup();
        base.retain(|scored| excluded_sorted.binary_search(&scored.doc).is_err());
    }
    Ok(base)
}

fn union_sum(lists: &[Vec<Scored>]) -> Vec<Scored> {
    let mut acc: BTreeMap<DocId, f32> = BTreeMap::new();
    for list in lists {
        for scored in list {
            *acc.entry(scored.doc).or_insert(0.0) += scored.score;
        }
    }
    acc.into_iter()
        .map(|(doc, score)| Scored { doc, score })
        .collect()
}

fn intersect_sum(lists: Vec<Vec<Scored>>) -> Vec<Scored> {
    let mut iter = lists.into_iter();
    let mut base = match iter.next() {
        Some(first) => first,
        None => return Vec::new(),
    };
    for list in iter {
        let lookup: BTreeMap<DocId, f32> =
            list.into_iter().map(|s| (s.doc, s.score)).collect();
        base = base
            .into_iter()
            .filter_map(|mut scored| {
                lookup.get(&scored.doc).map(|other| {
                    scored.score += *other;
                    scored
                })
            })
            .collect();
        if base.is_empty() {
            break;
        }
    }
    base
}

fn add_optional_scores(base: &mut [Scored], shoulds: &[Vec<Scored>]) {
    if shoulds.is_empty() {
        return;
    }
    let optional = union_sum(shoulds);
    let lookup: BTreeMap<DocId, f32> = optional.into_iter().map(|s| (s.doc, s.score)).collect();
    for scored in base.iter_mut() {
        if let Some(extra) = lookup.get(&scored.doc) {
            scored.score += extra;
        }
    }
}

// ----------------------------------------------------------- wildcard

fn compile_wildcard(pattern: &str) -> Result<Regex> {
    let mut regex = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    Regex::new(&regex).map_err(|e| {
        Error::new(
            ErrorKind::RangeTypeMismatch,
            format!("invalid wildcard pattern '{}': {}", pattern, e),
        )
    })
}

fn literal_prefix(pattern: &str) -> String {
    pattern
        .chars()
        .take_while(|&c| c != '*' && c != '?')
        .collect()
}
