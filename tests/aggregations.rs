//! Aggregation engine over committed indexes: bucket and metric
//! aggregations, nesting, ordering, limits, and determinism.

use lantern::aggregation::AggregationRequest;
use lantern::core::ErrorKind;
use lantern::query::Query;
use lantern::schema::{FieldOptions, Schema};
use lantern::{Document, Index};

/// Ten docs: categories x/y/z with frequencies 5/3/2 and known prices.
fn catalog_index() -> Index {
    let mut builder = Schema::builder();
    builder
        .add_text_field(
            "category",
            FieldOptions::indexed()
                .and_fast()
                .with_tokenizer("keyword"),
        )
        .unwrap();
    builder
        .add_f64_field("price", FieldOptions::fast_stored())
        .unwrap();
    builder
        .add_date_field("sold_at", FieldOptions::fast())
        .unwrap();
    let index = Index::create_in_ram(builder.build()).unwrap();
    let mut writer = index.writer().unwrap();
    let rows = [
        ("x", 10.0, "2024-01-05T10:00:00Z"),
        ("x", 20.0, "2024-01-20T10:00:00Z"),
        ("x", 30.0, "2024-02-01T10:00:00Z"),
        ("x", 40.0, "2024-02-11T10:00:00Z"),
        ("x", 50.0, "2024-03-01T10:00:00Z"),
        ("y", 100.0, "2024-01-09T10:00:00Z"),
        ("y", 200.0, "2024-02-15T10:00:00Z"),
        ("y", 300.0, "2024-03-20T10:00:00Z"),
        ("z", 5.0, "2024-01-01T00:00:00Z"),
        ("z", 15.0, "2024-03-31T23:59:59Z"),
    ];
    for (category, price, sold_at) in rows {
        let mut doc = Document::new();
        doc.add_text("category", category)
            .add_f64("price", price)
            .add_text("sold_at", sold_at);
        writer.add_document(&doc).unwrap();
    }
    writer.commit().unwrap();
    index
}

fn request(json: serde_json::Value) -> AggregationRequest {
    serde_json::from_value(json).unwrap()
}

#[test]
fn test_terms_with_nested_avg() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "by_category": {
            "terms": { "field": "category", "size": 10 },
            "aggs": { "avg_price": { "avg": { "field": "price" } } }
        }
    }));
    let (_, results) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();

    let buckets = results["by_category"].buckets().unwrap();
    assert_eq!(buckets.len(), 3);
    // Descending doc_count, ties by ascending key.
    let summary: Vec<(&str, u64, f64)> = buckets
        .iter()
        .map(|b| {
            (
                b.key.as_str().unwrap(),
                b.doc_count,
                b.sub["avg_price"].metric_value().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![("x", 5, 30.0), ("y", 3, 200.0), ("z", 2, 10.0)]
    );
}

#[test]
fn test_terms_order_and_size_options() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "t": { "terms": { "field": "category", "size": 2, "order": { "_key": "desc" } } }
    }));
    let (_, results) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();
    let keys: Vec<&str> = results["t"]
        .buckets()
        .unwrap()
        .iter()
        .map(|b| b.key.as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["z", "y"]);
}

#[test]
fn test_histogram_buckets_and_gap_filling() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "h": { "histogram": { "field": "price", "interval": 100.0 } }
    }));
    let (_, results) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();
    let buckets = results["h"].buckets().unwrap();
    // Observed span 0..300 with min_doc_count 0 fills every step.
    let counts: Vec<(f64, u64)> = buckets
        .iter()
        .map(|b| (b.key.as_f64().unwrap(), b.doc_count))
        .collect();
    assert_eq!(
        counts,
        vec![(0.0, 7), (100.0, 1), (200.0, 1), (300.0, 1)]
    );
}

#[test]
fn test_histogram_min_doc_count_filters() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "h": { "histogram": { "field": "price", "interval": 100.0, "min_doc_count": 2 } }
    }));
    let (_, results) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();
    let buckets = results["h"].buckets().unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].doc_count, 7);
}

#[test]
fn test_date_histogram_by_month() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "monthly": {
            "date_histogram": { "field": "sold_at", "calendar_interval": "month" }
        }
    }));
    let (_, results) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();
    let buckets = results["monthly"].buckets().unwrap();
    assert_eq!(buckets.len(), 3);
    let counts: Vec<(&str, u64)> = buckets
        .iter()
        .map(|b| (b.key_as_string.as_deref().unwrap(), b.doc_count))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("2024-01-01T00:00:00Z", 4),
            ("2024-02-01T00:00:00Z", 3),
            ("2024-03-01T00:00:00Z", 3),
        ]
    );
}

#[test]
fn test_range_aggregation_first_match_wins() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "tiers": {
            "range": {
                "field": "price",
                "ranges": [
                    { "key": "cheap", "to": 50.0 },
                    { "key": "mid", "from": 50.0, "to": 150.0 },
                    { "from": 150.0 }
                ]
            }
        }
    }));
    let (_, results) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();
    let buckets = results["tiers"].buckets().unwrap();
    let counts: Vec<(&str, u64)> = buckets
        .iter()
        .map(|b| (b.key.as_str().unwrap(), b.doc_count))
        .collect();
    // cheap: 10,20,30,40,5,15 (6); mid: 50,100 (2); rest: 200,300 (2).
    assert_eq!(counts, vec![("cheap", 6), ("mid", 2), ("150-*", 2)]);
}

#[test]
fn test_stats_and_value_count() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "price_stats": { "stats": { "field": "price" } },
        "n": { "value_count": { "field": "category" } }
    }));
    let (_, results) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();

    let rendered = serde_json::to_value(&results["price_stats"]).unwrap();
    assert_eq!(rendered["count"], 10);
    assert_eq!(rendered["min"], 5.0);
    assert_eq!(rendered["max"], 300.0);
    assert_eq!(rendered["sum"], 770.0);
    assert_eq!(rendered["avg"], 77.0);

    assert_eq!(results["n"].metric_value(), Some(10.0));
}

#[test]
fn test_percentiles_within_tolerance() {
    let mut builder = Schema::builder();
    builder
        .add_f64_field("v", FieldOptions::fast())
        .unwrap();
    let index = Index::create_in_ram(builder.build()).unwrap();
    let mut writer = index.writer().unwrap();
    for i in 1..=100 {
        let mut doc = Document::new();
        doc.add_f64("v", i as f64);
        writer.add_document(&doc).unwrap();
    }
    writer.commit().unwrap();

    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "p": { "percentiles": { "field": "v", "percents": [50.0, 95.0] } }
    }));
    let (_, results) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();
    let rendered = serde_json::to_value(&results["p"]).unwrap();
    let p50 = rendered["values"]["50.0"].as_f64().unwrap();
    let p95 = rendered["values"]["95.0"].as_f64().unwrap();
    assert!((p50 - 50.0).abs() <= 3.0, "p50 {}", p50);
    assert!((p95 - 95.0).abs() <= 3.0, "p95 {}", p95);
}

#[test]
fn test_aggregation_respects_query_filter() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let query = Query::term("category", "x");
    let request = request(serde_json::json!({
        "avg": { "avg": { "field": "price" } }
    }));
    let (hits, results) = searcher.search_with_aggregation(&query, 3, &request).unwrap();
    assert_eq!(hits.len(), 3); // limit truncates hits, not aggregation input
    assert_eq!(results["avg"].metric_value(), Some(30.0));
}

#[test]
fn test_nesting_depth_cap() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "a": { "terms": { "field": "category" }, "aggs": {
            "b": { "terms": { "field": "category" }, "aggs": {
                "c": { "terms": { "field": "category" }, "aggs": {
                    "d": { "avg": { "field": "price" } }
                } }
            } }
        } }
    }));
    let err = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NestingTooDeep);
}

#[test]
fn test_metric_on_non_fast_field_is_rejected() {
    let mut builder = Schema::builder();
    builder
        .add_text_field("title", FieldOptions::text())
        .unwrap();
    builder
        .add_u64_field("n", FieldOptions::indexed())
        .unwrap();
    let index = Index::create_in_ram(builder.build()).unwrap();
    let mut writer = index.writer().unwrap();
    let mut doc = Document::new();
    doc.add_text("title", "hello").add_u64("n", 1);
    writer.add_document(&doc).unwrap();
    writer.commit().unwrap();

    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "avg": { "avg": { "field": "n" } }
    }));
    let err = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AggregationFieldRequired);
}

#[test]
fn test_metric_with_sub_aggregation_is_rejected() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "avg": { "avg": { "field": "price" }, "aggs": {
            "inner": { "max": { "field": "price" } }
        } }
    }));
    let err = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedAggregation);
}

#[test]
fn test_memory_budget_fails_instead_of_truncating() {
    use lantern::aggregation::{run_aggregations, AggregationLimits};
    use lantern::search::matching_docs;

    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let docs: Vec<Vec<u32>> = searcher
        .segment_readers()
        .iter()
        .map(|segment| matching_docs(index.schema(), segment.as_ref(), &Query::MatchAll).unwrap())
        .collect();
    let request = request(serde_json::json!({
        "t": { "terms": { "field": "category" } }
    }));
    let limits = AggregationLimits {
        max_depth: 3,
        memory_budget: 16, // far below one bucket
    };
    let err = run_aggregations(
        index.schema(),
        searcher.segment_readers(),
        &docs,
        &request,
        &limits,
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AggregationLimitExceeded);
}

#[test]
fn test_aggregation_results_are_run_invariant() {
    let index = catalog_index();
    let searcher = index.reader().unwrap().searcher();
    let request = request(serde_json::json!({
        "by_category": {
            "terms": { "field": "category" },
            "aggs": {
                "stats": { "stats": { "field": "price" } },
                "p": { "percentiles": { "field": "price" } }
            }
        },
        "monthly": { "date_histogram": { "field": "sold_at", "calendar_interval": "month" } }
    }));
    let (_, first) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();
    let (_, second) = searcher
        .search_with_aggregation(&Query::MatchAll, 0, &request)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
