//! Query execution across the variants: ranges, booleans, phrases,
//! fuzzy, wildcard, facets, counting, and deadlines.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use lantern::core::ErrorKind;
use lantern::query::{Occur, Query, QueryBound};
use lantern::schema::{FieldOptions, Schema, Value};
use lantern::{Document, Index};

fn price_index() -> Index {
    let mut builder = Schema::builder();
    builder
        .add_f64_field("price", FieldOptions::fast_stored())
        .unwrap();
    let index = Index::create_in_ram(builder.build()).unwrap();
    let mut writer = index.writer().unwrap();
    for price in [9.99, 49.99, 99.99, 499.99] {
        let mut doc = Document::new();
        doc.add_f64("price", price);
        writer.add_document(&doc).unwrap();
    }
    writer.commit().unwrap();
    index
}

fn hit_prices(index: &Index, query: &Query) -> Vec<f64> {
    let searcher = index.reader().unwrap().searcher();
    let field = index.schema().field_by_name("price").unwrap();
    let mut prices: Vec<f64> = searcher
        .search(query, 10)
        .unwrap()
        .into_iter()
        .map(|hit| match hit.doc.first_value(field) {
            Some(Value::F64(price)) => *price,
            other => panic!("expected price, got {:?}", other),
        })
        .collect();
    prices.sort_by(f64::total_cmp);
    prices
}

#[test]
fn test_inclusive_range_on_fast_column() {
    let index = price_index();
    let query = Query::range(
        "price",
        QueryBound::Included(Value::F64(10.0)),
        QueryBound::Included(Value::F64(100.0)),
    );
    assert_eq!(hit_prices(&index, &query), vec![49.99, 99.99]);
}

#[test]
fn test_exclusive_and_open_bounds() {
    let index = price_index();
    let exclusive = Query::range(
        "price",
        QueryBound::Excluded(Value::F64(49.99)),
        QueryBound::Unbounded,
    );
    assert_eq!(hit_prices(&index, &exclusive), vec![99.99, 499.99]);

    let below = Query::range(
        "price",
        QueryBound::Unbounded,
        QueryBound::Excluded(Value::F64(49.99)),
    );
    assert_eq!(hit_prices(&index, &below), vec![9.99]);
}

#[test]
fn test_range_via_query_string() {
    let index = price_index();
    let parser = index.parser(&[]);
    let query = parser.parse("price:[10 TO 100]").unwrap();
    assert_eq!(hit_prices(&index, &query), vec![49.99, 99.99]);

    let open = parser.parse("price:{49.99 TO *]").unwrap();
    assert_eq!(hit_prices(&index, &open), vec![99.99, 499.99]);
}

fn tags_index() -> Index {
    let mut builder = Schema::builder();
    builder
        .add_text_field("tag", FieldOptions::indexed().with_tokenizer("simple"))
        .unwrap();
    builder
        .add_u64_field("id", FieldOptions::fast_stored())
        .unwrap();
    let index = Index::create_in_ram(builder.build()).unwrap();
    let mut writer = index.writer().unwrap();
    // All eight subsets of {a, b, c}; doc id is the subset bitmask.
    for mask in 0u64..8 {
        let mut doc = Document::new();
        doc.add_u64("id", mask);
        for (bit, tag) in [(1, "a"), (2, "b"), (4, "c")] {
            if mask & bit != 0 {
                doc.add_text("tag", tag);
            }
        }
        writer.add_document(&doc).unwrap();
    }
    writer.commit().unwrap();
    index
}

fn hit_ids(index: &Index, query: &Query) -> HashSet<u64> {
    let searcher = index.reader().unwrap().searcher();
    let field = index.schema().field_by_name("id").unwrap();
    searcher
        .search(query, 20)
        .unwrap()
        .into_iter()
        .map(|hit| match hit.doc.first_value(field) {
            Some(Value::U64(id)) => *id,
            other => panic!("expected id, got {:?}", other),
        })
        .collect()
}

#[test]
fn test_boolean_exact_membership_over_tag_subsets() {
    let index = tags_index();
    let query = index
        .parser(&["tag"])
        .parse("(tag:a OR tag:b) AND NOT tag:c")
        .unwrap();
    // (a or b) and not c: masks with bit 1 or 2 set, bit 4 clear.
    let expected: HashSet<u64> = [1, 2, 3].into_iter().collect();
    assert_eq!(hit_ids(&index, &query), expected);
}

#[test]
fn test_boolean_filter_matches_like_must() {
    let index = tags_index();
    let must = Query::boolean(vec![
        (Occur::Must, Query::term("tag", "a")),
        (Occur::Must, Query::term("tag", "b")),
    ]);
    let filtered = Query::boolean(vec![
        (Occur::Must, Query::term("tag", "a")),
        (Occur::Filter, Query::term("tag", "b")),
    ]);
    assert_eq!(hit_ids(&index, &must), hit_ids(&index, &filtered));
    assert_eq!(hit_ids(&index, &must), [3, 7].into_iter().collect());
}

#[test]
fn test_match_all_scores_constant_one() {
    let index = tags_index();
    let searcher = index.reader().unwrap().searcher();
    let hits = searcher.search(&Query::MatchAll, 20).unwrap();
    assert_eq!(hits.len(), 8);
    assert!(hits.iter().all(|hit| hit.score == 1.0));
    // Ties break by ascending document address.
    let addresses: Vec<_> = hits.iter().map(|hit| hit.address).collect();
    let mut sorted = addresses.clone();
    sorted.sort();
    assert_eq!(addresses, sorted);
}

fn titles_index() -> Index {
    let mut builder = Schema::builder();
    builder
        .add_text_field("title", FieldOptions::text_stored())
        .unwrap();
    let index = Index::create_in_ram(builder.build()).unwrap();
    let mut writer = index.writer().unwrap();
    for title in [
        "the quick brown fox",
        "a quick red fox",
        "the slow brown bear",
    ] {
        let mut doc = Document::new();
        doc.add_text("title", title);
        writer.add_document(&doc).unwrap();
    }
    writer.commit().unwrap();
    index
}

#[test]
fn test_phrase_exact_and_sloppy() {
    let index = titles_index();
    let searcher = index.reader().unwrap().searcher();

    let exact = Query::phrase("title", &["quick", "brown"], 0);
    assert_eq!(searcher.search(&exact, 10).unwrap().len(), 1);

    // "quick fox" is one word apart in both fox docs.
    let gapped = Query::phrase("title", &["quick", "fox"], 0);
    assert_eq!(searcher.search(&gapped, 10).unwrap().len(), 0);
    let sloppy = Query::phrase("title", &["quick", "fox"], 1);
    assert_eq!(searcher.search(&sloppy, 10).unwrap().len(), 2);
}

#[test]
fn test_phrase_via_parser_with_slop() {
    let index = titles_index();
    let searcher = index.reader().unwrap().searcher();
    let query = index.parser(&["title"]).parse("\"quick fox\"~1").unwrap();
    assert_eq!(searcher.search(&query, 10).unwrap().len(), 2);
}

#[test]
fn test_fuzzy_matches_within_edit_budget() {
    let index = titles_index();
    let searcher = index.reader().unwrap().searcher();

    let one_edit = Query::fuzzy("title", "fix", 1, 0);
    assert_eq!(searcher.search(&one_edit, 10).unwrap().len(), 2);

    let zero_edit = Query::fuzzy("title", "fix", 0, 0);
    assert_eq!(searcher.search(&zero_edit, 10).unwrap().len(), 0);

    let over_budget = Query::fuzzy("title", "fox", 3, 0);
    assert_eq!(
        searcher.search(&over_budget, 10).unwrap_err().kind,
        ErrorKind::FuzzyEditsOutOfRange
    );
}

#[test]
fn test_fuzzy_prefix_lock() {
    let index = titles_index();
    let searcher = index.reader().unwrap().searcher();
    // "box" is one edit from "fox", but the first character must match.
    let query = Query::fuzzy("title", "box", 1, 1);
    assert_eq!(searcher.search(&query, 10).unwrap().len(), 0);
    let relaxed = Query::fuzzy("title", "box", 1, 0);
    assert_eq!(searcher.search(&relaxed, 10).unwrap().len(), 2);
}

#[test]
fn test_wildcard_patterns() {
    let index = titles_index();
    let searcher = index.reader().unwrap().searcher();

    assert_eq!(
        searcher
            .search(&Query::wildcard("title", "qu*"), 10)
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        searcher
            .search(&Query::wildcard("title", "b?ar"), 10)
            .unwrap()
            .len(),
        1
    );
    // Leading wildcard is allowed, just slow.
    assert_eq!(
        searcher
            .search(&Query::wildcard("title", "*ox"), 10)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_regex_query() {
    let index = titles_index();
    let searcher = index.reader().unwrap().searcher();
    // "brown" appears in two docs, "bear" in one of those two.
    let query = Query::regex("title", "b(ear|rown)");
    assert_eq!(searcher.search(&query, 10).unwrap().len(), 2);
}

#[test]
fn test_facet_prefix_search() {
    let mut builder = Schema::builder();
    builder
        .add_facet_field("category", FieldOptions::default())
        .unwrap();
    builder
        .add_u64_field("id", FieldOptions::fast_stored())
        .unwrap();
    let index = Index::create_in_ram(builder.build()).unwrap();
    let mut writer = index.writer().unwrap();
    for (id, path) in [
        (0, "/books/rust"),
        (1, "/books/history/rome"),
        (2, "/booklets/rust"),
        (3, "/music/jazz"),
    ] {
        let mut doc = Document::new();
        doc.add_u64("id", id).add_text("category", path);
        writer.add_document(&doc).unwrap();
    }
    writer.commit().unwrap();

    assert_eq!(
        hit_ids(&index, &Query::facet("category", "/books")),
        [0, 1].into_iter().collect()
    );
    assert_eq!(
        hit_ids(&index, &Query::facet("category", "/books/history")),
        [1].into_iter().collect()
    );
    assert_eq!(
        hit_ids(&index, &Query::facet("category", "/music/jazz")),
        [3].into_iter().collect()
    );
}

#[test]
fn test_count_without_retrieval() {
    let index = tags_index();
    let searcher = index.reader().unwrap().searcher();
    assert_eq!(searcher.count(&Query::term("tag", "a")).unwrap(), 4);
    assert_eq!(searcher.count(&Query::MatchAll).unwrap(), 8);
}

#[test]
fn test_unindexed_field_rejected_at_validation() {
    let mut builder = Schema::builder();
    builder
        .add_text_field("stored_only", FieldOptions::stored())
        .unwrap();
    let index = Index::create_in_ram(builder.build()).unwrap();
    let searcher = index.reader().unwrap().searcher();
    assert_eq!(
        searcher
            .search(&Query::term("stored_only", "x"), 10)
            .unwrap_err()
            .kind,
        ErrorKind::FieldNotIndexed
    );
}

#[test]
fn test_expired_deadline_aborts_with_timeout() {
    let index = titles_index();
    let searcher = index.reader().unwrap().searcher();
    let expired = Instant::now() - Duration::from_secs(1);
    let err = searcher
        .search_with_deadline(&Query::term("title", "quick"), 10, Some(expired))
        .unwrap_err();
    assert!(err.is_timeout());
}

#[test]
fn test_boost_reorders_results() {
    let index = titles_index();
    let searcher = index.reader().unwrap().searcher();
    let query = Query::boolean(vec![
        (Occur::Should, Query::term("title", "bear").boost(10.0)),
        (Occur::Should, Query::term("title", "quick")),
    ]);
    let hits = searcher.search(&query, 10).unwrap();
    assert_eq!(hits.len(), 3);
    // The bear doc is boosted to the top despite matching one term.
    let field = index.schema().field_by_name("title").unwrap();
    assert_eq!(
        hits[0].doc.first_value(field),
        Some(&Value::Text("the slow brown bear".to_string()))
    );
}
