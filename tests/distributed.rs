//! Distributed coordinator: broadcast completeness, partial failure,
//! timeouts, and routing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use lantern::core::ErrorKind;
use lantern::distributed::{
    Coordinator, CoordinatorConfig, HealthMonitor, LocalShard, RoutingStrategy, Shard,
    ShardHealth, ShardHit, ShardOutcome,
};
use lantern::query::Query;
use lantern::schema::{FieldOptions, Schema, Value};
use lantern::{Document, Index};

fn doc_schema() -> Schema {
    let mut builder = Schema::builder();
    builder
        .add_text_field("body", FieldOptions::indexed().with_tokenizer("simple"))
        .unwrap();
    builder
        .add_u64_field("id", FieldOptions::fast_stored())
        .unwrap();
    builder.build()
}

fn index_with(rows: &[(u64, &str)]) -> Index {
    let index = Index::create_in_ram(doc_schema()).unwrap();
    let mut writer = index.writer().unwrap();
    for (id, body) in rows {
        let mut doc = Document::new();
        doc.add_u64("id", *id).add_text("body", body);
        writer.add_document(&doc).unwrap();
    }
    writer.commit().unwrap();
    index
}

/// Three shards with disjoint vocabularies, five docs each, plus the
/// union of all fifteen in a single index.
fn sharded_corpus() -> (Vec<Index>, Index) {
    let mut all: Vec<(u64, String)> = Vec::new();
    let mut shards = Vec::new();
    for (shard_ord, prefix) in ["alpha", "beta", "gamma"].iter().enumerate() {
        let rows: Vec<(u64, String)> = (0..5)
            .map(|i| {
                let id = (shard_ord as u64) * 100 + i;
                (id, format!("{} term{} common{}", prefix, i, i))
            })
            .collect();
        all.extend(rows.clone());
        let borrowed: Vec<(u64, &str)> =
            rows.iter().map(|(id, body)| (*id, body.as_str())).collect();
        shards.push(index_with(&borrowed));
    }
    let borrowed: Vec<(u64, &str)> = all.iter().map(|(id, body)| (*id, body.as_str())).collect();
    (shards, index_with(&borrowed))
}

fn ids_of_union_hits(index: &Index, query: &Query, limit: usize) -> HashSet<u64> {
    let field = index.schema().field_by_name("id").unwrap();
    index
        .reader()
        .unwrap()
        .searcher()
        .search(query, limit)
        .unwrap()
        .into_iter()
        .map(|hit| match hit.doc.first_value(field) {
            Some(Value::U64(id)) => *id,
            other => panic!("expected id, got {:?}", other),
        })
        .collect()
}

fn coordinator_over(shards: &[Index]) -> Coordinator {
    let coordinator = Coordinator::new(CoordinatorConfig::default());
    for (ord, index) in shards.iter().enumerate() {
        coordinator.register_shard(
            &format!("shard-{}", ord),
            Arc::new(LocalShard::new(index.reader().unwrap())),
            1.0,
        );
    }
    coordinator
}

#[test]
fn test_broadcast_equals_single_union_index() {
    let (shards, union) = sharded_corpus();
    let coordinator = coordinator_over(&shards);
    let id_field = union.schema().field_by_name("id").unwrap();

    for input in ["body:alpha", "body:term3", "body:beta OR body:gamma"] {
        let query = union.parser(&["body"]).parse(input).unwrap();
        let distributed: HashSet<u64> = coordinator
            .search(&query, 10)
            .unwrap()
            .hits
            .into_iter()
            .map(|hit| match hit.doc.first_value(id_field) {
                Some(Value::U64(id)) => *id,
                other => panic!("expected id, got {:?}", other),
            })
            .collect();
        let local = ids_of_union_hits(&union, &query, 10);
        assert_eq!(distributed, local, "query '{}'", input);
    }
}

#[test]
fn test_results_carry_shard_attribution_and_status() {
    let (shards, union) = sharded_corpus();
    let coordinator = coordinator_over(&shards);
    let query = union.parser(&["body"]).parse("body:beta").unwrap();
    let results = coordinator.search(&query, 10).unwrap();

    assert_eq!(results.hits.len(), 5);
    assert!(results.hits.iter().all(|hit| hit.shard == "shard-1"));

    assert_eq!(results.shard_status.len(), 3);
    for status in &results.shard_status {
        assert_eq!(status.outcome, ShardOutcome::Success, "{:?}", status);
        assert!(status.latency.is_some());
    }
}

struct FailingShard;

impl Shard for FailingShard {
    fn search(&self, _query: &Query, _limit: usize) -> lantern::Result<Vec<ShardHit>> {
        Err(lantern::Error::new(
            ErrorKind::StorageIo,
            "disk on fire",
        ))
    }

    fn health(&self) -> ShardHealth {
        ShardHealth::Degraded
    }
}

struct SlowShard {
    delay: Duration,
}

impl Shard for SlowShard {
    fn search(&self, _query: &Query, _limit: usize) -> lantern::Result<Vec<ShardHit>> {
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }

    fn health(&self) -> ShardHealth {
        ShardHealth::Healthy
    }
}

#[test]
fn test_partial_failure_is_success_with_status() {
    let (shards, union) = sharded_corpus();
    let coordinator = coordinator_over(&shards[..1]);
    coordinator.register_shard("bad", Arc::new(FailingShard), 1.0);

    let query = union.parser(&["body"]).parse("body:alpha").unwrap();
    let results = coordinator.search(&query, 10).unwrap();
    assert_eq!(results.hits.len(), 5);

    let bad = results
        .shard_status
        .iter()
        .find(|s| s.shard == "bad")
        .unwrap();
    assert!(matches!(bad.outcome, ShardOutcome::Failed(_)));
    let good = results
        .shard_status
        .iter()
        .find(|s| s.shard == "shard-0")
        .unwrap();
    assert_eq!(good.outcome, ShardOutcome::Success);
}

#[test]
fn test_all_shards_failed() {
    let coordinator = Coordinator::new(CoordinatorConfig::default());
    coordinator.register_shard("bad-1", Arc::new(FailingShard), 1.0);
    coordinator.register_shard("bad-2", Arc::new(FailingShard), 1.0);
    let err = coordinator.search(&Query::MatchAll, 10).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AllShardsFailed);
}

#[test]
fn test_no_registered_shards_fails() {
    let coordinator = Coordinator::new(CoordinatorConfig::default());
    let err = coordinator.search(&Query::MatchAll, 10).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AllShardsFailed);
}

#[test]
fn test_slow_shard_times_out_without_losing_fast_results() {
    let (shards, union) = sharded_corpus();
    let coordinator = Coordinator::new(CoordinatorConfig {
        per_shard_timeout: Duration::from_millis(20),
        global_deadline: Duration::from_millis(500),
        ..CoordinatorConfig::default()
    });
    coordinator.register_shard(
        "fast",
        Arc::new(LocalShard::new(shards[0].reader().unwrap())),
        1.0,
    );
    coordinator.register_shard(
        "slow",
        Arc::new(SlowShard {
            delay: Duration::from_millis(100),
        }),
        1.0,
    );

    let query = union.parser(&["body"]).parse("body:alpha").unwrap();
    let results = coordinator.search(&query, 10).unwrap();
    assert_eq!(results.hits.len(), 5);
    let slow = results
        .shard_status
        .iter()
        .find(|s| s.shard == "slow")
        .unwrap();
    assert_eq!(slow.outcome, ShardOutcome::TimedOut);
}

#[test]
fn test_round_robin_rotates_over_shards() {
    let (shards, union) = sharded_corpus();
    let coordinator = Coordinator::new(CoordinatorConfig {
        routing: RoutingStrategy::RoundRobin,
        ..CoordinatorConfig::default()
    });
    for (ord, index) in shards.iter().enumerate() {
        coordinator.register_shard(
            &format!("shard-{}", ord),
            Arc::new(LocalShard::new(index.reader().unwrap())),
            1.0,
        );
    }

    let query = union.parser(&["body"]).parse("common2").unwrap();
    let mut answering: HashSet<String> = HashSet::new();
    for _ in 0..3 {
        let results = coordinator.search(&query, 10).unwrap();
        assert_eq!(results.shard_status.len(), 1);
        assert_eq!(results.hits.len(), 1);
        answering.insert(results.hits[0].shard.clone());
    }
    // Every shard got exactly one turn.
    assert_eq!(answering.len(), 3);
}

#[test]
fn test_inactive_shard_is_not_routed() {
    let (shards, union) = sharded_corpus();
    let coordinator = coordinator_over(&shards);
    coordinator.set_active("shard-1", false);

    let query = union.parser(&["body"]).parse("body:beta").unwrap();
    let results = coordinator.search(&query, 10).unwrap();
    assert!(results.hits.is_empty());
    assert_eq!(results.shard_status.len(), 2);
}

#[test]
fn test_health_monitor_marks_down_and_restores() {
    struct TogglingShard {
        down: std::sync::atomic::AtomicBool,
    }
    impl Shard for TogglingShard {
        fn search(&self, _q: &Query, _l: usize) -> lantern::Result<Vec<ShardHit>> {
            Ok(Vec::new())
        }
        fn health(&self) -> ShardHealth {
            if self.down.load(std::sync::atomic::Ordering::Relaxed) {
                ShardHealth::Down
            } else {
                ShardHealth::Healthy
            }
        }
    }

    let coordinator = Arc::new(Coordinator::new(CoordinatorConfig::default()));
    let shard = Arc::new(TogglingShard {
        down: std::sync::atomic::AtomicBool::new(true),
    });
    coordinator.register_shard("s", shard.clone(), 1.0);

    let _monitor = HealthMonitor::start(coordinator.clone(), Duration::from_millis(5));
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while coordinator.is_shard_down("s") != Some(true) {
        assert!(std::time::Instant::now() < deadline, "shard never went down");
        std::thread::sleep(Duration::from_millis(5));
    }

    shard.down.store(false, std::sync::atomic::Ordering::Relaxed);
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while coordinator.is_shard_down("s") != Some(false) {
        assert!(std::time::Instant::now() < deadline, "shard never recovered");
        std::thread::sleep(Duration::from_millis(5));
    }
}
