use crossbeam::channel;
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocAddress;
use crate::distributed::shard::{Shard, ShardHealth, ShardHit};
use crate::query::Query;
use crate::schema::CompactDocument;

/// How a query selects shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingStrategy {
    /// Every active shard; required for a correct global top-K.
    Broadcast,
    /// One shard per query, rotating. Partial results by design.
    RoundRobin,
    /// One shard per query, picked by deterministic weighted rotation.
    Weighted,
    /// Every active shard currently reporting `Healthy`.
    HealthFiltered,
}

/// Global result ordering at the merge step.
#[derive(Clone)]
pub enum MergeStrategy {
    ScoreDesc,
    ScoreAsc,
    Custom(Arc<dyn Fn(&DistributedHit, &DistributedHit) -> Ordering + Send + Sync>),
}

impl std::fmt::Debug for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeStrategy::ScoreDesc => write!(f, "ScoreDesc"),
            MergeStrategy::ScoreAsc => write!(f, "ScoreAsc"),
            MergeStrategy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub routing: RoutingStrategy,
    pub per_shard_timeout: Duration,
    pub global_deadline: Duration,
    pub merge: MergeStrategy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            routing: RoutingStrategy::Broadcast,
            per_shard_timeout: Duration::from_secs(5),
            global_deadline: Duration::from_secs(10),
            merge: MergeStrategy::ScoreDesc,
        }
    }
}

/// A hit with its originating shard attached.
#[derive(Debug, Clone)]
pub struct DistributedHit {
    pub shard: String,
    pub score: f32,
    pub address: DocAddress,
    pub doc: CompactDocument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardOutcome {
    Success,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ShardStatus {
    pub shard: String,
    pub outcome: ShardOutcome,
    pub latency: Option<Duration>,
}

/// Per-query result: global top-K plus what happened on every selected
/// shard. Partial shard failure is success with a populated status
/// list, never a hard error.
#[derive(Debug, Clone)]
pub struct DistributedResults {
    pub hits: Vec<DistributedHit>,
    pub shard_status: Vec<ShardStatus>,
}

pub(crate) struct ShardState {
    pub consecutive_failures: AtomicU32,
    pub down: AtomicBool,
}

struct ShardEntry {
    shard: Arc<dyn Shard>,
    weight: f32,
    active: bool,
    state: Arc<ShardState>,
    credit: Mutex<f64>,
}

/// Fans a query out to registered shards and merges the per-shard
/// top-K into a global top-K. Exposes the same query surface as a
/// local searcher; shards are independent and never retried here.
pub struct Coordinator {
    shards: RwLock<BTreeMap<String, ShardEntry>>,
    config: CoordinatorConfig,
    rr_counter: AtomicUsize,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Coordinator {
        Coordinator {
            shards: RwLock::new(BTreeMap::new()),
            config,
            rr_counter: AtomicUsize::new(0),
        }
    }

    pub fn register_shard(&self, name: &str, shard: Arc<dyn Shard>, weight: f32) {
        self.shards.write().insert(
            name.to_string(),
            ShardEntry {
                shard,
                weight: weight.max(0.0),
                active: true,
                state: Arc::new(ShardState {
                    consecutive_failures: AtomicU32::new(0),
                    down: AtomicBool::new(false),
                }),
                credit: Mutex::new(0.0),
            },
        );
    }

    pub fn remove_shard(&self, name: &str) -> bool {
        self.shards.write().remove(name).is_some()
    }

    pub fn set_active(&self, name: &str, active: bool) -> bool {
        match self.shards.write().get_mut(name) {
            Some(entry) => {
                entry.active = active;
                true
            }
            None => false,
        }
    }

    pub fn shard_names(&self) -> Vec<String> {
        self.shards.read().keys().cloned().collect()
    }

    /// Whether the health monitor currently routes around this shard.
    pub fn is_shard_down(&self, name: &str) -> Option<bool> {
        self.shards
            .read()
            .get(name)
            .map(|entry| entry.state.down.load(AtomicOrdering::Acquire))
    }

    pub(crate) fn shard_states(&self) -> Vec<(String, Arc<dyn Shard>, Arc<ShardState>)> {
        self.shards
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.shard.clone(), entry.state.clone()))
            .collect()
    }

    fn select(&self) -> Vec<(String, Arc<dyn Shard>)> {
        let shards = self.shards.read();
        let candidates: Vec<(&String, &ShardEntry)> = shards
            .iter()
            .filter(|(_, entry)| entry.active && !entry.state.down.load(AtomicOrdering::Acquire))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }
        match self.config.routing {
            RoutingStrategy::Broadcast => candidates
                .into_iter()
                .map(|(name, entry)| (name.clone(), entry.shard.clone()))
                .collect(),
            RoutingStrategy::HealthFiltered => candidates
                .into_iter()
                .filter(|(_, entry)| entry.shard.health() == ShardHealth::Healthy)
                .map(|(name, entry)| (name.clone(), entry.shard.clone()))
                .collect(),
            RoutingStrategy::RoundRobin => {
                let turn = self.rr_counter.fetch_add(1, AtomicOrdering::Relaxed);
                let (name, entry) = candidates[turn % candidates.len()];
                vec![(name.clone(), entry.shard.clone())]
            }
            RoutingStrategy::Weighted => {
                // Deterministic weighted round-robin over accumulated
                // credits.
                let total: f64 = candidates.iter().map(|(_, e)| e.weight as f64).sum();
                let mut best: Option<(&String, &ShardEntry, f64)> = None;
                for (name, entry) in candidates.iter().copied() {
                    let mut credit = entry.credit.lock();
                    *credit += entry.weight as f64;
                    let value = *credit;
                    if best.as_ref().map(|(_, _, b)| value > *b).unwrap_or(true) {
                        best = Some((name, entry, value));
                    }
                }
                match best {
                    Some((name, entry, _)) => {
                        *entry.credit.lock() -= total;
                        vec![(name.clone(), entry.shard.clone())]
                    }
                    None => Vec::new(),
                }
            }
        }
    }

    /// Distributed top-`limit` search. Returns `AllShardsFailed` only
    /// when every selected shard failed (or none could be selected).
    pub fn search(&self, query: &Query, limit: usize) -> Result<DistributedResults> {
        let selected = self.select();
        if selected.is_empty() {
            return Err(Error::new(
                ErrorKind::AllShardsFailed,
                "no active shard available for routing",
            ));
        }

        let started = Instant::now();
        let global_deadline = started + self.config.global_deadline;
        let (sender, receiver) = channel::unbounded::<(String, Duration, Result<Vec<ShardHit>>)>();

        let mut dispatched: Vec<String> = Vec::new();
        let mut statuses: BTreeMap<String, ShardStatus> = BTreeMap::new();
        for (name, shard) in selected {
            if shard.health() == ShardHealth::Down {
                log::warn!("shard '{}' reports down, skipping dispatch", name);
                statuses.insert(
                    name.clone(),
                    ShardStatus {
                        shard: name,
                        outcome: ShardOutcome::Failed("shard is down".to_string()),
                        latency: None,
                    },
                );
                continue;
            }
            dispatched.push(name.clone());
            let sender = sender.clone();
            let query = query.clone();
            let shard_name = name.clone();
            std::thread::spawn(move || {
                let shard_start = Instant::now();
                let outcome = shard.search(&query, limit);
                // A receiver that gave up on us closes the channel; the
                // send result is deliberately ignored.
                let _ = sender.send((shard_name, shard_start.elapsed(), outcome));
            });
        }
        drop(sender);

        let mut collected: Vec<DistributedHit> = Vec::new();
        let mut received = 0usize;
        while received < dispatched.len() {
            match receiver.recv_deadline(global_deadline) {
                Ok((name, latency, outcome)) => {
                    received += 1;
                    let status = if latency > self.config.per_shard_timeout {
                        log::warn!("shard '{}' exceeded its timeout ({:?})", name, latency);
                        ShardStatus {
                            shard: name.clone(),
                            outcome: ShardOutcome::TimedOut,
                            latency: Some(latency),
                        }
                    } else {
                        match outcome {
                            Ok(hits) => {
                                for hit in hits {
                                    collected.push(DistributedHit {
                                        shard: name.clone(),
                                        score: hit.score,
                                        address: hit.address,
                                        doc: hit.doc,
                                    });
                                }
                                ShardStatus {
                                    shard: name.clone(),
                                    outcome: ShardOutcome::Success,
                                    latency: Some(latency),
                                }
                            }
                            Err(e) => {
                                log::warn!("shard '{}' failed: {}", name, e);
                                ShardStatus {
                                    shard: name.clone(),
                                    outcome: ShardOutcome::Failed(e.to_string()),
                                    latency: Some(latency),
                                }
                            }
                        }
                    };
                    statuses.insert(status.shard.clone(), status);
                }
                Err(_) => break, // global deadline
            }
        }

        self.merge_and_finish(collected, statuses, limit, &dispatched)
    }

    fn merge_and_finish(
        &self,
        mut collected: Vec<DistributedHit>,
        mut statuses: BTreeMap<String, ShardStatus>,
        limit: usize,
        dispatched: &[String],
    ) -> Result<DistributedResults> {
        // Shards that never answered before the global deadline.
        for name in dispatched {
            if !statuses.contains_key(name) {
                statuses.insert(
                    name.clone(),
                    ShardStatus {
                        shard: name.clone(),
                        outcome: ShardOutcome::TimedOut,
                        latency: None,
                    },
                );
            }
        }

        let shard_status: Vec<ShardStatus> = statuses.into_values().collect();
        if !shard_status.is_empty()
            && shard_status
                .iter()
                .all(|s| s.outcome != ShardOutcome::Success)
        {
            return Err(Error::new(
                ErrorKind::AllShardsFailed,
                "every selected shard failed or timed out",
            ));
        }

        let comparator: Box<dyn Fn(&DistributedHit, &DistributedHit) -> Ordering> =
            match &self.config.merge {
                MergeStrategy::ScoreDesc => Box::new(|a, b| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.shard.cmp(&b.shard))
                        .then_with(|| a.address.cmp(&b.address))
                }),
                MergeStrategy::ScoreAsc => Box::new(|a, b| {
                    a.score
                        .partial_cmp(&b.score)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.shard.cmp(&b.shard))
                        .then_with(|| a.address.cmp(&b.address))
                }),
                MergeStrategy::Custom(custom) => {
                    let custom = custom.clone();
                    Box::new(move |a, b| custom(a, b))
                }
            };

        // K-way merge over the already-sorted shard result lists,
        // realized as a single bounded sort over at most N*K entries.
        collected.sort_by(|a, b| comparator(a, b));
        collected.truncate(limit);

        Ok(DistributedResults {
            hits: collected,
            shard_status,
        })
    }
}
