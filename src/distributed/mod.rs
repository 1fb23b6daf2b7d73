pub mod coordinator;
pub mod health;
pub mod shard;

pub use coordinator::{
    Coordinator, CoordinatorConfig, DistributedHit, DistributedResults, MergeStrategy,
    RoutingStrategy, ShardOutcome, ShardStatus,
};
pub use health::HealthMonitor;
pub use shard::{LocalShard, Shard, ShardHealth, ShardHit};
