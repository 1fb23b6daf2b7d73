use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::DocAddress;
use crate::query::Query;
use crate::reader::IndexReader;
use crate::schema::CompactDocument;

/// Shard liveness as reported by the shard itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardHealth {
    Healthy,
    Degraded,
    Down,
}

/// One hit as returned by a shard; serializable so remote shard
/// implementations can ship it over any transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardHit {
    pub score: f32,
    pub address: DocAddress,
    pub doc: CompactDocument,
}

/// The capability a coordinator needs from a shard: nothing more than
/// search and health. A local searcher and a remote RPC client satisfy
/// the same contract.
pub trait Shard: Send + Sync + 'static {
    fn search(&self, query: &Query, limit: usize) -> Result<Vec<ShardHit>>;

    fn health(&self) -> ShardHealth;
}

/// In-process shard wrapping a reader of a local index.
pub struct LocalShard {
    reader: IndexReader,
}

impl LocalShard {
    pub fn new(reader: IndexReader) -> LocalShard {
        LocalShard { reader }
    }
}

impl Shard for LocalShard {
    fn search(&self, query: &Query, limit: usize) -> Result<Vec<ShardHit>> {
        let searcher = self.reader.searcher();
        Ok(searcher
            .search(query, limit)?
            .into_iter()
            .map(|hit| ShardHit {
                score: hit.score,
                address: hit.address,
                doc: hit.doc,
            })
            .collect())
    }

    fn health(&self) -> ShardHealth {
        ShardHealth::Healthy
    }
}
