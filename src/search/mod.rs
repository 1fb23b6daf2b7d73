pub mod executor;
pub mod fuzzy;
pub mod results;

pub use executor::{eval_segment, matching_docs, ExecutionContext, Scored};
pub use results::{ScoredAddress, SearchHit, TopKCollector};
