//! The capability shared by both recommendation strategies.

use crate::error::Result;
use crate::types::{GroupRatingSet, UnwatchedPool};
use data_loader::MovieId;

/// Ranks an unwatched pool for a group.
///
/// ## Contract
/// - Returned ids are a subset of `pool`, most relevant first, without duplicates
/// - An empty pool yields `Ok(vec![])`, never an error
/// - Implementations hold no per-request mutable state, so one value can
///   serve concurrent requests (`Send + Sync`)
pub trait GroupRecommender: Send + Sync {
    /// Returns the name of this strategy (for logging/debugging)
    fn name(&self) -> &str;

    fn recommend(&self, pool: &UnwatchedPool, ratings: &GroupRatingSet) -> Result<Vec<MovieId>>;
}
