//! # Strategies Crate
//!
//! The two ranking strategies of the group recommender and the tagged union
//! that selects between them.
//!
//! ## Components
//!
//! ### Embedding Strategy (groups of up to 3)
//! Nearest neighbours in content-embedding space:
//! - Each member's taste is the rating-weighted mean of their rated movies' embeddings
//! - The group vector is the mean of the member vectors
//! - Candidates are ranked by Euclidean distance, closest first
//!
//! ### Latent-Factor Strategy (groups of 4 or more)
//! Biased matrix factorization trained per request:
//! - History + session ratings are fit from scratch with a pinned seed
//! - Candidates are scored for the mean session user, highest first
//!
//! ## Example Usage
//!
//! ```ignore
//! use strategies::{Strategy, StrategyKind};
//! use pipeline::GroupRecommender;
//!
//! let strategy = Strategy::for_kind(
//!     StrategyKind::for_group_size(session.group_size(), 3),
//!     catalog.clone(),
//!     history.clone(),
//!     LatentFactorConfig::default(),
//!     10,
//! );
//! let ranked = strategy.recommend(&pool, &session)?;
//! ```

pub mod embedding;
pub mod latent_factor;

pub use embedding::{euclidean_distance, EmbeddingRecommender};
pub use latent_factor::{fit, rank_with_model, FactorModel, LatentFactorConfig, LatentFactorRecommender};

use data_loader::{HistoricalRatings, MovieCatalog, MovieId};
use pipeline::{GroupRatingSet, GroupRecommender, Result, UnwatchedPool};
use std::fmt;
use std::sync::Arc;

/// Largest group served by the embedding strategy
pub const EMBEDDING_MAX_GROUP_SIZE: usize = 3;

/// Number of recommendations returned by default
pub const DEFAULT_TOP_K: usize = 10;

/// Which strategy a request runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Embedding,
    LatentFactor,
}

impl StrategyKind {
    /// Groups of at most `embedding_max_group_size` members use embeddings,
    /// anything larger uses latent factors.
    pub fn for_group_size(group_size: usize, embedding_max_group_size: usize) -> Self {
        if group_size <= embedding_max_group_size {
            StrategyKind::Embedding
        } else {
            StrategyKind::LatentFactor
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Embedding => write!(f, "embedding"),
            StrategyKind::LatentFactor => write!(f, "latent-factor"),
        }
    }
}

/// One of the two concrete strategies, chosen once and then used through
/// [`GroupRecommender`].
#[derive(Clone)]
pub enum Strategy {
    Embedding(EmbeddingRecommender),
    LatentFactor(LatentFactorRecommender),
}

impl Strategy {
    pub fn for_kind(
        kind: StrategyKind,
        catalog: Arc<MovieCatalog>,
        history: Arc<HistoricalRatings>,
        config: LatentFactorConfig,
        limit: usize,
    ) -> Self {
        match kind {
            StrategyKind::Embedding => {
                Strategy::Embedding(EmbeddingRecommender::new(catalog).with_limit(limit))
            }
            StrategyKind::LatentFactor => Strategy::LatentFactor(
                LatentFactorRecommender::new(history)
                    .with_config(config)
                    .with_limit(limit),
            ),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Embedding(_) => StrategyKind::Embedding,
            Strategy::LatentFactor(_) => StrategyKind::LatentFactor,
        }
    }
}

impl GroupRecommender for Strategy {
    fn name(&self) -> &str {
        match self {
            Strategy::Embedding(inner) => inner.name(),
            Strategy::LatentFactor(inner) => inner.name(),
        }
    }

    fn recommend(&self, pool: &UnwatchedPool, ratings: &GroupRatingSet) -> Result<Vec<MovieId>> {
        match self {
            Strategy::Embedding(inner) => inner.recommend(pool, ratings),
            Strategy::LatentFactor(inner) => inner.recommend(pool, ratings),
        }
    }
}
