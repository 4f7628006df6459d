//! # Recommendation Orchestrator
//!
//! This module coordinates one group recommendation request:
//! 1. Preprocess collector rows into numeric ratings with synthetic user ids
//! 2. Resolve the pool of movies nobody in the group has rated
//! 3. Dispatch on group size (embedding strategy up to 3 members, latent factors above)
//! 4. Map the ranked ids back to full movie records, keeping rank order
//!
//! An empty pool short-circuits to an empty result. Nothing is retried; every
//! latent-factor request trains a new model, so callers that need rate
//! limiting or caching must provide it themselves.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use data_loader::{Dataset, HistoricalRatings, Movie, MovieCatalog, MovieId};
use pipeline::{
    GroupRating, GroupRatingSet, GroupRecommender, RatingPreprocessor, RecommendError,
    UnwatchedPool, UnwatchedResolver,
};
use strategies::{Strategy, StrategyKind};

use crate::config::RecommenderConfig;
use crate::error::RecommendationFailed;

/// Main orchestrator; cheap to clone and safe to share across threads.
///
/// Holds only read-only data. Per-request state (the session, the strategy
/// and any trained model) lives on the stack of the call that created it.
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    catalog: Arc<MovieCatalog>,
    history: Arc<HistoricalRatings>,
    config: RecommenderConfig,
}

impl RecommendationOrchestrator {
    pub fn new(
        catalog: Arc<MovieCatalog>,
        history: Arc<HistoricalRatings>,
        config: RecommenderConfig,
    ) -> Self {
        Self {
            catalog,
            history,
            config,
        }
    }

    pub fn from_dataset(dataset: Dataset, config: RecommenderConfig) -> Self {
        Self::new(Arc::new(dataset.catalog), Arc::new(dataset.history), config)
    }

    /// Build the strategy a group of this size runs on.
    pub fn strategy_for(&self, group_size: usize) -> Strategy {
        let kind = StrategyKind::for_group_size(group_size, self.config.embedding_max_group_size);
        Strategy::for_kind(
            kind,
            self.catalog.clone(),
            self.history.clone(),
            self.config.latent.clone(),
            self.config.top_k,
        )
    }

    /// Main entry point: ranked movies for one group session.
    ///
    /// # Returns
    /// Up to `top_k` movies, most relevant first. `Ok(vec![])` means the
    /// group has already rated everything; any `Err` is a real failure.
    #[instrument(skip_all, fields(rows = group_ratings.len()))]
    pub fn make_recommendation(
        &self,
        group_ratings: &[GroupRating],
    ) -> Result<Vec<Movie>, RecommendationFailed> {
        let start_time = Instant::now();

        let session = self.preprocess(group_ratings)?;
        info!(
            "Preprocessed {} ratings from {} users",
            session.ratings().len(),
            session.group_size()
        );

        let pool = self.resolve_unwatched(&session);
        if pool.is_empty() {
            info!("Group has rated every catalog movie, nothing to recommend");
            return Ok(Vec::new());
        }

        let strategy = self.strategy_for(session.group_size());
        info!(
            "Ranking {} candidates with the {} strategy",
            pool.len(),
            strategy.kind()
        );
        let ranked = strategy.recommend(&pool, &session)?;

        let movies = self.to_movies(&ranked);
        info!(
            "Selected {} recommendations in {:.2?}",
            movies.len(),
            start_time.elapsed()
        );
        Ok(movies)
    }

    /// Run [`make_recommendation`](Self::make_recommendation) on a blocking
    /// worker, optionally bounded by a deadline.
    ///
    /// On timeout the worker is detached: it runs to completion and whatever
    /// it produced (including a half-trained model) is dropped unread.
    pub async fn recommend_with_timeout(
        &self,
        group_ratings: Vec<GroupRating>,
        timeout: Option<Duration>,
    ) -> Result<Vec<Movie>, RecommendationFailed> {
        let orchestrator = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            orchestrator.make_recommendation(&group_ratings)
        });

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Recommendation did not finish within {:?}", limit);
                    return Err(RecommendationFailed::timeout(limit));
                }
            },
            None => task.await,
        };

        joined.map_err(|e| RecommendationFailed::worker_panicked(e.to_string()))?
    }

    fn preprocess(&self, group_ratings: &[GroupRating]) -> Result<GroupRatingSet, RecommendationFailed> {
        let first_user_id = self.history.next_user_id().ok_or_else(|| {
            RecommendError::SchemaMismatch("no user ids left above the historical corpus".to_string())
        })?;
        let preprocessor = RatingPreprocessor::new(self.catalog.clone(), first_user_id);
        Ok(preprocessor.preprocess(group_ratings)?)
    }

    fn resolve_unwatched(&self, session: &GroupRatingSet) -> UnwatchedPool {
        let pool = UnwatchedResolver::new(self.catalog.clone()).resolve(session);
        debug!("Unwatched pool: {} of {} movies", pool.len(), self.catalog.len());
        pool
    }

    /// Join ranked ids with the catalog, keeping rank order
    fn to_movies(&self, ranked: &[MovieId]) -> Vec<Movie> {
        ranked
            .iter()
            .filter_map(|id| self.catalog.get_movie(*id).cloned())
            .collect()
    }
}
