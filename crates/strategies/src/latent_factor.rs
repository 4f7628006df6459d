//! Latent-Factor Strategy - matrix factorization for larger groups
//!
//! Every request trains a fresh biased matrix-factorization model on the
//! historical corpus plus the session's ratings, then scores each candidate
//! for a virtual "average member" whose latent vector is the mean of the
//! session users' learned vectors:
//!
//! ```text
//! score(m) = item_bias[m] + item_factors[m] · mean(user_factors[session users])
//! ```
//!
//! ## Training
//! Stochastic gradient descent over the corpus in order (history first, then
//! the session), one update per rating per epoch:
//!
//! ```text
//! err  = r - (mu + b_u + b_i + p_u · q_i)
//! b_u += lr * (err - reg * b_u)
//! b_i += lr * (err - reg * b_i)
//! p_u += lr * (err * q_i - reg * p_u)
//! q_i += lr * (err * p_u - reg * q_i)
//! ```
//!
//! Initial factors come from a `StdRng` seeded by the config, so a pinned
//! seed gives bit-identical models. [`fit`] is a pure function: the returned
//! [`FactorModel`] is immutable and owned by the request that built it.

use crate::DEFAULT_TOP_K;
use data_loader::{HistoricalRatings, MovieId, UserId};
use ndarray::{Array1, Array2, ArrayView1};
use pipeline::{GroupRatingSet, GroupRecommender, RecommendError, Result, UnwatchedPool};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// =============================================================================
// Configuration
// =============================================================================

/// Hyperparameters of the factorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatentFactorConfig {
    /// Latent dimensionality
    pub n_factors: usize,
    /// Full passes over the corpus
    pub n_epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    /// Initial factors are drawn uniformly from `[-init_scale, init_scale)`
    pub init_scale: f64,
    /// Seed of the initialization RNG
    pub seed: u64,
}

impl Default for LatentFactorConfig {
    fn default() -> Self {
        Self {
            n_factors: 17,
            n_epochs: 30,
            learning_rate: 0.005,
            regularization: 0.02,
            init_scale: 0.1,
            seed: 42,
        }
    }
}

impl LatentFactorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_factors(mut self, n_factors: usize) -> Self {
        self.n_factors = n_factors;
        self
    }

    pub fn with_n_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    fn validate(&self) -> Result<()> {
        let checks = [
            (self.learning_rate.is_finite() && self.learning_rate > 0.0, "learning_rate must be positive"),
            (self.regularization.is_finite() && self.regularization >= 0.0, "regularization must be non-negative"),
            (self.init_scale.is_finite() && self.init_scale >= 0.0, "init_scale must be non-negative"),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, reason)) => Err(RecommendError::ModelTrainingFailure(reason.to_string())),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Model
// =============================================================================

/// A trained factorization, read once and discarded.
#[derive(Debug, Clone)]
pub struct FactorModel {
    global_mean: f64,
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<MovieId, usize>,
    user_bias: Array1<f64>,
    item_bias: Array1<f64>,
    user_factors: Array2<f64>,
    item_factors: Array2<f64>,
}

impl FactorModel {
    pub fn n_factors(&self) -> usize {
        self.item_factors.ncols()
    }

    #[cfg(test)]
    fn item_bias(&self, movie_id: MovieId) -> Option<f64> {
        self.item_index.get(&movie_id).map(|&i| self.item_bias[i])
    }

    pub fn user_factors(&self, user_id: UserId) -> Option<ArrayView1<'_, f64>> {
        self.user_index.get(&user_id).map(|&u| self.user_factors.row(u))
    }

    /// Predicted rating of one known user for one movie; unknown ids
    /// contribute nothing beyond the global mean.
    #[cfg(test)]
    fn predict(&self, user_id: UserId, movie_id: MovieId) -> f64 {
        let user = self.user_index.get(&user_id);
        let item = self.item_index.get(&movie_id);
        let mut prediction = self.global_mean;
        if let Some(&u) = user {
            prediction += self.user_bias[u];
        }
        if let Some(&i) = item {
            prediction += self.item_bias[i];
        }
        if let (Some(&u), Some(&i)) = (user, item) {
            prediction += self.user_factors.row(u).dot(&self.item_factors.row(i));
        }
        prediction
    }

    /// Mean latent vector of the given users.
    pub fn mean_user_factors(&self, user_ids: impl IntoIterator<Item = UserId>) -> Result<Array1<f64>> {
        let mut acc = Array1::<f64>::zeros(self.n_factors());
        let mut count = 0usize;
        for user_id in user_ids {
            let row = self.user_factors(user_id).ok_or_else(|| {
                RecommendError::ModelTrainingFailure(format!("user {} missing from trained model", user_id))
            })?;
            acc += &row;
            count += 1;
        }
        if count == 0 {
            return Err(RecommendError::ModelTrainingFailure(
                "no session users to average".to_string(),
            ));
        }
        acc /= count as f64;
        Ok(acc)
    }

    /// Group score of one movie. A movie nobody has rated has neither bias
    /// nor factors and scores 0, i.e. exactly the global mean.
    pub fn score(&self, movie_id: MovieId, consensus: &Array1<f64>) -> f64 {
        match self.item_index.get(&movie_id) {
            Some(&i) => self.item_bias[i] + self.item_factors.row(i).dot(consensus),
            None => 0.0,
        }
    }

    fn all_finite(&self) -> bool {
        self.global_mean.is_finite()
            && self.user_bias.iter().all(|x| x.is_finite())
            && self.item_bias.iter().all(|x| x.is_finite())
            && self.user_factors.iter().all(|x| x.is_finite())
            && self.item_factors.iter().all(|x| x.is_finite())
    }
}

// =============================================================================
// Training
// =============================================================================

/// Train a model from scratch on `history` followed by `session`.
///
/// Fails with `SchemaMismatch` if a session user id also appears in the
/// history, and with `ModelTrainingFailure` on an invalid config, a
/// non-finite epoch loss or non-finite final parameters.
#[instrument(skip_all, fields(history = history.len(), session = session.ratings().len()))]
pub fn fit(
    history: &HistoricalRatings,
    session: &GroupRatingSet,
    config: &LatentFactorConfig,
) -> Result<FactorModel> {
    config.validate()?;

    let historical_users = history.user_ids();
    if let Some(user_id) = session.user_ids().find(|id| historical_users.contains(id)) {
        return Err(RecommendError::SchemaMismatch(format!(
            "session user id {} collides with a historical user",
            user_id
        )));
    }

    // Dense indices in order of first appearance
    let mut user_index: HashMap<UserId, usize> = HashMap::new();
    let mut item_index: HashMap<MovieId, usize> = HashMap::new();
    let mut triples: Vec<(usize, usize, f64)> = Vec::with_capacity(history.len() + session.ratings().len());
    for rating in history.ratings().iter().chain(session.ratings()) {
        let next_user = user_index.len();
        let u = *user_index.entry(rating.user_id).or_insert(next_user);
        let next_item = item_index.len();
        let i = *item_index.entry(rating.movie_id).or_insert(next_item);
        triples.push((u, i, rating.rating as f64));
    }

    if triples.is_empty() {
        return Err(RecommendError::ModelTrainingFailure(
            "empty training corpus".to_string(),
        ));
    }

    let k = config.n_factors;
    let global_mean = triples.iter().map(|t| t.2).sum::<f64>() / triples.len() as f64;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let scale = config.init_scale;
    let mut init = |shape: (usize, usize)| {
        if scale > 0.0 {
            Array2::from_shape_fn(shape, |_| rng.random_range(-scale..scale))
        } else {
            Array2::zeros(shape)
        }
    };
    let mut user_factors = init((user_index.len(), k));
    let mut item_factors = init((item_index.len(), k));
    let mut user_bias = Array1::<f64>::zeros(user_index.len());
    let mut item_bias = Array1::<f64>::zeros(item_index.len());

    let lr = config.learning_rate;
    let reg = config.regularization;

    for epoch in 0..config.n_epochs {
        let mut squared_error = 0.0;
        for &(u, i, r) in &triples {
            let dot = user_factors.row(u).dot(&item_factors.row(i));
            let err = r - (global_mean + user_bias[u] + item_bias[i] + dot);
            squared_error += err * err;

            user_bias[u] += lr * (err - reg * user_bias[u]);
            item_bias[i] += lr * (err - reg * item_bias[i]);

            for f in 0..k {
                let puf = user_factors[[u, f]];
                let qif = item_factors[[i, f]];
                user_factors[[u, f]] += lr * (err * qif - reg * puf);
                item_factors[[i, f]] += lr * (err * puf - reg * qif);
            }
        }

        let rmse = (squared_error / triples.len() as f64).sqrt();
        if !rmse.is_finite() {
            return Err(RecommendError::ModelTrainingFailure(format!(
                "training loss diverged at epoch {}",
                epoch + 1
            )));
        }
        debug!("Epoch {}/{}: rmse = {:.4}", epoch + 1, config.n_epochs, rmse);
    }

    let model = FactorModel {
        global_mean,
        user_index,
        item_index,
        user_bias,
        item_bias,
        user_factors,
        item_factors,
    };

    if !model.all_finite() {
        return Err(RecommendError::ModelTrainingFailure(
            "model has non-finite parameters".to_string(),
        ));
    }

    info!(
        "Trained {}-factor model on {} ratings ({} users, {} movies)",
        k,
        triples.len(),
        model.user_index.len(),
        model.item_index.len()
    );
    Ok(model)
}

/// Rank the pool for the session's average member: descending score, ties
/// in pool order, top `limit`.
pub fn rank_with_model(
    model: &FactorModel,
    pool: &UnwatchedPool,
    session: &GroupRatingSet,
    limit: usize,
) -> Result<Vec<MovieId>> {
    let consensus = model.mean_user_factors(session.user_ids())?;

    let mut scored: Vec<(MovieId, f64)> = pool
        .ids()
        .par_iter()
        .map(|&id| (id, model.score(id, &consensus)))
        .collect();

    if scored.iter().any(|(_, s)| !s.is_finite()) {
        return Err(RecommendError::ModelTrainingFailure(
            "non-finite candidate score".to_string(),
        ));
    }

    // Stable sort: equal scores keep candidate order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    Ok(scored.into_iter().map(|(id, _)| id).collect())
}

// =============================================================================
// Recommender
// =============================================================================

/// Trains a fresh model per request and ranks the pool with it.
#[derive(Clone)]
pub struct LatentFactorRecommender {
    history: Arc<HistoricalRatings>,
    config: LatentFactorConfig,
    limit: usize,
}

impl LatentFactorRecommender {
    pub fn new(history: Arc<HistoricalRatings>) -> Self {
        Self {
            history,
            config: LatentFactorConfig::default(),
            limit: DEFAULT_TOP_K,
        }
    }

    pub fn with_config(mut self, config: LatentFactorConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure the number of returned ids (default: 10)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl GroupRecommender for LatentFactorRecommender {
    fn name(&self) -> &str {
        "LatentFactorRecommender"
    }

    #[instrument(skip_all, fields(group_size = ratings.group_size(), pool = pool.len()))]
    fn recommend(&self, pool: &UnwatchedPool, ratings: &GroupRatingSet) -> Result<Vec<MovieId>> {
        if pool.is_empty() {
            return Ok(Vec::new());
        }

        let model = fit(&self.history, ratings, &self.config)?;
        let ranked = rank_with_model(&model, pool, ratings, self.limit)?;
        debug!("Selected {} top-scoring candidates", ranked.len());
        Ok(ranked)
    }
}
