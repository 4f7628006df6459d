//! Embedding Strategy - content nearest neighbours for small groups
//!
//! ## Algorithm
//! 1. Per member: rating-weighted mean of the embeddings of the movies they rated
//! 2. Group vector: plain mean of the member vectors
//! 3. Euclidean distance from the group vector to every candidate embedding
//! 4. Ascending distance, ties in catalog order, top `limit`
//!
//! Candidates without an embedding cannot be placed in the space and are
//! skipped. A member whose rated movies all lack embeddings makes the
//! weighted mean undefined and fails the request.

use crate::DEFAULT_TOP_K;
use data_loader::{MovieCatalog, MovieId, Rating, UserId};
use pipeline::{GroupRatingSet, GroupRecommender, RecommendError, Result, UnwatchedPool};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Ranks candidates by distance to the group's taste vector.
#[derive(Clone)]
pub struct EmbeddingRecommender {
    /// Shared reference to the catalog (read-only, so no Mutex needed)
    catalog: Arc<MovieCatalog>,

    /// Maximum number of ids returned
    limit: usize,
}

impl EmbeddingRecommender {
    pub fn new(catalog: Arc<MovieCatalog>) -> Self {
        Self {
            catalog,
            limit: DEFAULT_TOP_K,
        }
    }

    /// Configure the number of returned ids (default: 10)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Rating-weighted mean of the embeddings of one member's rated movies.
    pub fn user_vector(&self, user_id: UserId, ratings: &[Rating]) -> Result<Vec<f32>> {
        let dim = self
            .catalog
            .embedding_dim()
            .ok_or(RecommendError::EmbeddingUnavailable { user_id })?;

        let mut acc = vec![0.0f32; dim];
        let mut total_weight = 0.0f32;
        for rating in ratings {
            let Some(embedding) = self.catalog.embedding(rating.movie_id) else {
                continue;
            };
            let weight = rating.rating as f32;
            for (a, x) in acc.iter_mut().zip(embedding) {
                *a += weight * x;
            }
            total_weight += weight;
        }

        if total_weight == 0.0 {
            return Err(RecommendError::EmbeddingUnavailable { user_id });
        }
        for a in &mut acc {
            *a /= total_weight;
        }
        Ok(acc)
    }

    /// Unweighted mean of every member's vector.
    pub fn group_vector(&self, ratings: &GroupRatingSet) -> Result<Vec<f32>> {
        let by_user = ratings.ratings_by_user();
        let mut vectors = Vec::with_capacity(by_user.len());
        for (user_id, user_ratings) in &by_user {
            vectors.push(self.user_vector(*user_id, user_ratings)?);
        }

        // `GroupRatingSet` guarantees at least one member
        let mut mean = vec![0.0f32; vectors[0].len()];
        for vector in &vectors {
            for (m, x) in mean.iter_mut().zip(vector) {
                *m += x;
            }
        }
        let n = vectors.len() as f32;
        for m in &mut mean {
            *m /= n;
        }
        Ok(mean)
    }

    /// Distance of every embeddable candidate, in pool order.
    fn candidate_distances(&self, pool: &UnwatchedPool, group_vector: &[f32]) -> Vec<(MovieId, f32)> {
        let candidates: Vec<(MovieId, &[f32])> = pool
            .ids()
            .iter()
            .filter_map(|&id| self.catalog.embedding(id).map(|e| (id, e)))
            .collect();

        let skipped = pool.len() - candidates.len();
        if skipped > 0 {
            warn!("Skipped {} candidates without an embedding", skipped);
        }

        candidates
            .par_iter()
            .map(|&(id, embedding)| (id, euclidean_distance(group_vector, embedding)))
            .collect()
    }
}

impl GroupRecommender for EmbeddingRecommender {
    fn name(&self) -> &str {
        "EmbeddingRecommender"
    }

    #[instrument(skip_all, fields(group_size = ratings.group_size(), pool = pool.len()))]
    fn recommend(&self, pool: &UnwatchedPool, ratings: &GroupRatingSet) -> Result<Vec<MovieId>> {
        if pool.is_empty() {
            return Ok(Vec::new());
        }

        let group_vector = self.group_vector(ratings)?;
        let mut scored = self.candidate_distances(pool, &group_vector);

        // Stable sort: equal distances keep pool (catalog) order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(self.limit);

        debug!("Selected {} nearest candidates", scored.len());
        Ok(scored.into_iter().map(|(id, _)| id).collect())
    }
}

/// Euclidean (L2) distance between two vectors of equal length
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Movie;

    fn create_test_catalog() -> Arc<MovieCatalog> {
        let movies = vec![
            Movie::new(1, "Origin").with_embedding(vec![0.0, 0.0]),
            Movie::new(2, "East").with_embedding(vec![4.0, 0.0]),
            Movie::new(3, "North").with_embedding(vec![0.0, 4.0]),
            Movie::new(4, "Near East").with_embedding(vec![3.0, 0.0]),
            Movie::new(5, "Far").with_embedding(vec![-10.0, -10.0]),
            Movie::new(6, "Twin A").with_embedding(vec![2.0, 1.0]),
            Movie::new(7, "Twin B").with_embedding(vec![2.0, -1.0]),
            Movie::new(8, "No Embedding"),
        ];
        Arc::new(MovieCatalog::from_movies(movies).unwrap())
    }

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_user_vector_is_rating_weighted() {
        let rec = EmbeddingRecommender::new(create_test_catalog());
        let v = rec
            .user_vector(1, &[Rating::new(1, 2, 3), Rating::new(1, 3, 1)])
            .unwrap();
        // (3 * (4, 0) + 1 * (0, 4)) / 4
        assert_eq!(v, vec![3.0, 1.0]);
    }

    #[test]
    fn test_user_vector_ignores_unembedded_movies() {
        let rec = EmbeddingRecommender::new(create_test_catalog());
        let v = rec
            .user_vector(1, &[Rating::new(1, 2, 5), Rating::new(1, 8, 1)])
            .unwrap();
        assert_eq!(v, vec![4.0, 0.0]);
    }

    #[test]
    fn test_user_without_embeddable_movie_fails() {
        let rec = EmbeddingRecommender::new(create_test_catalog());
        let set = GroupRatingSet::from_triples(vec![Rating::new(1, 2, 5), Rating::new(2, 8, 4)])
            .unwrap();
        let pool = UnwatchedPool::new(vec![1, 3]);

        let err = rec.recommend(&pool, &set).unwrap_err();
        assert_eq!(err, RecommendError::EmbeddingUnavailable { user_id: 2 });
    }

    #[test]
    fn test_empty_pool_wins_over_missing_embeddings() {
        let rec = EmbeddingRecommender::new(create_test_catalog());
        let set = GroupRatingSet::from_triples(vec![Rating::new(2, 8, 4)]).unwrap();

        let ranked = rec.recommend(&UnwatchedPool::default(), &set).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_group_vector_is_unweighted_mean() {
        let rec = EmbeddingRecommender::new(create_test_catalog());
        let set = GroupRatingSet::from_triples(vec![
            Rating::new(1, 2, 5),
            Rating::new(2, 3, 1),
        ])
        .unwrap();
        assert_eq!(rec.group_vector(&set).unwrap(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_ranking_follows_distance() {
        let rec = EmbeddingRecommender::new(create_test_catalog());
        let set = GroupRatingSet::from_triples(vec![Rating::new(1, 2, 5)]).unwrap();
        let pool = UnwatchedPool::new(vec![1, 3, 4, 5, 8]);

        // Group vector is (4, 0); movie 8 has no embedding
        let ranked = rec.recommend(&pool, &set).unwrap();
        assert_eq!(ranked, vec![4, 1, 3, 5]);
    }

    #[test]
    fn test_equal_distances_keep_catalog_order() {
        let rec = EmbeddingRecommender::new(create_test_catalog());
        let set = GroupRatingSet::from_triples(vec![Rating::new(1, 2, 5)]).unwrap();

        // Twins are both sqrt(5) away from (4, 0)
        let ranked = rec.recommend(&UnwatchedPool::new(vec![6, 7]), &set).unwrap();
        assert_eq!(ranked, vec![6, 7]);
        let again = rec.recommend(&UnwatchedPool::new(vec![6, 7]), &set).unwrap();
        assert_eq!(ranked, again);
    }

    #[test]
    fn test_limit_and_empty_pool() {
        let rec = EmbeddingRecommender::new(create_test_catalog()).with_limit(2);
        let set = GroupRatingSet::from_triples(vec![Rating::new(1, 2, 5)]).unwrap();

        let ranked = rec
            .recommend(&UnwatchedPool::new(vec![1, 3, 4, 5]), &set)
            .unwrap();
        assert_eq!(ranked, vec![4, 1]);

        let empty = rec.recommend(&UnwatchedPool::default(), &set).unwrap();
        assert!(empty.is_empty());
    }
}
