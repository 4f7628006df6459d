//! Computes the pool of candidate movies for a group.
//!
//! For a single user the pool is the catalog minus that user's rated movies.
//! For a group it is the intersection of every member's pool, so nothing any
//! member already rated survives. The pool keeps catalog order and may be
//! empty.

use crate::types::{GroupRatingSet, UnwatchedPool};
use data_loader::{MovieCatalog, MovieId, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub struct UnwatchedResolver {
    catalog: Arc<MovieCatalog>,
}

impl UnwatchedResolver {
    pub fn new(catalog: Arc<MovieCatalog>) -> Self {
        Self { catalog }
    }

    /// Catalog ids this user has not rated, in catalog order.
    pub fn unwatched_for_user(&self, ratings: &GroupRatingSet, user_id: UserId) -> Vec<MovieId> {
        let rated = ratings.rated_by(user_id);
        self.catalog
            .movie_ids()
            .filter(|id| !rated.contains(id))
            .collect()
    }

    pub fn resolve(&self, ratings: &GroupRatingSet) -> UnwatchedPool {
        let mut per_user = ratings
            .user_ids()
            .map(|user_id| self.unwatched_for_user(ratings, user_id));

        let Some(first) = per_user.next() else {
            return UnwatchedPool::default();
        };

        let pool = per_user.fold(first, |acc, unwatched| {
            let unwatched: HashSet<MovieId> = unwatched.into_iter().collect();
            acc.into_iter().filter(|id| unwatched.contains(id)).collect()
        });

        debug!(
            "Resolved {} unwatched candidates for a group of {}",
            pool.len(),
            ratings.group_size()
        );
        UnwatchedPool::new(pool)
    }
}
