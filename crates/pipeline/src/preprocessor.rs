//! Maps collector rows (username, title, rating) onto numeric triples.
//!
//! Synthetic user ids are assigned in sorted-username order starting at the
//! first id above the historical corpus, so they never collide with a
//! historical user inside one training run. They are only meaningful for the
//! duration of one request.

use crate::error::{RecommendError, Result};
use crate::types::{GroupRating, GroupRatingSet, Member};
use data_loader::{is_valid_rating, MovieCatalog, Rating, UserId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

pub struct RatingPreprocessor {
    catalog: Arc<MovieCatalog>,
    first_user_id: UserId,
}

impl RatingPreprocessor {
    /// `first_user_id` is usually `HistoricalRatings::next_user_id()`.
    pub fn new(catalog: Arc<MovieCatalog>, first_user_id: UserId) -> Self {
        Self {
            catalog,
            first_user_id,
        }
    }

    /// Convert raw rows into a [`GroupRatingSet`], preserving row order.
    ///
    /// Fails with `SchemaMismatch` on an empty input, a blank username, a
    /// rating outside 1..=5, a title missing from the catalog, or a user
    /// rating the same title twice. Also fails when the group has more users
    /// than ids remain above `first_user_id`.
    pub fn preprocess(&self, rows: &[GroupRating]) -> Result<GroupRatingSet> {
        if rows.is_empty() {
            return Err(RecommendError::SchemaMismatch(
                "group has no ratings".to_string(),
            ));
        }

        let usernames: BTreeSet<&str> = rows.iter().map(|r| r.username.as_str()).collect();
        if usernames.iter().any(|name| name.trim().is_empty()) {
            return Err(RecommendError::SchemaMismatch(
                "blank username in group ratings".to_string(),
            ));
        }

        let last_user_id = UserId::try_from(usernames.len() - 1)
            .ok()
            .and_then(|offset| self.first_user_id.checked_add(offset))
            .ok_or_else(|| {
                RecommendError::SchemaMismatch(format!(
                    "{} users do not fit in the ids above {}",
                    usernames.len(),
                    self.first_user_id
                ))
            })?;

        let user_ids: HashMap<&str, UserId> = usernames
            .iter()
            .zip(self.first_user_id..=last_user_id)
            .map(|(&name, id)| (name, id))
            .collect();

        let mut ratings = Vec::with_capacity(rows.len());
        for row in rows {
            if !is_valid_rating(row.rating) {
                return Err(RecommendError::SchemaMismatch(format!(
                    "rating {} from {} for {:?} is outside 1..=5",
                    row.rating, row.username, row.title
                )));
            }
            let movie = self.catalog.get_movie_by_title(&row.title).ok_or_else(|| {
                RecommendError::SchemaMismatch(format!("unknown movie title {:?}", row.title))
            })?;
            ratings.push(Rating::new(
                user_ids[row.username.as_str()],
                movie.id,
                row.rating,
            ));
        }

        let members = usernames
            .iter()
            .map(|&name| Member {
                user_id: user_ids[name],
                username: name.to_string(),
            })
            .collect();

        let set = GroupRatingSet::with_members(ratings, members)?;
        debug!(
            "Preprocessed {} ratings from {} users (ids {}..={})",
            set.ratings().len(),
            set.group_size(),
            self.first_user_id,
            last_user_id
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Movie;

    fn catalog() -> Arc<MovieCatalog> {
        Arc::new(
            MovieCatalog::from_movies(vec![
                Movie::new(10, "Alien (1979)"),
                Movie::new(20, "Heat (1995)"),
                Movie::new(30, "Up (2009)"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_ids_follow_sorted_usernames() {
        let pre = RatingPreprocessor::new(catalog(), 101);
        let set = pre
            .preprocess(&[
                GroupRating::new("zoe", "Heat (1995)", 4),
                GroupRating::new("adam", "Alien (1979)", 5),
                GroupRating::new("zoe", "Up (2009)", 2),
            ])
            .unwrap();

        assert_eq!(set.user_id_of("adam"), Some(101));
        assert_eq!(set.user_id_of("zoe"), Some(102));
        assert_eq!(
            set.ratings(),
            &[
                Rating::new(102, 20, 4),
                Rating::new(101, 10, 5),
                Rating::new(102, 30, 2),
            ]
        );
    }

    #[test]
    fn test_unknown_title_is_schema_mismatch() {
        let pre = RatingPreprocessor::new(catalog(), 1);
        let err = pre
            .preprocess(&[GroupRating::new("ann", "Not A Movie", 3)])
            .unwrap_err();
        assert!(matches!(err, RecommendError::SchemaMismatch(_)));
    }

    #[test]
    fn test_malformed_rows_rejected() {
        let pre = RatingPreprocessor::new(catalog(), 1);

        assert!(pre.preprocess(&[]).is_err());
        assert!(pre.preprocess(&[GroupRating::new("ann", "Up (2009)", 0)]).is_err());
        assert!(pre.preprocess(&[GroupRating::new("  ", "Up (2009)", 3)]).is_err());
        assert!(
            pre.preprocess(&[
                GroupRating::new("ann", "Up (2009)", 3),
                GroupRating::new("ann", "Up (2009)", 4),
            ])
            .is_err()
        );
    }

    #[test]
    fn test_ids_stop_at_largest_user_id() {
        let pre = RatingPreprocessor::new(catalog(), UserId::MAX - 1);
        let set = pre
            .preprocess(&[
                GroupRating::new("ann", "Up (2009)", 3),
                GroupRating::new("bob", "Up (2009)", 4),
            ])
            .unwrap();
        assert_eq!(set.user_id_of("bob"), Some(UserId::MAX));

        let err = pre
            .preprocess(&[
                GroupRating::new("ann", "Up (2009)", 3),
                GroupRating::new("bob", "Up (2009)", 4),
                GroupRating::new("cy", "Up (2009)", 5),
            ])
            .unwrap_err();
        assert!(matches!(err, RecommendError::SchemaMismatch(_)));
    }

    #[test]
    fn test_same_title_from_different_users_is_fine() {
        let pre = RatingPreprocessor::new(catalog(), 1);
        let set = pre
            .preprocess(&[
                GroupRating::new("ann", "Up (2009)", 3),
                GroupRating::new("bob", "Up (2009)", 4),
            ])
            .unwrap();
        assert_eq!(set.group_size(), 2);
    }
}
