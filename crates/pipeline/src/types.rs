//! Session-level types: raw collector rows, the preprocessed group and the
//! candidate pool.

use crate::error::{RecommendError, Result};
use data_loader::{is_valid_rating, MovieId, Rating, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One row handed over by the rating collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRating {
    pub username: String,
    pub title: String,
    pub rating: u8,
}

impl GroupRating {
    pub fn new(username: impl Into<String>, title: impl Into<String>, rating: u8) -> Self {
        Self {
            username: username.into(),
            title: title.into(),
            rating,
        }
    }
}

/// A session participant and the synthetic id assigned to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub username: String,
}

/// The numeric ratings of one group session.
///
/// Invariants, checked on construction:
/// - at least one rating
/// - every rating in [1, 5]
/// - at most one rating per (user, movie)
///
/// Members are kept sorted by user id; every member has at least one rating
/// because members are derived from the ratings themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRatingSet {
    ratings: Vec<Rating>,
    members: Vec<Member>,
}

impl GroupRatingSet {
    /// Build a session from numeric triples. Members get a placeholder name
    /// derived from their id.
    pub fn from_triples(ratings: Vec<Rating>) -> Result<Self> {
        let members = ratings
            .iter()
            .map(|r| r.user_id)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .map(|user_id| Member {
                user_id,
                username: format!("user_{}", user_id),
            })
            .collect();
        Self::with_members(ratings, members)
    }

    pub(crate) fn with_members(ratings: Vec<Rating>, mut members: Vec<Member>) -> Result<Self> {
        if ratings.is_empty() {
            return Err(RecommendError::SchemaMismatch(
                "group has no ratings".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(ratings.len());
        for rating in &ratings {
            if !is_valid_rating(rating.rating) {
                return Err(RecommendError::SchemaMismatch(format!(
                    "rating {} for movie {} is outside 1..=5",
                    rating.rating, rating.movie_id
                )));
            }
            if !seen.insert((rating.user_id, rating.movie_id)) {
                return Err(RecommendError::SchemaMismatch(format!(
                    "user {} rated movie {} more than once",
                    rating.user_id, rating.movie_id
                )));
            }
        }

        members.sort_by_key(|m| m.user_id);
        Ok(Self { ratings, members })
    }

    /// All ratings in input order.
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// Synthetic user ids, ascending.
    pub fn user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.members.iter().map(|m| m.user_id)
    }

    pub fn group_size(&self) -> usize {
        self.members.len()
    }

    pub fn user_id_of(&self, username: &str) -> Option<UserId> {
        self.members
            .iter()
            .find(|m| m.username == username)
            .map(|m| m.user_id)
    }

    /// Ratings grouped by member, ascending user id.
    pub fn ratings_by_user(&self) -> BTreeMap<UserId, Vec<Rating>> {
        let mut grouped: BTreeMap<UserId, Vec<Rating>> = BTreeMap::new();
        for rating in &self.ratings {
            grouped.entry(rating.user_id).or_default().push(*rating);
        }
        grouped
    }

    /// Movies rated by one member
    pub fn rated_by(&self, user_id: UserId) -> HashSet<MovieId> {
        self.ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.movie_id)
            .collect()
    }

    /// Movies rated by anyone in the group
    pub fn rated_by_anyone(&self) -> HashSet<MovieId> {
        self.ratings.iter().map(|r| r.movie_id).collect()
    }
}

/// Candidate movie ids eligible for recommendation, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnwatchedPool {
    ids: Vec<MovieId>,
}

impl UnwatchedPool {
    pub fn new(ids: Vec<MovieId>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &[MovieId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_rating_from_json() {
        let rows: Vec<GroupRating> = serde_json::from_str(
            r#"[{"username": "ann", "title": "Heat (1995)", "rating": 5}]"#,
        )
        .unwrap();
        assert_eq!(rows, vec![GroupRating::new("ann", "Heat (1995)", 5)]);
    }

    #[test]
    fn test_from_triples_derives_members() {
        let set = GroupRatingSet::from_triples(vec![
            Rating::new(9, 1, 4),
            Rating::new(8, 1, 2),
            Rating::new(9, 2, 5),
        ])
        .unwrap();

        assert_eq!(set.group_size(), 2);
        assert_eq!(set.user_ids().collect::<Vec<_>>(), vec![8, 9]);
        assert_eq!(set.ratings_by_user()[&9].len(), 2);
        assert_eq!(set.rated_by(8), HashSet::from([1]));
        assert_eq!(set.rated_by_anyone(), HashSet::from([1, 2]));
    }

    #[test]
    fn test_invariants_enforced() {
        assert!(matches!(
            GroupRatingSet::from_triples(vec![]),
            Err(RecommendError::SchemaMismatch(_))
        ));
        assert!(matches!(
            GroupRatingSet::from_triples(vec![Rating::new(1, 1, 6)]),
            Err(RecommendError::SchemaMismatch(_))
        ));
        assert!(matches!(
            GroupRatingSet::from_triples(vec![Rating::new(1, 1, 3), Rating::new(1, 1, 4)]),
            Err(RecommendError::SchemaMismatch(_))
        ));
    }
}
