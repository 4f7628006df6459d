//! Core domain types shared by every stage of the group recommender.
//!
//! - Type aliases for domain clarity (UserId, MovieId)
//! - [`Movie`] and [`Rating`] records
//! - [`MovieCatalog`]: the immutable, ordered movie table with optional embeddings
//! - [`HistoricalRatings`]: the baseline corpus used to warm-start factorization

use crate::error::{DataLoadError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user (historical or synthetic)
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

/// Lowest valid rating value
pub const MIN_RATING: u8 = 1;

/// Highest valid rating value
pub const MAX_RATING: u8 = 5;

/// Returns true if `value` lies in the closed rating scale.
pub fn is_valid_rating(value: u8) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&value)
}

// =============================================================================
// Movie
// =============================================================================

/// A movie in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Precomputed content embedding, when one is available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Movie {
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

// =============================================================================
// Rating
// =============================================================================

/// One (userId, movieId, rating) triple.
///
/// Used both for the historical corpus and for a preprocessed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Integer rating from 1 to 5
    pub rating: u8,
}

impl Rating {
    pub fn new(user_id: UserId, movie_id: MovieId, rating: u8) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
        }
    }
}

// =============================================================================
// MovieCatalog
// =============================================================================

/// Ordered movie table with id and title lookups.
///
/// Row order is the catalog order; downstream ranking uses it to break ties,
/// so movies are never reordered once inserted. Every embedding in a catalog
/// has the same dimension.
#[derive(Debug, Default, Clone)]
pub struct MovieCatalog {
    movies: Vec<Movie>,
    positions: HashMap<MovieId, usize>,
    titles: HashMap<String, MovieId>,
    embedding_dim: Option<usize>,
}

impl MovieCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from movies in the given order.
    pub fn from_movies(movies: impl IntoIterator<Item = Movie>) -> Result<Self> {
        let mut catalog = Self::new();
        for movie in movies {
            catalog.insert_movie(movie)?;
        }
        Ok(catalog)
    }

    /// Append a movie, rejecting duplicate ids, duplicate titles and
    /// embeddings whose dimension disagrees with the rest of the catalog.
    pub fn insert_movie(&mut self, movie: Movie) -> Result<()> {
        if self.positions.contains_key(&movie.id) {
            return Err(DataLoadError::DuplicateEntry {
                field: "movieId".to_string(),
                value: movie.id.to_string(),
            });
        }
        if self.titles.contains_key(&movie.title) {
            return Err(DataLoadError::DuplicateEntry {
                field: "title".to_string(),
                value: movie.title.clone(),
            });
        }
        if let Some(embedding) = &movie.embedding {
            self.check_dimension(movie.id, embedding.len())?;
        }

        self.positions.insert(movie.id, self.movies.len());
        self.titles.insert(movie.title.clone(), movie.id);
        self.movies.push(movie);
        Ok(())
    }

    /// Attach (or replace) the embedding of an existing movie.
    pub fn attach_embedding(&mut self, movie_id: MovieId, embedding: Vec<f32>) -> Result<()> {
        let position = *self
            .positions
            .get(&movie_id)
            .ok_or_else(|| DataLoadError::MissingReference {
                entity: "Movie".to_string(),
                id: movie_id,
            })?;
        self.check_dimension(movie_id, embedding.len())?;
        self.movies[position].embedding = Some(embedding);
        Ok(())
    }

    fn check_dimension(&mut self, movie_id: MovieId, found: usize) -> Result<()> {
        match self.embedding_dim {
            Some(expected) if expected != found => Err(DataLoadError::DimensionMismatch {
                movie_id,
                expected,
                found,
            }),
            Some(_) => Ok(()),
            None => {
                if found == 0 {
                    return Err(DataLoadError::InvalidValue {
                        field: "embedding".to_string(),
                        value: format!("empty vector for movie {}", movie_id),
                    });
                }
                self.embedding_dim = Some(found);
                Ok(())
            }
        }
    }

    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.positions.get(&id).map(|&pos| &self.movies[pos])
    }

    /// Exact title lookup.
    pub fn get_movie_by_title(&self, title: &str) -> Option<&Movie> {
        self.titles.get(title).and_then(|id| self.get_movie(*id))
    }

    pub fn embedding(&self, id: MovieId) -> Option<&[f32]> {
        self.get_movie(id)?.embedding.as_deref()
    }

    pub fn embedding_dim(&self) -> Option<usize> {
        self.embedding_dim
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.positions.contains_key(&id)
    }

    /// All movies in catalog order.
    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    /// All movie ids in catalog order.
    pub fn movie_ids(&self) -> impl Iterator<Item = MovieId> + '_ {
        self.movies.iter().map(|m| m.id)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Number of movies carrying an embedding
    pub fn embedded_count(&self) -> usize {
        self.movies.iter().filter(|m| m.embedding.is_some()).count()
    }
}

// =============================================================================
// HistoricalRatings
// =============================================================================

/// Baseline rating corpus consumed by latent-factor training.
#[derive(Debug, Default, Clone)]
pub struct HistoricalRatings {
    ratings: Vec<Rating>,
    max_user_id: Option<UserId>,
}

impl HistoricalRatings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let mut history = Self::new();
        for rating in ratings {
            history.insert_rating(rating);
        }
        history
    }

    pub fn insert_rating(&mut self, rating: Rating) {
        self.max_user_id = Some(
            self.max_user_id
                .map_or(rating.user_id, |max| max.max(rating.user_id)),
        );
        self.ratings.push(rating);
    }

    /// Ratings in corpus order.
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// First id that is free for synthetic session users, or `None` when
    /// the corpus already holds `UserId::MAX`.
    pub fn next_user_id(&self) -> Option<UserId> {
        match self.max_user_id {
            Some(max) => max.checked_add(1),
            None => Some(1),
        }
    }

    /// Distinct user ids, sorted.
    pub fn user_ids(&self) -> BTreeSet<UserId> {
        self.ratings.iter().map(|r| r.user_id).collect()
    }

    /// Ratings made by one user, in corpus order.
    pub fn ratings_for_user(&self, user_id: UserId) -> Vec<Rating> {
        self.ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .copied()
            .collect()
    }

    /// Copy of the corpus without the given users.
    ///
    /// `max_user_id` is kept from the full corpus so synthetic ids never
    /// collide with a removed user.
    pub fn without_users(&self, excluded: &HashSet<UserId>) -> Self {
        Self {
            ratings: self
                .ratings
                .iter()
                .filter(|r| !excluded.contains(&r.user_id))
                .copied()
                .collect(),
            max_user_id: self.max_user_id,
        }
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Check that every rating references a catalog movie and is in range,
    /// and that some user id above the corpus is left for session users.
    pub fn validate(&self, catalog: &MovieCatalog) -> Result<()> {
        for rating in &self.ratings {
            if rating.user_id == UserId::MAX {
                return Err(DataLoadError::InvalidValue {
                    field: "userId".to_string(),
                    value: rating.user_id.to_string(),
                });
            }
            if !catalog.contains(rating.movie_id) {
                return Err(DataLoadError::MissingReference {
                    entity: "Movie".to_string(),
                    id: rating.movie_id,
                });
            }
            if !is_valid_rating(rating.rating) {
                return Err(DataLoadError::InvalidValue {
                    field: "rating".to_string(),
                    value: rating.rating.to_string(),
                });
            }
        }
        Ok(())
    }
}
