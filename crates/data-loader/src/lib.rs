//! # Data Loader Crate
//!
//! Loads the movie catalog, the optional content embeddings and the
//! historical rating corpus that back the group recommender.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Rating, MovieCatalog, HistoricalRatings)
//! - **parser**: Parse `::`-separated .dat files into Rust structs
//! - **loader**: Load and validate a whole data directory
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::Dataset;
//! use std::path::Path;
//!
//! let dataset = Dataset::load_from_dir(Path::new("data"))?;
//! let movie = dataset.catalog.get_movie_by_title("Heat (1995)").unwrap();
//! println!("{} has embedding: {}", movie.title, movie.embedding.is_some());
//! ```

pub mod error;
pub mod types;
pub mod parser;
pub mod loader;

pub use error::{DataLoadError, Result};
pub use loader::Dataset;
pub use types::{
    // Type aliases
    UserId,
    MovieId,
    // Core types
    Movie,
    Rating,
    MovieCatalog,
    HistoricalRatings,
    // Rating scale
    MIN_RATING,
    MAX_RATING,
    is_valid_rating,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_creation() {
        let catalog = MovieCatalog::new();
        assert!(catalog.is_empty());
        assert_eq!(catalog.embedding_dim(), None);
    }

    #[test]
    fn test_insert_movie_preserves_order() {
        let catalog = MovieCatalog::from_movies(vec![
            Movie::new(30, "Casino (1995)"),
            Movie::new(10, "Heat (1995)"),
            Movie::new(20, "Se7en (1995)"),
        ])
        .unwrap();

        let ids: Vec<MovieId> = catalog.movie_ids().collect();
        assert_eq!(ids, vec![30, 10, 20]);
        assert_eq!(catalog.get_movie_by_title("Se7en (1995)").unwrap().id, 20);
    }

    #[test]
    fn test_duplicate_movies_rejected() {
        let mut catalog = MovieCatalog::new();
        catalog.insert_movie(Movie::new(1, "Heat (1995)")).unwrap();

        let dup_id = catalog.insert_movie(Movie::new(1, "Other"));
        assert!(matches!(dup_id, Err(DataLoadError::DuplicateEntry { .. })));

        let dup_title = catalog.insert_movie(Movie::new(2, "Heat (1995)"));
        assert!(matches!(dup_title, Err(DataLoadError::DuplicateEntry { .. })));
    }

    #[test]
    fn test_embedding_dimension_enforced() {
        let mut catalog = MovieCatalog::new();
        catalog
            .insert_movie(Movie::new(1, "A").with_embedding(vec![1.0, 2.0]))
            .unwrap();
        catalog.insert_movie(Movie::new(2, "B")).unwrap();

        let err = catalog.attach_embedding(2, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::DimensionMismatch { movie_id: 2, expected: 2, found: 3 }
        ));

        catalog.attach_embedding(2, vec![0.0, 1.0]).unwrap();
        assert_eq!(catalog.embedding(2), Some(&[0.0, 1.0][..]));
        assert!(catalog.attach_embedding(99, vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_history_user_ids() {
        let history = HistoricalRatings::from_ratings(vec![
            Rating::new(4, 1, 5),
            Rating::new(2, 1, 3),
            Rating::new(4, 2, 1),
        ]);
        assert_eq!(history.next_user_id(), Some(5));
        assert_eq!(history.ratings_for_user(4).len(), 2);

        let trimmed = history.without_users(&HashSet::from([4]));
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed.next_user_id(), Some(5));
    }

    #[test]
    fn test_empty_history_starts_at_one() {
        assert_eq!(HistoricalRatings::new().next_user_id(), Some(1));
    }

    #[test]
    fn test_max_user_id_leaves_no_session_ids() {
        let catalog = MovieCatalog::from_movies(vec![Movie::new(1, "Heat (1995)")]).unwrap();
        let history = HistoricalRatings::from_ratings(vec![Rating::new(UserId::MAX, 1, 4)]);

        assert_eq!(history.next_user_id(), None);
        let err = history.validate(&catalog).unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidValue { ref field, .. } if field == "userId"));
    }
}
