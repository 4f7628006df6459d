//! Loading a data directory into a [`Dataset`].
//!
//! Layout of a data directory:
//! - `movies.dat` (required): catalog rows, in catalog order
//! - `embeddings.dat` (optional): content embeddings keyed by movie id
//! - `ratings.dat` (required): historical rating corpus
//! - `ratings_test.dat` (optional): held-out ratings for offline evaluation

use crate::error::Result;
use crate::parser;
use crate::types::*;
use std::path::Path;
use tracing::{info, warn};

pub const MOVIES_FILE: &str = "movies.dat";
pub const EMBEDDINGS_FILE: &str = "embeddings.dat";
pub const RATINGS_FILE: &str = "ratings.dat";
pub const TEST_RATINGS_FILE: &str = "ratings_test.dat";

/// The catalog and the historical corpus, loaded once per process.
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    pub catalog: MovieCatalog,
    pub history: HistoricalRatings,
}

impl Dataset {
    /// Load and validate a data directory.
    ///
    /// The three files are parsed in parallel; the catalog is then built in
    /// file order, embeddings attached, and the history validated against it.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        info!("Loading dataset from {:?}", data_dir);

        let movies_path = data_dir.join(MOVIES_FILE);
        let embeddings_path = data_dir.join(EMBEDDINGS_FILE);
        let ratings_path = data_dir.join(RATINGS_FILE);

        let ((movies, embeddings), ratings) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_movies(&movies_path),
                    || {
                        if embeddings_path.exists() {
                            parser::parse_embeddings(&embeddings_path).map(Some)
                        } else {
                            Ok(None)
                        }
                    },
                )
            },
            || parser::parse_ratings(&ratings_path),
        );

        let movies = movies?;
        let embeddings = embeddings?;
        let ratings = ratings?;

        let mut catalog = MovieCatalog::from_movies(movies)?;
        match embeddings {
            Some(embeddings) => {
                for (movie_id, vector) in embeddings {
                    catalog.attach_embedding(movie_id, vector)?;
                }
            }
            None => warn!(
                "No {} found, embedding-based recommendations are unavailable",
                EMBEDDINGS_FILE
            ),
        }

        let history = HistoricalRatings::from_ratings(ratings);
        history.validate(&catalog)?;

        info!(
            "Loaded {} movies ({} with embeddings), {} historical ratings",
            catalog.len(),
            catalog.embedded_count(),
            history.len()
        );
        Ok(Self { catalog, history })
    }

    /// Load the held-out ratings used by offline evaluation.
    pub fn load_test_ratings(&self, data_dir: &Path) -> Result<HistoricalRatings> {
        let ratings = parser::parse_ratings(&data_dir.join(TEST_RATINGS_FILE))?;
        let test = HistoricalRatings::from_ratings(ratings);
        test.validate(&self.catalog)?;
        info!("Loaded {} held-out ratings", test.len());
        Ok(test)
    }
}
