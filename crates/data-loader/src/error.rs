//! Error types for the data-loader crate.
//!
//! Every failure that can happen while reading the catalog, the embedding
//! table or the rating corpus is one variant of [`DataLoadError`].

use thiserror::Error;

/// Errors that can occur during data loading and parsing
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Referenced entity doesn't exist (e.g., rating for non-existent movie)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: u32 },

    /// Two catalog rows share an id or a title
    #[error("Duplicate {field} in catalog: {value}")]
    DuplicateEntry { field: String, value: String },

    /// Embedding vectors of different lengths in one catalog
    #[error("Embedding for movie {movie_id} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        movie_id: u32,
        expected: usize,
        found: usize,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
