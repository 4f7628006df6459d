//! Error taxonomy shared by the preprocessing stages and both strategies.
//!
//! An empty candidate pool is deliberately absent: it is a normal outcome
//! and flows through as an empty result.

use data_loader::UserId;
use thiserror::Error;

/// Failures that abort a single recommendation request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    /// Input rows that cannot be mapped onto the catalog, or that break the
    /// session invariants (range, duplicates, empty group)
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A group member has no rated movie with an embedding
    #[error("No embedding available for any movie rated by user {user_id}")]
    EmbeddingUnavailable { user_id: UserId },

    /// Factorization diverged or produced non-finite parameters
    #[error("Model training failed: {0}")]
    ModelTrainingFailure(String),
}

/// Discriminant of [`RecommendError`], carried by wrappers further up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SchemaMismatch,
    EmbeddingUnavailable,
    ModelTrainingFailure,
}

impl RecommendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecommendError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            RecommendError::EmbeddingUnavailable { .. } => ErrorKind::EmbeddingUnavailable,
            RecommendError::ModelTrainingFailure(_) => ErrorKind::ModelTrainingFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecommendError>;
