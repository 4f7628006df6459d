//! The single error type surfaced to callers of the orchestrator.
//!
//! An empty recommendation list is `Ok(vec![])`; every `Err` is abnormal.

use pipeline::{ErrorKind, RecommendError};
use std::time::Duration;
use thiserror::Error;

/// Origin of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    SchemaMismatch,
    EmbeddingUnavailable,
    ModelTrainingFailure,
    /// The request did not finish within the caller's deadline
    Timeout,
    /// The blocking worker running the request panicked
    WorkerPanicked,
}

impl From<ErrorKind> for FailureKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::SchemaMismatch => FailureKind::SchemaMismatch,
            ErrorKind::EmbeddingUnavailable => FailureKind::EmbeddingUnavailable,
            ErrorKind::ModelTrainingFailure => FailureKind::ModelTrainingFailure,
        }
    }
}

#[derive(Error, Debug)]
#[error("Recommendation failed ({kind:?}): {message}")]
pub struct RecommendationFailed {
    kind: FailureKind,
    message: String,
    #[source]
    source: Option<RecommendError>,
}

impl RecommendationFailed {
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// The core error this failure wraps, if it came from the core
    pub fn core_error(&self) -> Option<&RecommendError> {
        self.source.as_ref()
    }

    pub(crate) fn timeout(limit: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: format!("no result within {:?}", limit),
            source: None,
        }
    }

    pub(crate) fn worker_panicked(reason: String) -> Self {
        Self {
            kind: FailureKind::WorkerPanicked,
            message: reason,
            source: None,
        }
    }
}

impl From<RecommendError> for RecommendationFailed {
    fn from(err: RecommendError) -> Self {
        Self {
            kind: err.kind().into(),
            message: err.to_string(),
            source: Some(err),
        }
    }
}
