//! Server crate for the group recommender.
//!
//! This crate contains the orchestrator that runs one recommendation request
//! end to end: preprocessing, candidate resolution, strategy dispatch and the
//! join back onto the catalog.

pub mod config;
pub mod error;
pub mod orchestrator;

pub use config::RecommenderConfig;
pub use error::{FailureKind, RecommendationFailed};
pub use orchestrator::RecommendationOrchestrator;
