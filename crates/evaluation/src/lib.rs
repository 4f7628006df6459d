//! # Evaluation Crate
//!
//! Offline quality checks for the group recommender: held-out users are
//! split into synthetic groups, each group is recommended for from its
//! historical ratings, and the recommendations are scored against what the
//! members rated in the held-out set.
//!
//! ## Main Components
//!
//! - **groups**: Seeded splitting of users into fixed-size groups
//! - **metrics**: Precision@k (averaged into MAP) and NDCG@k
//! - **harness**: Runs the orchestrator over every group and aggregates

pub mod groups;
pub mod harness;
pub mod metrics;

pub use groups::split_into_groups;
pub use harness::{EvaluationReport, GroupEvaluator, GroupOutcome, evaluate_groups};
pub use metrics::{Metrics, ndcg_at_k, precision_at_k};
