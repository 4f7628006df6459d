//! Preprocessing stages of the group recommender.
//!
//! This crate provides:
//! - [`RatingPreprocessor`]: collector rows to numeric triples with synthetic user ids
//! - [`UnwatchedResolver`]: the candidate pool nobody in the group has rated
//! - [`GroupRecommender`]: the trait both ranking strategies implement
//! - [`RecommendError`]: the error taxonomy of the core
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{RatingPreprocessor, UnwatchedResolver};
//!
//! let pre = RatingPreprocessor::new(catalog.clone(), history.next_user_id().unwrap());
//! let session = pre.preprocess(&rows)?;
//! let pool = UnwatchedResolver::new(catalog.clone()).resolve(&session);
//! ```

pub mod error;
pub mod types;
pub mod preprocessor;
pub mod unwatched;
pub mod traits;

pub use error::{ErrorKind, RecommendError, Result};
pub use preprocessor::RatingPreprocessor;
pub use traits::GroupRecommender;
pub use types::{GroupRating, GroupRatingSet, Member, UnwatchedPool};
pub use unwatched::UnwatchedResolver;
