//! Recommender configuration.
//!
//! Built in code with `with_*` methods, or read from a JSON file where every
//! field is optional:
//!
//! ```json
//! { "top_k": 10, "embedding_max_group_size": 3, "latent": { "seed": 7, "n_epochs": 30 } }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strategies::{LatentFactorConfig, DEFAULT_TOP_K, EMBEDDING_MAX_GROUP_SIZE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Groups up to this size use the embedding strategy
    pub embedding_max_group_size: usize,
    /// Maximum number of movies returned per request
    pub top_k: usize,
    /// Factorization settings for larger groups
    pub latent: LatentFactorConfig,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            embedding_max_group_size: EMBEDDING_MAX_GROUP_SIZE,
            top_k: DEFAULT_TOP_K,
            latent: LatentFactorConfig::default(),
        }
    }
}

impl RecommenderConfig {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_embedding_max_group_size(mut self, size: usize) -> Self {
        self.embedding_max_group_size = size;
        self
    }

    pub fn with_latent(mut self, latent: LatentFactorConfig) -> Self {
        self.latent = latent;
        self
    }

    /// Pin the factorization seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.latent.seed = seed;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid recommender config")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&content)
    }
}
