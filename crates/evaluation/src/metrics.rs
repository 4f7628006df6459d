//! Ranking metrics for a single member.
//!
//! Both metrics take the group's ranked recommendation list and the member's
//! held-out ratings; the list is scored as-is, so `k` is its length.

use data_loader::MovieId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Keeps NDCG finite when no recommended movie was rated.
const IDCG_EPSILON: f64 = 1e-8;

/// Aggregated scores for one evaluation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean average precision at k
    pub map: f64,
    pub ndcg: f64,
}

/// Average precision of `recommended` against the `relevant` set.
///
/// Sums `hits_so_far / rank` over every rank holding a relevant movie and
/// divides by `min(|relevant|, |recommended|)`; returns 0 when either side
/// is empty.
pub fn precision_at_k(recommended: &[MovieId], relevant: &HashSet<MovieId>) -> f64 {
    let denominator = relevant.len().min(recommended.len());
    if denominator == 0 {
        return 0.0;
    }

    let mut hits = 0usize;
    let mut sum = 0.0;
    for (idx, movie_id) in recommended.iter().enumerate() {
        if relevant.contains(movie_id) {
            hits += 1;
            sum += hits as f64 / (idx + 1) as f64;
        }
    }
    sum / denominator as f64
}

/// Normalized discounted cumulative gain with held-out ratings as gains.
///
/// A recommended movie the member did not rate gains 0. The ideal ordering
/// is the same gains sorted in descending order.
pub fn ndcg_at_k(recommended: &[MovieId], ratings: &HashMap<MovieId, u8>) -> f64 {
    let gains: Vec<f64> = recommended
        .iter()
        .map(|id| ratings.get(id).map_or(0.0, |&r| f64::from(r)))
        .collect();

    let mut ideal = gains.clone();
    ideal.sort_by(|a, b| b.total_cmp(a));

    dcg(&gains) / (dcg(&ideal) + IDCG_EPSILON)
}

fn dcg(gains: &[f64]) -> f64 {
    gains
        .iter()
        .enumerate()
        .map(|(idx, gain)| gain / ((idx + 2) as f64).log2())
        .sum()
}
