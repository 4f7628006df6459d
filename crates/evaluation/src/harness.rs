//! Offline evaluation harness.
//!
//! For every group the members' historical ratings become the session, the
//! members are removed from the base corpus, and the orchestrator's ranked
//! list is scored per member against the held-out ratings.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use data_loader::{HistoricalRatings, MovieCatalog, MovieId, UserId};
use pipeline::GroupRating;
use server::{RecommendationFailed, RecommendationOrchestrator, RecommenderConfig};

use crate::metrics::{Metrics, ndcg_at_k, precision_at_k};

/// Recommendations produced for one evaluation group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub members: Vec<UserId>,
    pub recommended: Vec<MovieId>,
}

/// Result of a full evaluation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationReport {
    pub metrics: Metrics,
    pub evaluated_groups: usize,
    pub failed_groups: usize,
}

/// Score every outcome against the held-out ratings.
///
/// Each member gets Precision@k and NDCG@k for the group's list; members are
/// averaged within their group and groups are averaged with equal weight.
/// Groups without members are ignored.
pub fn evaluate_groups(outcomes: &[GroupOutcome], held_out: &HistoricalRatings) -> Metrics {
    let mut by_user: HashMap<UserId, HashMap<MovieId, u8>> = HashMap::new();
    for rating in held_out.ratings() {
        by_user
            .entry(rating.user_id)
            .or_default()
            .insert(rating.movie_id, rating.rating);
    }
    let no_ratings = HashMap::new();

    let mut map_sum = 0.0;
    let mut ndcg_sum = 0.0;
    let mut groups = 0usize;

    for outcome in outcomes.iter().filter(|o| !o.members.is_empty()) {
        let mut group_map = 0.0;
        let mut group_ndcg = 0.0;
        for member in &outcome.members {
            let ratings = by_user.get(member).unwrap_or(&no_ratings);
            let relevant: HashSet<MovieId> = ratings.keys().copied().collect();
            group_map += precision_at_k(&outcome.recommended, &relevant);
            group_ndcg += ndcg_at_k(&outcome.recommended, ratings);
        }
        let size = outcome.members.len() as f64;
        map_sum += group_map / size;
        ndcg_sum += group_ndcg / size;
        groups += 1;
    }

    if groups == 0 {
        return Metrics::default();
    }
    Metrics {
        map: map_sum / groups as f64,
        ndcg: ndcg_sum / groups as f64,
    }
}

/// Runs the orchestrator over evaluation groups.
pub struct GroupEvaluator {
    catalog: Arc<MovieCatalog>,
    history: Arc<HistoricalRatings>,
    config: RecommenderConfig,
}

impl GroupEvaluator {
    pub fn new(
        catalog: Arc<MovieCatalog>,
        history: Arc<HistoricalRatings>,
        config: RecommenderConfig,
    ) -> Self {
        Self {
            catalog,
            history,
            config,
        }
    }

    /// Collector rows for a group: every historical rating of every member,
    /// under a username derived from the member's id.
    pub fn session_for(&self, members: &[UserId]) -> Vec<GroupRating> {
        members
            .iter()
            .flat_map(|&user_id| {
                self.history
                    .ratings_for_user(user_id)
                    .into_iter()
                    .filter_map(move |rating| {
                        let movie = self.catalog.get_movie(rating.movie_id)?;
                        Some(GroupRating::new(
                            format!("user-{}", user_id),
                            movie.title.clone(),
                            rating.rating,
                        ))
                    })
            })
            .collect()
    }

    /// Recommend for one group with its members removed from the corpus.
    pub fn recommend_for(&self, members: &[UserId]) -> Result<GroupOutcome, RecommendationFailed> {
        let session = self.session_for(members);
        let excluded: HashSet<UserId> = members.iter().copied().collect();
        let base = self.history.without_users(&excluded);
        debug!(
            "Group of {} has {} session ratings over a base of {}",
            members.len(),
            session.len(),
            base.len()
        );

        let orchestrator =
            RecommendationOrchestrator::new(self.catalog.clone(), Arc::new(base), self.config.clone());
        let movies = orchestrator.make_recommendation(&session)?;

        Ok(GroupOutcome {
            members: members.to_vec(),
            recommended: movies.into_iter().map(|m| m.id).collect(),
        })
    }

    /// Evaluate every group in parallel.
    ///
    /// A group whose request fails is logged and counted, and left out of
    /// the metrics.
    #[instrument(skip_all, fields(groups = groups.len()))]
    pub fn run(&self, groups: &[Vec<UserId>], held_out: &HistoricalRatings) -> EvaluationReport {
        let results: Vec<_> = groups
            .par_iter()
            .map(|members| (members, self.recommend_for(members)))
            .collect();

        let mut outcomes = Vec::with_capacity(results.len());
        let mut failed_groups = 0;
        for (members, result) in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Group {:?} failed: {}", members, e);
                    failed_groups += 1;
                }
            }
        }

        let metrics = evaluate_groups(&outcomes, held_out);
        info!(
            "Evaluated {} groups ({} failed): MAP {:.4}, NDCG {:.4}",
            outcomes.len(),
            failed_groups,
            metrics.map,
            metrics.ndcg
        );

        EvaluationReport {
            metrics,
            evaluated_groups: outcomes.len(),
            failed_groups,
        }
    }
}
