//! Runs the evaluation harness over a small synthetic corpus.

use data_loader::{HistoricalRatings, Movie, MovieCatalog, Rating};
use evaluation::{GroupEvaluator, split_into_groups};
use server::RecommenderConfig;
use std::sync::Arc;

fn catalog() -> Arc<MovieCatalog> {
    let movies = (1..=24u32).map(|id| {
        let angle = id as f32 * 0.25;
        Movie::new(id, format!("Movie {}", id)).with_embedding(vec![angle.cos(), angle.sin()])
    });
    Arc::new(MovieCatalog::from_movies(movies).unwrap())
}

fn history() -> HistoricalRatings {
    let mut ratings = Vec::new();
    for user_id in 1..=20u32 {
        for movie_id in 1..=24u32 {
            if (user_id + movie_id) % 7 == 0 {
                ratings.push(Rating::new(user_id, movie_id, 1 + ((user_id * movie_id) % 5) as u8));
            }
        }
    }
    HistoricalRatings::from_ratings(ratings)
}

fn held_out() -> HistoricalRatings {
    let mut ratings = Vec::new();
    for user_id in 1..=20u32 {
        for movie_id in 1..=24u32 {
            if (user_id + movie_id) % 7 == 1 {
                ratings.push(Rating::new(user_id, movie_id, 4));
            }
        }
    }
    HistoricalRatings::from_ratings(ratings)
}

#[test]
fn test_session_uses_member_history() {
    let evaluator = GroupEvaluator::new(catalog(), Arc::new(history()), RecommenderConfig::default());
    let session = evaluator.session_for(&[1, 2]);

    let expected = history().ratings_for_user(1).len() + history().ratings_for_user(2).len();
    assert_eq!(session.len(), expected);
    assert!(session.iter().any(|row| row.username == "user-1"));
    assert!(session.iter().all(|row| row.title.starts_with("Movie ")));
}

#[test]
fn test_recommendations_exclude_member_history() {
    let history = history();
    let evaluator = GroupEvaluator::new(catalog(), Arc::new(history.clone()), RecommenderConfig::default());

    for members in [vec![4, 5], vec![4, 5, 6, 7, 8]] {
        let outcome = evaluator.recommend_for(&members).unwrap();
        assert!(!outcome.recommended.is_empty());
        for member in &members {
            for rating in history.ratings_for_user(*member) {
                assert!(!outcome.recommended.contains(&rating.movie_id));
            }
        }
    }
}

#[test]
fn test_run_reports_metrics_in_range() {
    let held_out = held_out();
    let evaluator = GroupEvaluator::new(
        catalog(),
        Arc::new(history()),
        RecommenderConfig::default().with_seed(5),
    );

    for group_size in [2, 5] {
        let groups = split_into_groups(held_out.user_ids(), group_size, 1);
        let report = evaluator.run(&groups, &held_out);

        assert_eq!(report.evaluated_groups + report.failed_groups, groups.len());
        assert_eq!(report.failed_groups, 0);
        assert!((0.0..=1.0).contains(&report.metrics.map));
        assert!((0.0..=1.0).contains(&report.metrics.ndcg));
    }
}
