//! End-to-end tests: a data directory on disk, loaded and served by the
//! orchestrator the way the CLI does it.

use data_loader::Dataset;
use pipeline::GroupRating;
use server::{FailureKind, RecommendationOrchestrator, RecommenderConfig};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

fn write_data_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("group-recs-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    let mut movies = String::new();
    let mut embeddings = String::new();
    for i in 1..=30u32 {
        writeln!(movies, "{}::Film {} ({})::Drama", i, i, 1970 + i).unwrap();
        let angle = i as f32 * 0.2;
        writeln!(embeddings, "{}::{},{},{}", i, angle.cos(), angle.sin(), (i % 4) as f32).unwrap();
    }

    let mut ratings = String::new();
    for user_id in 1..=40u32 {
        for movie_id in 1..=30u32 {
            if (user_id * 7 + movie_id * 3) % 5 < 2 {
                let rating = 1 + (user_id + 2 * movie_id) % 5;
                writeln!(ratings, "{}::{}::{}::97830{}", user_id, movie_id, rating, movie_id).unwrap();
            }
        }
    }

    fs::write(dir.join("movies.dat"), movies).unwrap();
    fs::write(dir.join("embeddings.dat"), embeddings).unwrap();
    fs::write(dir.join("ratings.dat"), ratings).unwrap();
    dir
}

fn orchestrator(name: &str) -> (RecommendationOrchestrator, PathBuf) {
    let dir = write_data_dir(name);
    let dataset = Dataset::load_from_dir(&dir).unwrap();
    (
        RecommendationOrchestrator::from_dataset(dataset, RecommenderConfig::default().with_seed(11)),
        dir,
    )
}

#[test]
fn test_large_group_is_reproducible_and_excludes_rated() {
    let (orchestrator, dir) = orchestrator("large");

    let mut rows = Vec::new();
    for user in ["ana", "ben", "cy", "dee", "eli"] {
        for film in 1..=5 {
            rows.push(GroupRating::new(user, format!("Film {} ({})", film, 1970 + film), 5));
        }
    }

    let first = orchestrator.make_recommendation(&rows).unwrap();
    let second = orchestrator.make_recommendation(&rows).unwrap();

    assert_eq!(first.len(), 10);
    assert!(first.iter().all(|m| m.id > 5));
    assert_eq!(first, second);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_small_group_from_disk() {
    let (orchestrator, dir) = orchestrator("small");

    let rows = vec![
        GroupRating::new("ana", "Film 3 (1973)", 5),
        GroupRating::new("ana", "Film 20 (1990)", 1),
        GroupRating::new("ben", "Film 4 (1974)", 4),
    ];
    let movies = orchestrator.make_recommendation(&rows).unwrap();

    assert_eq!(movies.len(), 10);
    assert!(movies.iter().all(|m| ![3, 4, 20].contains(&m.id)));
    assert!(movies.iter().all(|m| m.embedding.is_some()));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_unknown_title_from_collector() {
    let (orchestrator, dir) = orchestrator("unknown");

    let err = orchestrator
        .make_recommendation(&[GroupRating::new("ana", "Film 3", 5)])
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::SchemaMismatch);

    let _ = fs::remove_dir_all(&dir);
}
