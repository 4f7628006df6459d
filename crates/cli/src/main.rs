use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{Dataset, Movie, MovieCatalog, UserId};
use evaluation::{GroupEvaluator, split_into_groups};
use pipeline::GroupRating;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use server::{RecommendationOrchestrator, RecommenderConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// group-recs - Movie recommendations for a group watching together
#[derive(Parser)]
#[command(name = "group-recs")]
#[command(about = "Group movie recommender (embeddings for small groups, latent factors for large ones)", long_about = None)]
struct Cli {
    /// Directory holding movies.dat, ratings.dat and optionally embeddings.dat
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend movies for a group from a JSON file of ratings
    Recommend {
        /// JSON array of {"username", "title", "rating"} rows
        #[arg(long)]
        ratings: PathBuf,

        /// Number of recommendations to return
        #[arg(long)]
        limit: Option<usize>,

        /// Seed for latent-factor initialization
        #[arg(long)]
        seed: Option<u64>,

        /// JSON recommender configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Search for movies by title
    Search {
        /// Movie title to search for (case-insensitive substring match)
        #[arg(long)]
        title: String,
    },

    /// Score recommendations against held-out ratings (needs ratings_test.dat)
    Evaluate {
        /// Members per synthetic group
        #[arg(long)]
        group_size: usize,

        /// Evaluate at most this many groups
        #[arg(long)]
        max_groups: Option<usize>,

        /// Seed for splitting users into groups
        #[arg(long, default_value = "0")]
        seed: u64,

        /// JSON recommender configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Members per synthetic group
        #[arg(long, default_value = "3")]
        group_size: usize,

        /// Seed for picking group members
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Loading dataset from {}...", cli.data_dir.display());
    let start = Instant::now();
    let dataset = Dataset::load_from_dir(&cli.data_dir).context("Failed to load dataset")?;
    println!(
        "{} Loaded {} movies and {} ratings in {:?}",
        "✓".green(),
        dataset.catalog.len(),
        dataset.history.len(),
        start.elapsed()
    );

    match cli.command {
        Commands::Recommend {
            ratings,
            limit,
            seed,
            config,
        } => handle_recommend(dataset, &ratings, limit, seed, config.as_deref()).await?,
        Commands::Search { title } => handle_search(&dataset.catalog, &title),
        Commands::Evaluate {
            group_size,
            max_groups,
            seed,
            config,
        } => {
            handle_evaluate(
                dataset,
                &cli.data_dir,
                group_size,
                max_groups,
                seed,
                config.as_deref(),
            )
            .await?
        }
        Commands::Benchmark {
            requests,
            group_size,
            seed,
        } => handle_benchmark(dataset, requests, group_size, seed).await?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RecommenderConfig> {
    match path {
        Some(path) => RecommenderConfig::from_json_file(path),
        None => Ok(RecommenderConfig::default()),
    }
}

/// Handle the 'recommend' command
async fn handle_recommend(
    dataset: Dataset,
    ratings_path: &Path,
    limit: Option<usize>,
    seed: Option<u64>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(limit) = limit {
        config = config.with_top_k(limit);
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    let content = std::fs::read_to_string(ratings_path)
        .with_context(|| format!("Failed to read {}", ratings_path.display()))?;
    let rows: Vec<GroupRating> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid group ratings in {}", ratings_path.display()))?;

    let orchestrator = RecommendationOrchestrator::from_dataset(dataset, config);
    let recommendations = orchestrator
        .recommend_with_timeout(rows, None)
        .await
        .context("Recommendation failed")?;

    if recommendations.is_empty() {
        println!("{}", "The group has already rated every movie in the catalog.".yellow());
        return Ok(());
    }
    print_recommendations(&recommendations);
    Ok(())
}

/// Handle the 'search' command
fn handle_search(catalog: &MovieCatalog, title: &str) {
    let title_lower = title.to_lowercase();

    // (relevance, movie): 0 for an exact match, 1 for a substring match
    let mut matches: Vec<(u8, &Movie)> = catalog
        .movies()
        .iter()
        .filter_map(|movie| {
            let movie_title_lower = movie.title.to_lowercase();
            if movie_title_lower == title_lower {
                Some((0, movie))
            } else if movie_title_lower.contains(&title_lower) {
                Some((1, movie))
            } else {
                None
            }
        })
        .collect();
    // Stable, so catalog order is kept within each relevance tier
    matches.sort_by_key(|(relevance, _)| *relevance);

    println!("{}", format!("Search results for '{}':", title).bold().blue());
    if matches.is_empty() {
        println!("  no matching titles");
    }
    for (_, movie) in matches.iter().take(20) {
        let embedded = if movie.embedding.is_some() { "" } else { " (no embedding)" };
        println!("{}: {}{}", movie.id, movie.title, embedded.dimmed());
    }
}

/// Handle the 'evaluate' command
async fn handle_evaluate(
    dataset: Dataset,
    data_dir: &Path,
    group_size: usize,
    max_groups: Option<usize>,
    seed: u64,
    config_path: Option<&Path>,
) -> Result<()> {
    if group_size == 0 {
        bail!("--group-size must be at least 1");
    }
    let config = load_config(config_path)?;
    let held_out = dataset
        .load_test_ratings(data_dir)
        .context("Failed to load held-out ratings")?;

    let mut groups = split_into_groups(held_out.user_ids(), group_size, seed);
    if let Some(max) = max_groups {
        groups.truncate(max);
    }
    if groups.is_empty() {
        bail!("Not enough held-out users to form a group of {}", group_size);
    }
    info!("Evaluating {} groups of {}", groups.len(), group_size);

    let evaluator = GroupEvaluator::new(
        Arc::new(dataset.catalog),
        Arc::new(dataset.history),
        config,
    );
    let start = Instant::now();
    let report = tokio::task::spawn_blocking(move || evaluator.run(&groups, &held_out)).await?;

    println!("{}", format!("Evaluation (group size {}):", group_size).bold().blue());
    println!("Groups evaluated: {}", report.evaluated_groups);
    if report.failed_groups > 0 {
        println!("Groups failed: {}", report.failed_groups.to_string().red());
    }
    println!("MAP@k: {:.4}", report.metrics.map);
    println!("NDCG@k: {:.4}", report.metrics.ndcg);
    println!("Elapsed: {:?}", start.elapsed());
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    dataset: Dataset,
    requests: usize,
    group_size: usize,
    seed: u64,
) -> Result<()> {
    if requests == 0 || group_size == 0 {
        bail!("--requests and --group-size must be at least 1");
    }
    let user_ids: Vec<UserId> = dataset.history.user_ids().into_iter().collect();
    if user_ids.len() < group_size {
        bail!(
            "History has {} users, fewer than the group size {}",
            user_ids.len(),
            group_size
        );
    }

    let catalog = Arc::new(dataset.catalog);
    let history = Arc::new(dataset.history);
    let sessions = GroupEvaluator::new(catalog.clone(), history.clone(), RecommenderConfig::default());
    let orchestrator = RecommendationOrchestrator::new(catalog, history, RecommenderConfig::default());

    // Each request replays the history of randomly picked users as a new session
    let mut rng = StdRng::seed_from_u64(seed);
    let workloads: Vec<Vec<GroupRating>> = (0..requests)
        .map(|_| {
            let members: Vec<UserId> = user_ids
                .choose_multiple(&mut rng, group_size)
                .copied()
                .collect();
            sessions.session_for(&members)
        })
        .collect();

    let wall_clock = Instant::now();
    let mut handles = Vec::with_capacity(requests);
    for rows in workloads {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            let start = Instant::now();
            orchestrator.recommend_with_timeout(rows, None).await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings: Vec<Duration> = Vec::with_capacity(requests);
    for handle in handles {
        timings.push(handle.await??);
    }
    let total_time = wall_clock.elapsed();

    timings.sort();
    let avg_latency = timings.iter().sum::<Duration>() / timings.len() as u32;
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];
    let throughput = requests as f64 / total_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} (group size {})", requests, group_size);
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Print ranked recommendations, best first
fn print_recommendations(recommendations: &[Movie]) {
    println!("{}", "Group Recommendations:".bold().blue());
    for (idx, movie) in recommendations.iter().enumerate() {
        println!("{}. {}", (idx + 1).to_string().green(), movie.title);
    }
}
