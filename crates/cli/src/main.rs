use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::InteractionLog;
use server::{
    IndexMapping, Recommendation, RecommendationService, ServerConfig, ServiceConfig, UserKey,
    config::{DEFAULT_HOST, DEFAULT_LIMIT, DEFAULT_PORT},
};
use similarity::{ModelArtifact, store};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Affinity - user similarity recommendation engine
#[derive(Parser)]
#[command(name = "affinity")]
#[command(about = "Recommends similar users from views, purchases and ratings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a similarity model from an interaction export
    Train {
        /// Interaction export (views, purchases, ratings)
        #[arg(short, long, default_value = "userData.json")]
        input: PathBuf,

        /// Where to write the trained model
        #[arg(short, long, default_value = "recommendation_model.bin")]
        output: PathBuf,
    },

    /// Get the most similar users for a user
    Recommend {
        /// Trained model file
        #[arg(long, default_value = "recommendation_model.bin")]
        model: PathBuf,

        /// User id (or row index with --cast-index)
        #[arg(long)]
        user_id: String,

        /// Number of recommendations to return
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Show user ids and similarity scores
        #[arg(long)]
        explain: bool,

        /// Treat the user id as a row index
        #[arg(long)]
        cast_index: bool,

        /// Allow the user to appear in their own results
        #[arg(long)]
        include_self: bool,
    },

    /// Serve recommendations over HTTP
    Serve {
        /// Trained model file
        #[arg(long, default_value = "recommendation_model.bin")]
        model: PathBuf,

        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Treat request user ids as row indices
        #[arg(long)]
        cast_index: bool,

        /// Allow the user to appear in their own results
        #[arg(long)]
        include_self: bool,

        /// Limit used when a request names none
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        default_limit: usize,
    },

    /// Run benchmark to test query performance
    Benchmark {
        /// Trained model file
        #[arg(long, default_value = "recommendation_model.bin")]
        model: PathBuf,

        /// Number of requests to make
        #[arg(long, default_value = "1000")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
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

    match cli.command {
        Commands::Train { input, output } => handle_train(&input, &output)?,
        Commands::Recommend {
            model,
            user_id,
            limit,
            explain,
            cast_index,
            include_self,
        } => {
            let config = service_config(cast_index, include_self, DEFAULT_LIMIT);
            handle_recommend(&model, config, user_id, limit, explain)?
        }
        Commands::Serve {
            model,
            host,
            port,
            cast_index,
            include_self,
            default_limit,
        } => {
            let config = service_config(cast_index, include_self, default_limit);
            handle_serve(&model, config, ServerConfig::new(host, port)).await?
        }
        Commands::Benchmark {
            model,
            requests,
            concurrent,
        } => handle_benchmark(&model, requests, concurrent).await?,
    }

    Ok(())
}

fn service_config(cast_index: bool, include_self: bool, default_limit: usize) -> ServiceConfig {
    let mapping = if cast_index {
        IndexMapping::Cast
    } else {
        IndexMapping::Lookup
    };
    ServiceConfig::new()
        .with_index_mapping(mapping)
        .with_include_self(include_self)
        .with_default_limit(default_limit)
}

/// Load a trained model, reporting how long it took
fn load_model(path: &Path) -> Result<Arc<ModelArtifact>> {
    println!("Loading model from {}...", path.display());
    let start = Instant::now();
    let artifact = store::load(path)
        .with_context(|| format!("Failed to load model from {}", path.display()))?;
    println!(
        "{} Loaded {} users in {:?}",
        "✓".green(),
        artifact.user_count(),
        start.elapsed()
    );
    Ok(Arc::new(artifact))
}

/// Handle the 'train' command
fn handle_train(input: &Path, output: &Path) -> Result<()> {
    println!("Loading interactions from {}...", input.display());
    let log = InteractionLog::load_from_file(input)
        .with_context(|| format!("Failed to load interactions from {}", input.display()))?;

    let (views, purchases, ratings) = log.counts();
    println!(
        "{} {} views, {} purchases, {} ratings",
        "✓".green(),
        views,
        purchases,
        ratings
    );

    let artifact = similarity::train(&log).context("Failed to train model")?;
    store::save(&artifact, output)
        .with_context(|| format!("Failed to save model to {}", output.display()))?;

    println!("{}", "Model trained and saved successfully.".green().bold());
    Ok(())
}

/// Handle the 'recommend' command
fn handle_recommend(
    model: &Path,
    config: ServiceConfig,
    user_id: String,
    limit: usize,
    explain: bool,
) -> Result<()> {
    let service = RecommendationService::new(load_model(model)?, config);
    let key = UserKey::Id(user_id);

    let recommendations = service
        .recommend_detailed(&key, Some(limit))
        .with_context(|| format!("Failed to recommend for user {}", key))?;

    print_recommendations(&key, &recommendations, explain);
    Ok(())
}

/// Handle the 'serve' command
async fn handle_serve(model: &Path, config: ServiceConfig, listen: ServerConfig) -> Result<()> {
    let service = RecommendationService::new(load_model(model)?, config);

    println!();
    println!(
        "{}",
        format!("Server listening on http://{}", listen.address())
            .green()
            .bold()
    );
    println!("{}", "Endpoints:".cyan());
    println!("  POST /recommend  - Similar users for {{\"user_id\": ...}}");
    println!("  GET  /health     - Health check");
    println!("{}", "Press Ctrl+C to stop".dimmed());

    server::serve(&listen, service).await
}

/// Handle the 'benchmark' command
async fn handle_benchmark(model: &Path, requests: usize, concurrent: usize) -> Result<()> {
    let artifact = load_model(model)?;
    let user_count = artifact.user_count();
    anyhow::ensure!(user_count > 0, "Model has no users to query");

    let service = RecommendationService::new(artifact, ServiceConfig::default());
    let permits = Arc::new(Semaphore::new(concurrent.max(1)));

    // Random users drawn from the model's own ids
    let keys: Vec<UserKey> = (0..requests)
        .map(|_| {
            let row = rand::random::<u32>() as usize % user_count;
            UserKey::Id(service.model().users()[row].to_string())
        })
        .collect();

    let wall = Instant::now();
    let mut handles = Vec::with_capacity(requests);
    for key in keys {
        let service = service.clone();
        let permits = Arc::clone(&permits);
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let start = Instant::now();
            service.recommend(&key, None)?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings = Vec::with_capacity(requests);
    for handle in handles {
        timings.push(handle.await??);
    }
    let total_time = wall.elapsed();
    timings.sort();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} concurrent)", requests, concurrent);
    println!("Total time: {:?}", total_time);
    if let Some(avg) = average(&timings) {
        println!("Average latency: {:?}", avg);
    }
    for (label, q) in [("P50", 0.50), ("P95", 0.95), ("P99", 0.99)] {
        if let Some(latency) = percentile(&timings, q) {
            println!("{} latency: {:?}", label, latency);
        }
    }
    println!(
        "Throughput: {:.2} requests/second",
        requests as f64 / total_time.as_secs_f64().max(f64::EPSILON)
    );

    Ok(())
}

fn average(timings: &[Duration]) -> Option<Duration> {
    if timings.is_empty() {
        return None;
    }
    Some(timings.iter().sum::<Duration>() / timings.len() as u32)
}

/// Nearest-rank percentile of sorted timings
fn percentile(sorted: &[Duration], q: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((sorted.len() as f64) * q) as usize;
    Some(sorted[rank.min(sorted.len() - 1)])
}

/// Helper function to format and print recommendations
fn print_recommendations(key: &UserKey, recommendations: &[Recommendation], explain: bool) {
    println!("{}", format!("Users similar to {}:", key).bold().blue());
    if recommendations.is_empty() {
        println!("  (no other users in the model)");
        return;
    }

    for (rank, rec) in recommendations.iter().enumerate() {
        if explain {
            println!(
                "{}. row {} (user {}) - Similarity: {:.4}",
                (rank + 1).to_string().green(),
                rec.index,
                rec.user_id,
                rec.score
            );
        } else {
            println!("{}. {}", (rank + 1).to_string().green(), rec.index);
        }
    }
}
