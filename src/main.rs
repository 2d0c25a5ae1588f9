//! lol-ingest main entry point
//!
//! This is the command-line interface for the League of Legends data
//! ingestion pipelines.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use lol_ingest::config::{load_config_with_hash, Config};
use lol_ingest::crawler::{run_all, run_pipeline, CrawlReport, Pipeline};
use lol_ingest::output::{load_statistics, print_statistics, RunLog};
use lol_ingest::{ApiContext, Archive, Credentials, FileStateStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// lol-ingest: resumable ingestion of League of Legends data
///
/// Pulls esports schedules, live-stats telemetry, ranked-ladder matches and
/// player profiles into an on-disk archive. Every run only fetches what
/// earlier runs have not archived yet.
#[derive(Parser, Debug)]
#[command(name = "lol-ingest")]
#[command(version)]
#[command(about = "Resumable League of Legends data ingestion", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Pipeline to run
    #[arg(value_enum, value_name = "TASK")]
    task: Task,

    /// Override the data directory (archive and logs)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Override the meta directory (state documents)
    #[arg(long, value_name = "DIR")]
    meta_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would run without touching the network
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show per-pipeline statistics from the state documents and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Task {
    /// League schedules and event details
    Esports,
    /// Ranked-ladder matches
    Ranked,
    /// Player profiles, matches and ranked entries
    Players,
    /// Live-stats telemetry for esports games
    Livestats,
    /// esports, then livestats, then players
    All,
}

impl Task {
    fn pipeline(&self) -> Option<Pipeline> {
        match self {
            Self::Esports => Some(Pipeline::Esports),
            Self::Ranked => Some(Pipeline::Ranked),
            Self::Players => Some(Pipeline::Players),
            Self::Livestats => Some(Pipeline::LiveStats),
            Self::All => None,
        }
    }

    /// Every pipeline the task runs, in order
    fn pipelines(&self) -> Vec<Pipeline> {
        match self.pipeline() {
            Some(pipeline) => vec![pipeline],
            None => vec![Pipeline::Esports, Pipeline::LiveStats, Pipeline::Players],
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, cli.data_dir.as_deref(), cli.meta_dir.as_deref());

    if cli.dry_run {
        handle_dry_run(&config, cli.task);
        return Ok(());
    }

    let archive = Archive::new(&config.output.data_dir, &config.output.meta_dir);
    let store = FileStateStore::new(&config.output.meta_dir);

    if cli.stats {
        let stats = load_statistics(&store).context("Failed to read state documents")?;
        print_statistics(&stats);
        return Ok(());
    }

    let context = ApiContext::new(&config, Credentials::from_env())
        .context("Failed to initialise API clients")?;

    for pipeline in cli.task.pipelines() {
        RunLog::new(&archive.logs_dir(), pipeline).run_started(&config_hash);
    }

    tokio::select! {
        result = handle_run(cli.task, &context, &store, &archive) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; progress up to the last commit is kept");
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lol_ingest=info,warn"),
            1 => EnvFilter::new("lol_ingest=debug,info"),
            2 => EnvFilter::new("lol_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// `--data-dir` alone moves the meta directory along with it
fn apply_overrides(config: &mut Config, data_dir: Option<&Path>, meta_dir: Option<&Path>) {
    if let Some(data_dir) = data_dir {
        config.output.data_dir = data_dir.display().to_string();
        if meta_dir.is_none() {
            config.output.meta_dir = data_dir.join("meta").display().to_string();
        }
    }
    if let Some(meta_dir) = meta_dir {
        config.output.meta_dir = meta_dir.display().to_string();
    }
}

/// Handles the --dry-run mode: shows what a run would do
fn handle_dry_run(config: &Config, task: Task) {
    println!("=== lol-ingest Dry Run ===\n");

    println!("Task: {:?}", task);
    println!("\nOutput:");
    println!("  Data directory: {}", config.output.data_dir);
    println!("  Meta directory: {}", config.output.meta_dir);

    println!("\nHTTP:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Max retries: {}", config.http.max_retries);
    println!("  Backoff base: {}", config.http.backoff_base);

    println!("\nRiot ({} / {}):", config.riot.platform, config.riot.region);
    println!("  Seed tiers: {:?}", config.riot.seed_leagues);
    println!("  Seed riot ids: {}", config.riot.seed_riot_ids.len());
    println!("  Seed puuids: {}", config.riot.seed_puuids.len());
    println!("  Seed summoner names: {}", config.riot.seed_summoner_names.len());
    println!("  Matches per seed: {}", config.riot.matches_per_seed);
    println!(
        "  Rate: {} req/s, burst {}",
        config.riot.requests_per_second, config.riot.burst
    );

    println!("\nEsports:");
    println!("  League ids: {:?}", config.esports.leagues);
    println!("  League slugs: {:?}", config.esports.league_slugs);
    println!("  Recent days: {:?}", config.esports.recent_days);

    println!("\nLive stats:");
    println!("  League slugs: {:?}", config.livestats.league_slugs);
    println!("  Skip empty: {}", config.livestats.skip_empty);

    let credentials = Credentials::from_env();
    println!("\nCredentials:");
    println!("  {}: {}", Credentials::RIOT_ENV, set_or_missing(credentials.riot().is_ok()));
    println!(
        "  {}: {}",
        Credentials::ESPORTS_ENV,
        set_or_missing(credentials.esports().is_ok())
    );

    println!("\n✓ Configuration is valid");
}

fn set_or_missing(set: bool) -> &'static str {
    if set {
        "set"
    } else {
        "missing"
    }
}

/// Handles the main ingestion run
async fn handle_run(
    task: Task,
    context: &ApiContext,
    store: &FileStateStore,
    archive: &Archive,
) -> anyhow::Result<()> {
    let reports: Vec<CrawlReport> = match task.pipeline() {
        Some(pipeline) => vec![run_pipeline(pipeline, context, store, archive, &[])
            .await
            .with_context(|| format!("{} pipeline failed", pipeline))?],
        None => run_all(context, store, archive)
            .await
            .context("Ingestion failed")?,
    };

    for report in &reports {
        println!("{}", report);
    }
    Ok(())
}
