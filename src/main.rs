// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use pattern_sync::utils::logging::{format_info, format_step, format_success, format_warning};
use pattern_sync::{
    ArtifactGenerator, Config, HealthCheck, HealthReport, PayloadDefaults, QdrantClient,
    RecordStore, RunSummary, SchemaManager, SyncError, SyncRunner, Validator, build_embedder,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pattern_sync")]
#[command(author = "cipher")]
#[command(version)]
#[command(
    about = "Sync a folder of markdown prompts into Qdrant and regenerate espanso matches",
    long_about = None
)]
struct Cli {
    /// Configuration file; defaults to config/default.toml when present
    #[arg(short, long, value_name = "FILE", env = "PATTERN_SYNC_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the source folder, update the store and regenerate artifacts
    #[command(alias = "run")]
    Sync {
        #[arg(short, long, value_name = "DIR")]
        source: Option<PathBuf>,

        #[arg(long, value_name = "DIR")]
        match_dir: Option<PathBuf>,

        #[arg(long, value_name = "DIR")]
        template_dir: Option<PathBuf>,

        #[arg(long)]
        collection: Option<String>,

        #[arg(long, value_name = "N")]
        depth: Option<usize>,

        #[arg(long)]
        no_progress: bool,
    },

    /// Search stored prompts by semantic similarity
    Search {
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Check the collection and stored payloads
    Verify {
        /// Fill missing payload fields with defaults
        #[arg(long)]
        repair: bool,
    },

    Stats,

    /// Drop and recreate the collection
    Reset {
        #[arg(long)]
        confirm: bool,
    },
}

/// Exit status for a failed command: 2 when the run was aborted by a fatal
/// error (store unreachable, bad configuration or input), 1 otherwise.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SyncError>() {
        Some(e) if e.is_fatal() => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    pattern_sync::utils::logging::init_logger(cli.color, cli.verbose);
    colored::control::set_override(cli.color);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::load(Some(path.as_path())).context("Failed to load configuration")?
        }
        None => Config::load(None).context("Failed to load configuration")?,
    };

    match cli.command {
        Commands::Sync {
            source,
            match_dir,
            template_dir,
            collection,
            depth,
            no_progress,
        } => {
            if let Some(source) = source {
                config.source.root = source;
            }
            if let Some(match_dir) = match_dir {
                config.output.match_dir = match_dir;
            }
            if template_dir.is_some() {
                config.output.template_dir = template_dir;
            }
            if let Some(collection) = collection {
                config.store.collection = collection;
            }
            if let Some(depth) = depth {
                config.source.max_depth = depth;
            }
            config.validate().context("Invalid configuration")?;
            cmd_sync(config, !no_progress, cli.color).await
        }
        Commands::Search { query, limit } => cmd_search(&config, &query, limit).await,
        Commands::Verify { repair } => cmd_verify(config, repair).await,
        Commands::Stats => cmd_stats(&config).await,
        Commands::Reset { confirm } => cmd_reset(&config, confirm).await,
    }
}

async fn cmd_sync(config: Config, show_progress: bool, colored: bool) -> Result<()> {
    println!(
        "{}",
        format_step(1, 2, &format!("Syncing {}", config.source.root.display()))
    );

    let runner = SyncRunner::new(config).with_progress(show_progress, colored);
    let summary = runner.run().await.context("Synchronization failed")?;

    println!("{}", format_step(2, 2, "Artifacts regenerated"));
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{}",
        format_success(&format!(
            "{} documents scanned: {} new, {} modified, {} deleted, {} skipped ({:.2}s)",
            summary.scanned,
            summary.new_count(),
            summary.modified_count(),
            summary.deleted_count(),
            summary.skipped_count(),
            summary.duration.as_secs_f64()
        ))
    );

    for failure in &summary.scan_failures {
        println!("{}", format_warning(&format!("{}: {}", failure.kind(), failure)));
    }
    for skipped in &summary.report.skipped_with_reason {
        println!(
            "{}",
            format_warning(&format!(
                "{} ({}): {}",
                skipped.filename,
                skipped.kind,
                skipped.reason
            ))
        );
    }
    for group in &summary.changes.duplicates {
        println!(
            "{}",
            format_warning(&format!(
                "{} is stored {} times, using point {}",
                group.filename,
                group.ignored.len() + 1,
                group.kept
            ))
        );
    }

    println!(
        "{}",
        format_info(&format!(
            "Match file: {} ({} entries)",
            summary.artifacts.match_file.display(),
            summary.artifacts.match_entries
        ))
    );
    if let Some(dir) = &summary.artifacts.template_dir {
        println!(
            "{}",
            format_info(&format!(
                "Templates: {} ({} files)",
                dir.display(),
                summary.artifacts.templates_written
            ))
        );
    }
}

async fn cmd_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    info!("Searching for: {}", query);

    let embedder = build_embedder(&config.embedding)?;
    let client = QdrantClient::connect(config.store.clone())
        .await
        .context("Failed to connect to the vector store")?;

    let vector = embedder
        .embed(query)
        .await
        .context("Failed to embed the query")?;
    let results = client
        .search(&vector, limit)
        .await
        .context("Vector search failed")?;

    if results.is_empty() {
        println!("\nNo results found for query: \"{}\"\n", query);
        println!("Try:");
        println!("  - Using different search terms");
        println!("  - Checking that the source folder has been synced");
        return Ok(());
    }

    println!("\nSearch Results for: \"{}\"\n", query);
    println!("Found {} result(s)\n", results.len());
    println!("{}", "=".repeat(80));

    for (idx, result) in results.iter().enumerate() {
        println!("\n{}. {} (Score: {:.4})", idx + 1, result.filename(), result.score);
        if let Some(trigger) = &result.payload.trigger {
            println!("   Trigger: {}", trigger);
        }
        println!("   Preview:");
        for line in result.preview(5) {
            println!("     {}", Validator::truncate_text(line, 100));
        }
    }

    println!("\n{}", "=".repeat(80));
    Ok(())
}

async fn cmd_verify(config: Config, repair: bool) -> Result<()> {
    info!("Verifying vector store");

    let started = Instant::now();
    let client = QdrantClient::connect(config.store.clone())
        .await
        .context("Failed to connect to the vector store")?;
    let mut checks = vec![HealthCheck::healthy("connection", started.elapsed())];

    let started = Instant::now();
    if !SchemaManager::new(&client).verify_schema().await? {
        checks.push(HealthCheck::unhealthy(
            "collection",
            format!("{} does not exist; run sync to create it", config.store.collection),
            started.elapsed(),
        ));
        let report = HealthReport::new(checks, env!("CARGO_PKG_VERSION"));
        println!("{}", report.format());
        anyhow::bail!("collection {} is missing", config.store.collection);
    }
    checks.push(HealthCheck::healthy("collection", started.elapsed()));

    let runner = SyncRunner::new(config);
    let (report, repair_report) = runner.verify(&client, repair).await?;
    checks.extend(report.checks);
    let report = HealthReport::new(checks, env!("CARGO_PKG_VERSION"));

    println!("{}", report.format());
    if let Some(repair_report) = repair_report {
        println!(
            "{}",
            format_success(&format!(
                "Repaired {} of {} points",
                repair_report.repaired.len(),
                repair_report.checked
            ))
        );
        if !repair_report.repaired.is_empty() {
            regenerate_if_possible(&runner, &client).await;
        }
    }

    if report.is_healthy() {
        Ok(())
    } else {
        anyhow::bail!("store verification reported {:?}", report.overall_status)
    }
}

async fn cmd_stats(config: &Config) -> Result<()> {
    info!("Gathering statistics");

    let client = QdrantClient::connect(config.store.clone())
        .await
        .context("Failed to connect to the vector store")?;

    let info = client.collection_info().await?;
    let records = client.list_records().await?;
    let mut filenames = HashSet::new();
    let duplicates = records
        .iter()
        .filter_map(|r| r.filename())
        .filter(|name| !filenames.insert(*name))
        .count();

    println!("Collection: {}", config.store.collection);
    println!("Status: {}", info.status.as_deref().unwrap_or("unknown"));
    println!("Points: {}", info.points_count.unwrap_or(records.len() as u64));
    println!("Distinct filenames: {}", filenames.len());
    println!("Duplicate points: {}", duplicates);
    if let Some(size) = info.vector_size(client.vector_name()) {
        println!("Vector size: {}", size);
    }

    Ok(())
}

async fn cmd_reset(config: &Config, confirm: bool) -> Result<()> {
    if !confirm {
        println!(
            "{}",
            format_warning("This will delete every stored point. Use --confirm to proceed")
        );
        return Ok(());
    }

    warn!("Resetting collection {} - all points will be lost", config.store.collection);

    let embedder = build_embedder(&config.embedding)?;
    let client = QdrantClient::connect(config.store.clone())
        .await
        .context("Failed to connect to the vector store")?;

    let schema_manager = SchemaManager::new(&client);
    schema_manager
        .drop_collection()
        .await
        .context("Failed to drop collection")?;
    schema_manager
        .initialize(embedder.dimensions())
        .await
        .context("Failed to recreate collection")?;

    println!("{}", format_success("Collection recreated"));
    regenerate_if_possible(&SyncRunner::new(config.clone()), &client).await;
    Ok(())
}

/// Keeps artifacts in line with the store after maintenance commands.
async fn regenerate_if_possible(runner: &SyncRunner, store: &dyn RecordStore) {
    let config = runner.config();
    let generator = ArtifactGenerator::new(
        config.output.clone(),
        PayloadDefaults::new(config.source.default_trigger.clone()),
    );

    match generator.regenerate(store).await {
        Ok(report) => println!(
            "{}",
            format_info(&format!(
                "Regenerated {} ({} entries)",
                report.match_file.display(),
                report.match_entries
            ))
        ),
        Err(e) => println!(
            "{}",
            format_warning(&format!("Artifacts not regenerated: {}", e))
        ),
    }
}
