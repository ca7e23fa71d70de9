//! SurtCat CLI - Watershed accumulation over zoned drainage networks

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use surtcat_algorithms::accumulation::AccumKind;
use surtcat_algorithms::network::zone_dependencies;
use surtcat_algorithms::pipeline::{IndexSummary, MetricSource, ZonePipeline};
use surtcat_core::io::load_binary;
use surtcat_core::{ClosureIndex, RunConfig};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "surtcat")]
#[command(author, version, about = "Upstream accumulation of catchment metrics", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Run configuration (TOML)
    #[arg(short, long, global = true, default_value = "surtcat.toml")]
    config: PathBuf,

    /// Worker threads (overrides the configuration; 1 = sequential)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or load) the closure indexes of every configured zone
    Index {
        /// Only this zone
        #[arg(short, long)]
        zone: Option<String>,
    },
    /// Accumulate a metric table family into Ws and UpCat tables
    Accumulate {
        /// Metric name; inputs are read from `{input_dir}/{metric}_{zone}.csv`
        #[arg(short, long)]
        metric: String,
        /// Directory holding the catchment metric tables
        #[arg(short, long)]
        input_dir: PathBuf,
        /// Metric kind: categorical, continuous, count
        #[arg(short, long, default_value = "continuous")]
        kind: String,
        /// Only this zone (its upstream connectors must already exist)
        #[arg(short, long)]
        zone: Option<String>,
    },
    /// Show information about a persisted closure index
    Info {
        /// Index file
        input: PathBuf,
    },
    /// Print the zone processing order
    Order,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: &Path, threads: Option<usize>) -> Result<RunConfig> {
    let mut config = RunConfig::load(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    if threads.is_some() {
        config.threads = threads;
    }
    info!("Configuration: {} zones", config.zones.len());
    Ok(config)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_index_info(path: &Path, index: &ClosureIndex) {
    let longest = index.lengths.iter().copied().max().unwrap_or(0);
    let mean = if index.is_empty() {
        0.0
    } else {
        index.flat_upstream.len() as f64 / index.len() as f64
    };
    let headwaters = index.lengths.iter().filter(|&&l| l <= 1).count();

    println!("File: {}", path.display());
    println!("Zone: {}", index.zone);
    println!("Scope: {} ({})", index.scope, index.scope.prefix());
    println!("Query COMIDs: {}", index.len());
    println!("Upstream entries: {}", index.flat_upstream.len());
    println!("\nClosure sizes:");
    println!("  Max:  {}", longest);
    println!("  Mean: {:.2}", mean);
    println!("  Size <= 1: {}", headwaters);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading index...");
            let index: ClosureIndex = load_binary(&input).context("Failed to read closure index")?;
            pb.finish_and_clear();
            index.validate().context("Closure index is inconsistent")?;
            print_index_info(&input, &index);
        }

        // ── Order ────────────────────────────────────────────────────
        Commands::Order => {
            let config = load_config(&cli.config, cli.threads)?;
            let pipeline = ZonePipeline::new(&config).context("Failed to read InterVPU table")?;
            let order = pipeline.order().context("Cannot order zones")?;
            for (i, zone) in order.zones().iter().enumerate() {
                println!("{:>3}. {}", i + 1, zone);
            }
            let deps = zone_dependencies(&config.zone_names(), pipeline.intervpu());
            if !deps.is_empty() {
                println!("\nDependencies:");
                for (before, after) in deps {
                    println!("  {} -> {}", before, after);
                }
            }
        }

        // ── Index ────────────────────────────────────────────────────
        Commands::Index { zone } => {
            let config = load_config(&cli.config, cli.threads)?;
            let pipeline = ZonePipeline::new(&config).context("Failed to read InterVPU table")?;
            let start = Instant::now();

            let summaries = match zone {
                Some(zone) => {
                    let pb = spinner(&format!("Indexing zone {}...", zone));
                    let indexes = pipeline
                        .ensure_indexes(&zone)
                        .with_context(|| format!("Failed to index zone {}", zone))?;
                    pb.finish_and_clear();
                    vec![IndexSummary {
                        ids: indexes.inclusive.len(),
                        ws_entries: indexes.inclusive.flat_upstream.len(),
                        upcat_entries: indexes.exclusive.flat_upstream.len(),
                        zone,
                    }]
                }
                None => {
                    let pb = spinner("Indexing zones...");
                    let summaries = pipeline.index_all().context("Failed to build closure indexes")?;
                    pb.finish_and_clear();
                    summaries
                }
            };
            for s in &summaries {
                println!(
                    "Zone {}: {} COMIDs, {} Ws / {} UpCat entries",
                    s.zone, s.ids, s.ws_entries, s.upcat_entries
                );
            }
            done("Closure indexes", &config.index_dir, start.elapsed());
        }

        // ── Accumulate ───────────────────────────────────────────────
        Commands::Accumulate {
            metric,
            input_dir,
            kind,
            zone,
        } => {
            let kind: AccumKind = kind.parse().context("Invalid metric kind")?;
            let config = load_config(&cli.config, cli.threads)?;
            let pipeline = ZonePipeline::new(&config).context("Failed to read InterVPU table")?;
            let source = MetricSource::new(metric, input_dir, kind);
            let start = Instant::now();

            let outputs = match zone {
                Some(zone) => {
                    let pb = spinner(&format!("Accumulating zone {}...", zone));
                    let out = pipeline
                        .accumulate_zone(&source, &zone)
                        .with_context(|| format!("Failed to accumulate zone {}", zone))?;
                    pb.finish_and_clear();
                    vec![out]
                }
                None => {
                    let pb = spinner(&format!("Accumulating {}...", source.name));
                    let outs = pipeline.run(&source).context("Accumulation failed")?;
                    pb.finish_and_clear();
                    outs
                }
            };
            for out in &outputs {
                println!("Zone {}: {}, {}", out.zone, out.ws.display(), out.upcat.display());
                if !out.published.is_empty() {
                    println!("  Connectors for: {}", out.published.join(", "));
                }
            }
            done(&format!("{} ({})", source.name, source.kind), &config.output_dir, start.elapsed());
        }
    }

    Ok(())
}
