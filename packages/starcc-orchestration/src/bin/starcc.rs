/*
 * starcc - connected components by star contraction
 *
 * Usage:
 *   starcc run <input> <output> [--config F] [--partitions N] [--max-rounds N]
 *                               [--format adjacency|clique] [--no-combiner]
 *                               [--no-finish] [--report F]
 *   starcc check <clusters-dir>
 *   starcc translate <pair2text|text2pair|cluster2text|text2cluster> <input> <output>
 *   starcc show <clusters-dir> [--limit N]
 *
 * `run` exits 0 when the contraction converged (or hit the round cap) and
 * every node landed in exactly one cluster, 1 otherwise.
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use starcc_orchestration::{
    translate, Clusters, CombinerConfig, InputFormat, PipelineConfig, PipelineOrchestrator,
    PipelineReport, TranslationKind,
};
use starcc_storage::{FsRecordStore, RecordPath};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "starcc", version, about = "Connected components by star contraction")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the connected components of a graph
    Run {
        /// Text input (file or directory of part files)
        input: String,
        /// Cluster output directory (must not exist)
        output: String,
        /// YAML pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Reduce partitions per job
        #[arg(short, long)]
        partitions: Option<usize>,
        /// Round cap (even, counts single rounds)
        #[arg(long)]
        max_rounds: Option<usize>,
        /// Skip format detection
        #[arg(short, long)]
        format: Option<InputFormat>,
        /// Disable map-side deduplication
        #[arg(long)]
        no_combiner: bool,
        /// Keep part files instead of renumbering clusters
        #[arg(long)]
        no_finish: bool,
        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Verify that no node appears in more than one cluster
    Check {
        clusters: String,
    },
    /// Convert between binary record sets and text
    Translate {
        kind: TranslationKind,
        input: String,
        output: String,
    },
    /// Print clusters
    Show {
        clusters: String,
        /// Print at most N clusters
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether the command succeeded.
async fn dispatch(command: Commands) -> Result<bool> {
    let store = Arc::new(FsRecordStore::new());

    match command {
        Commands::Run {
            input,
            output,
            config,
            partitions,
            max_rounds,
            format,
            no_combiner,
            no_finish,
            report,
        } => {
            let mut config = match config {
                Some(path) => {
                    let path = path.to_string_lossy();
                    PipelineConfig::from_yaml(&path)
                        .with_context(|| format!("Failed to load config {}", path))?
                }
                None => PipelineConfig::default(),
            };
            if let Some(partitions) = partitions {
                config.partitions = partitions;
            }
            if let Some(max_rounds) = max_rounds {
                config.max_rounds = max_rounds;
            }
            if format.is_some() {
                config.input_format = format;
            }
            if no_combiner {
                config.combiner = CombinerConfig::disabled();
            }
            if no_finish {
                config.finish = false;
            }

            let orchestrator = PipelineOrchestrator::new(store, config)?;
            let result = orchestrator
                .run(&RecordPath::new(input), &RecordPath::new(output))
                .await?;
            print_report(&result);

            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&result)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
            }
            Ok(result.is_success())
        }

        Commands::Check { clusters } => {
            let orchestrator = PipelineOrchestrator::new(store, PipelineConfig::default())?;
            let report = orchestrator.check(&RecordPath::new(clusters)).await?;
            println!(
                "Checked {} nodes: {} in more than one cluster",
                report.checked_nodes, report.num_errors
            );
            Ok(report.ok)
        }

        Commands::Translate {
            kind,
            input,
            output,
        } => {
            let count = translate(
                store.as_ref(),
                kind,
                &RecordPath::new(input),
                &RecordPath::new(output),
            )
            .await?;
            println!("{} records written", count);
            Ok(true)
        }

        Commands::Show { clusters, limit } => {
            let clusters = Clusters::load(store.as_ref(), &RecordPath::new(clusters)).await?;
            let shown = limit.unwrap_or(clusters.len());
            for (i, cluster) in clusters.iter().take(shown).enumerate() {
                let members: Vec<String> = cluster.members.iter().map(|m| m.to_string()).collect();
                println!("Cluster[{}] = {{ {} }}", i, members.join(","));
            }
            if clusters.len() > shown {
                println!("... {} more", clusters.len() - shown);
            }
            Ok(true)
        }
    }
}

fn print_report(report: &PipelineReport) {
    println!("Input format:     {}", report.input_format);
    println!("Initial nodes:    {}", report.initial_nodes);
    println!("Initial cliques:  {}", report.initial_cliques);
    println!("Final nodes:      {}", report.final_nodes);
    println!("Final clusters:   {}", report.final_clusters);
    println!(
        "Rounds:           {} ({})",
        report.rounds,
        report.controller.state_name()
    );
    println!("Partition ok:     {}", report.partition_ok);
    if !report.partition_ok {
        println!("Partition errors: {}", report.num_errors);
    }
    println!("Duration:         {}ms", report.duration_ms);
}
