//! LatencyLab command-line interface
//!
//! `latencylab simulate` loads a model JSON file, runs the batch, and writes
//! the summary/runs/trace artifacts.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use latencylab::model::{validate, Model};
use latencylab::output::{write_runs_csv, write_summary_json, write_trace_csv};
use latencylab::{aggregate_runs, run_many, RunOptions, V1Numerics};

#[derive(Parser)]
#[command(name = "latencylab")]
#[command(about = "Design-time latency exploration for event-driven systems")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run simulations for a model
    Simulate {
        /// Model JSON file
        #[arg(long)]
        model: PathBuf,

        /// Number of independent runs
        #[arg(long)]
        runs: u32,

        /// Master seed; per-run seeds are mixed from it
        #[arg(long)]
        seed: u64,

        /// Output path for summary.json
        #[arg(long)]
        out_summary: PathBuf,

        /// Output path for runs.csv
        #[arg(long)]
        out_runs: PathBuf,

        /// Output path for trace.csv (traces are only collected when set)
        #[arg(long)]
        out_trace: Option<PathBuf>,

        /// Safety limit to prevent infinite runs in cyclic models
        #[arg(long, default_value_t = 200_000)]
        max_tasks_per_run: usize,

        /// Cap on worker threads (default: one per core)
        #[arg(long)]
        max_parallelism: Option<u32>,

        /// Run schema-v1 models with portable numerics (not byte-compatible
        /// with the original v1 outputs)
        #[arg(long)]
        portable_v1: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Simulate {
            model,
            runs,
            seed,
            out_summary,
            out_runs,
            out_trace,
            max_tasks_per_run,
            max_parallelism,
            portable_v1,
        } => {
            let text = std::fs::read_to_string(&model)?;
            let model = Model::from_json(&text)?;
            validate(&model)?;

            let opts = RunOptions {
                collect_traces: out_trace.is_some(),
                max_parallelism,
                max_tasks_per_run,
                v1_numerics: if portable_v1 {
                    V1Numerics::Portable
                } else {
                    V1Numerics::Strict
                },
                ..RunOptions::default()
            };
            let results = run_many(&model, runs, seed, &opts)?;

            let summary = aggregate_runs(&model, &results);
            write_summary_json(&out_summary, &summary)?;
            write_runs_csv(&out_runs, &results)?;
            if let Some(trace_path) = &out_trace {
                write_trace_csv(trace_path, &results)?;
            }

            info!(
                runs = results.len(),
                summary = %out_summary.display(),
                "simulation finished"
            );
            Ok(())
        }
    }
}
