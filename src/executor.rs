//! Batch execution strategy
//!
//! Fans a model out across N independent runs. Engine selection is a small
//! sum type dispatched on the model's schema version: v1 models belong to
//! the legacy engine (a frozen oracle whose RNG stream this build cannot
//! reproduce, see [`V1Numerics`]), v2 models to the extended engine.
//!
//! Runs are embarrassingly parallel: each owns a private RNG seeded from
//! `mix_seed(base_seed, run_index)` and shares only the read-only model, so
//! results are bit-identical at any parallelism level. Cancellation and
//! deadline signals are sampled between runs, never mid-run; a stopped batch
//! hands back the completed subset inside the error.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::{extended, legacy, InvariantViolated, RunConfig};
use crate::instance::RunResult;
use crate::model::{Model, ModelError};
use crate::rng::mix_seed;

/// Which engine a model dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    /// Schema v1: frozen oracle semantics.
    Legacy,
    /// Schema v2+: delayed wiring, single event-queue scheduler.
    Extended,
}

impl ExecutorKind {
    /// Select the engine for a model by schema version.
    pub fn for_model(model: &Model) -> Self {
        if model.schema_version == 1 {
            ExecutorKind::Legacy
        } else {
            ExecutorKind::Extended
        }
    }
}

/// How to treat v1 models, whose original numeric outputs came from an RNG
/// this build does not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum V1Numerics {
    /// Refuse to run v1 models rather than silently substituting a
    /// different RNG stream (the default).
    #[default]
    Strict,

    /// Run v1 models with the legacy scheduling semantics but the portable
    /// RNG. Explicitly not byte-compatible with the frozen oracle.
    Portable,
}

/// Cooperative cancellation signal, checked between runs.
///
/// Clone the token, hand one side to `RunOptions.cancel`, and call
/// [`CancelToken::cancel`] from anywhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Batch execution options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Keep per-instance traces on each `RunResult` (default true).
    pub collect_traces: bool,

    /// Cap on worker threads for the fan-out (default: rayon's global pool).
    pub max_parallelism: Option<u32>,

    /// Wall-clock budget for the whole batch, checked between runs.
    pub deadline_ms: Option<u64>,

    /// Per-run safety cap on task enqueues (default 200,000).
    pub max_tasks_per_run: usize,

    /// v1 model handling (default: refuse, see [`V1Numerics`]).
    pub v1_numerics: V1Numerics,

    /// Record an invariant-violating run as failed instead of aborting the
    /// batch (default false).
    pub tolerate_run_failures: bool,

    /// External cancellation signal (default none).
    pub cancel: Option<CancelToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            collect_traces: true,
            max_parallelism: None,
            deadline_ms: None,
            max_tasks_per_run: 200_000,
            v1_numerics: V1Numerics::default(),
            tolerate_run_failures: false,
            cancel: None,
        }
    }
}

/// Batch failure.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    ModelInvalid(#[from] ModelError),

    #[error("invariant violated in run {run_index}: {message}")]
    InvariantViolated { run_index: u32, message: String },

    #[error("batch cancelled after {} completed runs", completed.len())]
    Cancelled { completed: Vec<RunResult> },

    #[error("deadline exceeded after {} completed runs", completed.len())]
    DeadlineExceeded { completed: Vec<RunResult> },

    #[error(
        "legacy v1 engine unavailable: this build does not provide the frozen v1 RNG stream; \
         opt into V1Numerics::Portable to run v1 models with portable numerics"
    )]
    LegacyUnavailable,

    #[error("executor configuration error: {0}")]
    Config(String),
}

impl From<InvariantViolated> for SimError {
    fn from(err: InvariantViolated) -> Self {
        SimError::InvariantViolated {
            run_index: err.run_index,
            message: err.message,
        }
    }
}

// Why a batch stopped early; first writer wins.
const STOP_NONE: u8 = 0;
const STOP_CANCELLED: u8 = 1;
const STOP_DEADLINE: u8 = 2;

/// Execute `n_runs` independent runs of a validated model.
///
/// Results are ordered by `run_index` and are bit-identical for a fixed
/// `(model, base_seed, n_runs)` regardless of parallelism.
pub fn run_many(
    model: &Model,
    n_runs: u32,
    base_seed: u64,
    opts: &RunOptions,
) -> Result<Vec<RunResult>, SimError> {
    crate::model::validate(model)?;

    let kind = ExecutorKind::for_model(model);
    if kind == ExecutorKind::Legacy && opts.v1_numerics == V1Numerics::Strict {
        return Err(SimError::LegacyUnavailable);
    }

    info!(
        runs = n_runs,
        base_seed,
        engine = ?kind,
        "starting simulation batch"
    );

    let cfg = RunConfig {
        max_tasks_per_run: opts.max_tasks_per_run,
        collect_traces: opts.collect_traces,
    };
    let started = Instant::now();
    let deadline = opts.deadline_ms.map(Duration::from_millis);
    let stop = AtomicU8::new(STOP_NONE);

    let run_one = |run_index: u32| -> Result<Option<RunResult>, SimError> {
        if stop.load(Ordering::SeqCst) != STOP_NONE {
            return Ok(None);
        }
        if opts.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            let _ = stop.compare_exchange(STOP_NONE, STOP_CANCELLED, Ordering::SeqCst, Ordering::SeqCst);
            return Ok(None);
        }
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            let _ = stop.compare_exchange(STOP_NONE, STOP_DEADLINE, Ordering::SeqCst, Ordering::SeqCst);
            return Ok(None);
        }

        let seed = mix_seed(base_seed, run_index);
        let outcome = match kind {
            ExecutorKind::Legacy => legacy::simulate_one(model, run_index, seed, &cfg),
            ExecutorKind::Extended => extended::simulate_one(model, run_index, seed, &cfg),
        };
        match outcome {
            Ok(result) => Ok(Some(result)),
            Err(violation) if opts.tolerate_run_failures => {
                debug!(run_index, %violation, "tolerating failed run");
                Ok(Some(failed_run(run_index, seed, violation.message)))
            }
            Err(violation) => Err(violation.into()),
        }
    };

    let outcomes: Result<Vec<Option<RunResult>>, SimError> = match opts.max_parallelism {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads as usize)
                .build()
                .map_err(|e| SimError::Config(format!("thread pool: {e}")))?;
            pool.install(|| (0..n_runs).into_par_iter().map(run_one).collect())
        }
        None => (0..n_runs).into_par_iter().map(run_one).collect(),
    };

    let completed: Vec<RunResult> = outcomes?.into_iter().flatten().collect();
    match stop.load(Ordering::SeqCst) {
        STOP_CANCELLED => Err(SimError::Cancelled { completed }),
        STOP_DEADLINE => Err(SimError::DeadlineExceeded { completed }),
        _ => {
            info!(runs = completed.len(), "simulation batch complete");
            Ok(completed)
        }
    }
}

/// Placeholder result for a tolerated invariant failure.
fn failed_run(run_index: u32, seed: u64, reason: String) -> RunResult {
    RunResult {
        run_index,
        seed,
        task_instances: Vec::new(),
        critical_path_tasks: String::new(),
        first_ui_event_time_ms: None,
        last_ui_event_time_ms: None,
        makespan_ms: 0.0,
        failed: true,
        failure_reason: Some(reason),
    }
}
