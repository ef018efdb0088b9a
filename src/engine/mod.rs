//! Run engines
//!
//! Two single-run schedulers share this module:
//!
//! - [`extended`]: the schema-v2 engine. A single min-priority event queue
//!   keyed `(time, tiebreak_seq)` drives enqueues and completions; wiring
//!   delays become synthetic instances on the `__delay__` context.
//! - [`legacy`]: the schema-v1 engine, preserving the frozen v1 scheduling
//!   semantics (batched same-time completion processing ordered by context,
//!   task, then id; no delayed wiring).
//!
//! Both are single-threaded and cooperative within a run: time advance is
//! virtual, there is no preemption, and every decision is a pure function of
//! `(model, seed)`.

pub mod critical_path;
pub mod extended;
pub mod legacy;

use thiserror::Error;

pub use critical_path::critical_path_tasks;

use crate::instance::{RunResult, TaskInstance};
use crate::model::DELAY_CONTEXT;

/// Per-run engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Safety cap on task enqueues per run; exceeding it marks the run
    /// failed instead of looping forever on a cyclic model.
    pub max_tasks_per_run: usize,

    /// When false, the instance log is dropped from the returned result
    /// (after the critical path and metrics are derived from it).
    pub collect_traces: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_run: 200_000,
            collect_traces: true,
        }
    }
}

/// Fatal scheduling failure: an internal inconsistency surfaced mid-run.
///
/// Well-formed (validated) input cannot trigger this.
#[derive(Debug, Error)]
#[error("invariant violated in run {run_index}: {message}")]
pub struct InvariantViolated {
    pub run_index: u32,
    pub message: String,
}

/// Assemble a `RunResult` from a finished (or capped) run.
fn finish_run(
    run_index: u32,
    seed: u64,
    instances: Vec<TaskInstance>,
    ui_times: &[f64],
    failure: Option<String>,
    collect_traces: bool,
) -> RunResult {
    let makespan_ms = instances
        .iter()
        .filter(|i| !i.synthetic)
        .map(|i| i.end_ms)
        .fold(0.0, f64::max);

    let first_ui = ui_times.iter().copied().reduce(f64::min);
    let last_ui = ui_times.iter().copied().reduce(f64::max);

    let critical_path = critical_path_tasks(&instances);

    RunResult {
        run_index,
        seed,
        task_instances: if collect_traces { instances } else { Vec::new() },
        critical_path_tasks: critical_path,
        first_ui_event_time_ms: first_ui,
        last_ui_event_time_ms: last_ui,
        makespan_ms,
        failed: failure.is_some(),
        failure_reason: failure,
    }
}

/// Deterministic name for a synthetic delay instance.
fn delay_task_name(event: &str, task: &str) -> String {
    format!("delay({event}->{task})")
}

/// Build the synthetic instance representing a sampled wiring delay.
fn delay_instance(
    id: u64,
    event: &str,
    task: &str,
    emit_time_ms: f64,
    delay_ms: f64,
    parent: Option<u64>,
) -> TaskInstance {
    TaskInstance {
        id,
        task_name: delay_task_name(event, task),
        context: DELAY_CONTEXT.to_string(),
        enqueue_ms: emit_time_ms,
        start_ms: emit_time_ms,
        end_ms: emit_time_ms + delay_ms,
        parent_task_instance_id: parent,
        capacity_parent_instance_id: None,
        synthetic: true,
    }
}
