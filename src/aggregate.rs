//! Run aggregation
//!
//! Collapses a batch of [`RunResult`]s into a [`Summary`]: percentiles of
//! the UI-event and makespan timings, the most frequent critical paths, and
//! (for v2 models) the per-task metadata passthrough. Failed runs are
//! excluded from every statistic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::instance::RunResult;
use crate::model::{Model, TaskMeta};

/// Number of critical paths reported by [`aggregate_runs`].
pub const DEFAULT_TOP_PATHS: usize = 10;

/// The four reported percentiles of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileSet {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// One ranked critical path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPath {
    pub path: String,
    pub count: u64,
    /// Fraction of successful runs that took this path.
    pub share: f64,
}

/// Batch size bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub requested: usize,
    pub ok: usize,
    pub failed: usize,
}

/// Aggregated view of a batch, serializable as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub runs: RunCounts,

    /// Metric name -> percentile set. UI metrics are absent when no
    /// successful run observed a UI-tagged event.
    pub percentiles: BTreeMap<String, PercentileSet>,

    pub top_critical_paths: Vec<TopPath>,

    /// Verbatim per-task metadata (schema v2 models only; absent when no
    /// task declares any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_metadata: Option<BTreeMap<String, TaskMeta>>,
}

/// Aggregate a batch with the default top-path count.
pub fn aggregate_runs(model: &Model, runs: &[RunResult]) -> Summary {
    aggregate_runs_top_k(model, runs, DEFAULT_TOP_PATHS)
}

/// Aggregate a batch, reporting at most `top_k` critical paths.
pub fn aggregate_runs_top_k(model: &Model, runs: &[RunResult], top_k: usize) -> Summary {
    let ok: Vec<&RunResult> = runs.iter().filter(|r| !r.failed).collect();

    let mut percentiles = BTreeMap::new();
    let makespans: Vec<f64> = ok.iter().map(|r| r.makespan_ms).collect();
    if let Some(set) = percentile_set(makespans) {
        percentiles.insert("makespan_ms".to_string(), set);
    }
    let first_ui: Vec<f64> = ok.iter().filter_map(|r| r.first_ui_event_time_ms).collect();
    if let Some(set) = percentile_set(first_ui) {
        percentiles.insert("first_ui_event_time_ms".to_string(), set);
    }
    let last_ui: Vec<f64> = ok.iter().filter_map(|r| r.last_ui_event_time_ms).collect();
    if let Some(set) = percentile_set(last_ui) {
        percentiles.insert("last_ui_event_time_ms".to_string(), set);
    }

    Summary {
        runs: RunCounts {
            requested: runs.len(),
            ok: ok.len(),
            failed: runs.len() - ok.len(),
        },
        percentiles,
        top_critical_paths: top_paths(&ok, top_k),
        task_metadata: task_metadata(model),
    }
}

fn task_metadata(model: &Model) -> Option<BTreeMap<String, TaskMeta>> {
    if model.schema_version < 2 {
        return None;
    }
    let map: BTreeMap<String, TaskMeta> = model
        .tasks
        .iter()
        .filter_map(|(name, task)| task.meta.clone().map(|meta| (name.clone(), meta)))
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn top_paths(ok: &[&RunResult], top_k: usize) -> Vec<TopPath> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for run in ok {
        if !run.critical_path_tasks.is_empty() {
            *counts.entry(&run.critical_path_tasks).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    // Highest count first; BTreeMap ordering already settles ties
    // lexicographically, and sort_by is stable.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(top_k);

    let total = ok.len() as f64;
    ranked
        .into_iter()
        .map(|(path, count)| TopPath {
            path: path.to_string(),
            count,
            share: count as f64 / total,
        })
        .collect()
}

fn percentile_set(mut values: Vec<f64>) -> Option<PercentileSet> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(PercentileSet {
        p50: percentile(&values, 50.0),
        p90: percentile(&values, 90.0),
        p95: percentile(&values, 95.0),
        p99: percentile(&values, 99.0),
    })
}

/// Percentile by linear interpolation between closest ranks.
///
/// `values` must be sorted and non-empty. For a single sample every
/// percentile is that sample.
fn percentile(values: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return values[lo];
    }
    let weight = rank - lo as f64;
    values[lo] * (1.0 - weight) + values[hi] * weight
}
