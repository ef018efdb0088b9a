//! Result writers
//!
//! Three artifacts per batch: `trace.csv` (one row per task instance),
//! `runs.csv` (one row per run), and `summary.json`. Parent directories are
//! created as needed. Empty CSV cells denote unset optionals.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::aggregate::Summary;
use crate::instance::RunResult;

/// Writer failure.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("summary serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn create(path: &Path) -> Result<BufWriter<File>, OutputError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn opt_cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write one row per task instance, in id order within each run.
pub fn write_trace_csv(path: &Path, runs: &[RunResult]) -> Result<(), OutputError> {
    let mut out = create(path)?;
    writeln!(
        out,
        "run_index,instance_id,task_name,context,enqueue_ms,start_ms,end_ms,\
         parent_task_instance_id,capacity_parent_instance_id,synthetic"
    )?;
    for run in runs {
        for inst in &run.task_instances {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{}",
                run.run_index,
                inst.id,
                inst.task_name,
                inst.context,
                inst.enqueue_ms,
                inst.start_ms,
                inst.end_ms,
                opt_cell(inst.parent_task_instance_id),
                opt_cell(inst.capacity_parent_instance_id),
                inst.synthetic,
            )?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Write one row per run.
pub fn write_runs_csv(path: &Path, runs: &[RunResult]) -> Result<(), OutputError> {
    let mut out = create(path)?;
    writeln!(
        out,
        "run_index,seed,makespan_ms,first_ui_event_time_ms,last_ui_event_time_ms,critical_path_tasks"
    )?;
    for run in runs {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            run.run_index,
            run.seed,
            run.makespan_ms,
            opt_cell(run.first_ui_event_time_ms),
            opt_cell(run.last_ui_event_time_ms),
            run.critical_path_tasks,
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Write the aggregate summary as pretty-printed JSON.
pub fn write_summary_json(path: &Path, summary: &Summary) -> Result<(), OutputError> {
    let mut out = create(path)?;
    let text = serde_json::to_string_pretty(summary)?;
    out.write_all(text.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
