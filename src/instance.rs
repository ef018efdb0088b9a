//! Per-run record types
//!
//! A run produces one [`RunResult`] owning an append-only sequence of
//! [`TaskInstance`]s. Instance ids are indices into that sequence, so
//! causality pointers are plain integers and the instance log doubles as an
//! arena. Synthetic delay instances share the same id space.

use serde::Serialize;

/// One execution of a task (or a synthetic wiring delay) within a run.
///
/// Invariant: `enqueue_ms <= start_ms <= end_ms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInstance {
    /// Monotonic per-run id, starting at 0. Equal to the instance's index
    /// in `RunResult::task_instances`.
    pub id: u64,

    pub task_name: String,

    /// Context name, or `__delay__` for synthetic delay instances.
    pub context: String,

    pub enqueue_ms: f64,
    pub start_ms: f64,
    pub end_ms: f64,

    /// Instance whose emission caused this one (event or delay causality).
    /// Unset for instances triggered by the entry event.
    pub parent_task_instance_id: Option<u64>,

    /// Instance whose completion freed the capacity slot this one runs on.
    /// Unset for the first `concurrency` occupants of a slot, and always
    /// unset for synthetic delays.
    pub capacity_parent_instance_id: Option<u64>,

    /// True for synthetic wiring-delay instances.
    pub synthetic: bool,
}

impl TaskInstance {
    /// Time spent waiting for a capacity slot.
    pub fn queue_wait_ms(&self) -> f64 {
        self.start_ms - self.enqueue_ms
    }

    /// Sampled execution duration.
    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// The complete outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub run_index: u32,

    /// The mixed per-run seed this run's RNG was created from.
    pub seed: u64,

    /// Every instance in id order. Empty when trace collection is disabled.
    pub task_instances: Vec<TaskInstance>,

    /// `>`-joined critical path ending at the terminal instance.
    pub critical_path_tasks: String,

    /// First/last occurrence time of any event tagged `"ui"`, if one fired.
    pub first_ui_event_time_ms: Option<f64>,
    pub last_ui_event_time_ms: Option<f64>,

    /// Max `end_ms` across non-delay instances (0 for an empty run).
    pub makespan_ms: f64,

    /// True if the run was aborted by the task-count safety cap.
    pub failed: bool,
    pub failure_reason: Option<String>,
}
