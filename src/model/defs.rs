//! Model definition types
//!
//! These structs mirror the model JSON form (see `json.rs` for the flexible
//! input shapes). All maps are `BTreeMap` so iteration order is deterministic
//! regardless of declaration order in the source file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::dist::DurationDist;

/// Reserved context name for synthetic delay instances.
///
/// Instances on this context are not capacity-constrained and never carry a
/// capacity parent. Model files must not declare a context with this name.
pub const DELAY_CONTEXT: &str = "__delay__";

/// A named execution pool with a fixed concurrency cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDef {
    /// Maximum number of task instances running at once (>= 1).
    pub concurrency: u32,

    /// Admission policy. Only `"fifo"` is supported.
    #[serde(default = "default_policy")]
    pub policy: String,
}

fn default_policy() -> String {
    "fifo".to_string()
}

/// A named signal fired on task completion and dispatched via wiring.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventDef {
    /// Free-form tags. `"ui"` is recognized for UI-latency metrics.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EventDef {
    /// Check whether this event carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Measurement-only task metadata, passed through to the summary verbatim.
///
/// Metadata never influences scheduling: two models differing only in
/// `TaskMeta` produce identical run results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A named unit of work with a sampled duration, assigned to a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDef {
    /// Name of the context this task runs on.
    pub context: String,

    /// Duration distribution in simulated milliseconds.
    pub duration_ms: DurationDist,

    /// Events emitted (in order) when an instance of this task completes.
    #[serde(default)]
    pub emit: Vec<String>,

    /// Optional measurement metadata (schema v2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TaskMeta>,
}

/// One wiring edge: an event dispatching to a target task, optionally
/// through a sampled delay.
///
/// The JSON form accepts either a bare task name string or an object
/// `{"task": ..., "delay_ms": ...}` where `delay_ms` may be a distribution
/// or a bare number (treated as fixed).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WiringEdge {
    pub task: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<DurationDist>,
}

/// A complete, immutable simulation model.
///
/// # Example
/// ```
/// use latencylab::model::Model;
///
/// let model = Model::from_json(r#"{
///     "schema_version": 2,
///     "entry_event": "e0",
///     "contexts": {"main": {"concurrency": 1, "policy": "fifo"}},
///     "events": {"e0": {"tags": ["ui"]}},
///     "tasks": {"t0": {"context": "main", "duration_ms": {"dist": "fixed", "value": 10.0}}},
///     "wiring": {"e0": ["t0"]}
/// }"#).unwrap();
/// assert_eq!(model.schema_version, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model schema version (1 or 2). The JSON key may also be spelled
    /// `version` or `model_version`.
    #[serde(alias = "version", alias = "model_version")]
    pub schema_version: u32,

    /// Event injected at t=0 to bootstrap each run.
    pub entry_event: String,

    #[serde(default)]
    pub contexts: BTreeMap<String, ContextDef>,

    #[serde(default)]
    pub events: BTreeMap<String, EventDef>,

    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDef>,

    /// Event name -> outbound edges, dispatched in declaration order.
    #[serde(default)]
    pub wiring: BTreeMap<String, Vec<WiringEdge>>,
}

impl Model {
    /// Parse a model from its JSON text form.
    pub fn from_json(text: &str) -> Result<Self, super::ModelError> {
        serde_json::from_str(text).map_err(super::ModelError::Json)
    }

    /// Wiring edges for an event (empty slice if the event is unwired).
    pub fn edges_for(&self, event: &str) -> &[WiringEdge] {
        self.wiring.get(event).map(Vec::as_slice).unwrap_or(&[])
    }
}
