//! Declarative simulation model
//!
//! A [`Model`] describes execution contexts (with concurrency caps), tasks
//! (with sampled durations and emitted events), and wiring (events dispatching
//! to downstream tasks, possibly through sampled delays). Models are loaded
//! once, validated, and shared read-only across all runs.

mod defs;
mod dist;
mod json;
mod validate;

pub use defs::{ContextDef, EventDef, Model, TaskDef, TaskMeta, WiringEdge, DELAY_CONTEXT};
pub use dist::DurationDist;
pub use validate::{validate, ModelError};
