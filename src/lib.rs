//! LatencyLab - design-time latency exploration
//!
//! Executes a declarative model of an event-driven interactive system as a
//! discrete-event simulation, many times under seeded randomness, and
//! aggregates the per-run traces into latency percentiles and critical-path
//! summaries.
//!
//! # Architecture
//!
//! - **model**: declarative input model (contexts, events, tasks, wiring)
//! - **sampler**: duration sampling from fixed/normal/lognormal shapes
//! - **engine**: single-run discrete-event schedulers (extended + legacy)
//!   and critical-path reconstruction
//! - **executor**: batch fan-out with per-run seeding, cancellation, and
//!   deadline handling
//! - **aggregate**: percentile and top-path summaries
//! - **output**: trace/runs CSV and summary JSON writers
//! - **rng**: deterministic per-run seed mixing
//!
//! # Critical Invariants
//!
//! 1. All time is simulated millisecond time (f64); no wall-clock enters a run
//! 2. All randomness is deterministic: one private seeded RNG per run
//! 3. Results are bit-identical at any parallelism level

pub mod aggregate;
pub mod engine;
pub mod executor;
pub mod instance;
pub mod model;
pub mod output;
pub mod rng;
pub mod sampler;

// Re-exports for convenience
pub use aggregate::{aggregate_runs, aggregate_runs_top_k, PercentileSet, Summary, TopPath};
pub use executor::{run_many, CancelToken, ExecutorKind, RunOptions, SimError, V1Numerics};
pub use instance::{RunResult, TaskInstance};
pub use model::{
    validate, ContextDef, DurationDist, EventDef, Model, ModelError, TaskDef, TaskMeta,
    WiringEdge, DELAY_CONTEXT,
};
