//! Model validation
//!
//! Every reference must resolve and every distribution parameter must be in
//! bounds before a model reaches an engine. The engines treat dangling
//! references as invariant violations, so validation is the only place a
//! malformed model is reported with a usable message.

use thiserror::Error;

use super::defs::{Model, DELAY_CONTEXT};
use super::dist::DurationDist;

/// Validation rejection for a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema_version {0} (expected 1 or 2)")]
    UnsupportedVersion(u32),

    #[error("entry_event '{0}' must exist in events")]
    UnknownEntryEvent(String),

    #[error("context name '{0}' is reserved")]
    ReservedContextName(String),

    #[error("context '{name}' concurrency must be >= 1 (got {got})")]
    BadConcurrency { name: String, got: u32 },

    #[error("context '{name}' policy must be 'fifo' (got '{got}')")]
    UnsupportedPolicy { name: String, got: String },

    #[error("task '{task}' references unknown context '{context}'")]
    UnknownTaskContext { task: String, context: String },

    #[error("task '{task}' emits unknown event '{event}'")]
    UnknownEmittedEvent { task: String, event: String },

    #[error("wiring references unknown event '{0}'")]
    UnknownWiringEvent(String),

    #[error("wiring for event '{event}' references unknown task '{task}'")]
    UnknownWiringTask { event: String, task: String },

    #[error("wiring for event '{event}' -> task '{task}' uses delay_ms, which requires schema_version 2")]
    DelayRequiresV2 { event: String, task: String },

    #[error("{owner} fixed value must be >= 0 (got {got})")]
    NegativeFixedValue { owner: String, got: f64 },

    #[error("{owner} normal std must be >= 0 (got {got})")]
    NegativeStd { owner: String, got: f64 },

    #[error("{owner} normal min must be >= 0 (got {got})")]
    NegativeMin { owner: String, got: f64 },

    #[error("{owner} lognormal sigma must be >= 0 (got {got})")]
    NegativeSigma { owner: String, got: f64 },
}

/// Validate a parsed model against the contract in the crate docs.
///
/// Engines assume a validated model; run them on an unvalidated one and
/// dangling references surface as fatal invariant violations instead of
/// readable errors.
pub fn validate(model: &Model) -> Result<(), ModelError> {
    if model.schema_version != 1 && model.schema_version != 2 {
        return Err(ModelError::UnsupportedVersion(model.schema_version));
    }

    if !model.events.contains_key(&model.entry_event) {
        return Err(ModelError::UnknownEntryEvent(model.entry_event.clone()));
    }

    for (name, ctx) in &model.contexts {
        if name == DELAY_CONTEXT {
            return Err(ModelError::ReservedContextName(name.clone()));
        }
        if ctx.concurrency < 1 {
            return Err(ModelError::BadConcurrency {
                name: name.clone(),
                got: ctx.concurrency,
            });
        }
        if ctx.policy != "fifo" {
            return Err(ModelError::UnsupportedPolicy {
                name: name.clone(),
                got: ctx.policy.clone(),
            });
        }
    }

    for (task_name, task) in &model.tasks {
        if !model.contexts.contains_key(&task.context) {
            return Err(ModelError::UnknownTaskContext {
                task: task_name.clone(),
                context: task.context.clone(),
            });
        }

        check_dist(
            &format!("task '{task_name}' duration_ms"),
            &task.duration_ms,
        )?;

        for event in &task.emit {
            if !model.events.contains_key(event) {
                return Err(ModelError::UnknownEmittedEvent {
                    task: task_name.clone(),
                    event: event.clone(),
                });
            }
        }
    }

    for (event, edges) in &model.wiring {
        if !model.events.contains_key(event) {
            return Err(ModelError::UnknownWiringEvent(event.clone()));
        }
        for edge in edges {
            if !model.tasks.contains_key(&edge.task) {
                return Err(ModelError::UnknownWiringTask {
                    event: event.clone(),
                    task: edge.task.clone(),
                });
            }
            if let Some(delay) = &edge.delay_ms {
                if model.schema_version < 2 {
                    return Err(ModelError::DelayRequiresV2 {
                        event: event.clone(),
                        task: edge.task.clone(),
                    });
                }
                check_dist(
                    &format!("wiring '{event}' -> '{}' delay_ms", edge.task),
                    delay,
                )?;
            }
        }
    }

    Ok(())
}

fn check_dist(owner: &str, dist: &DurationDist) -> Result<(), ModelError> {
    match dist {
        DurationDist::Fixed { value } => {
            if *value < 0.0 {
                return Err(ModelError::NegativeFixedValue {
                    owner: owner.to_string(),
                    got: *value,
                });
            }
        }
        DurationDist::Normal { std, min, .. } => {
            if *std < 0.0 {
                return Err(ModelError::NegativeStd {
                    owner: owner.to_string(),
                    got: *std,
                });
            }
            if let Some(min) = min {
                if *min < 0.0 {
                    return Err(ModelError::NegativeMin {
                        owner: owner.to_string(),
                        got: *min,
                    });
                }
            }
        }
        DurationDist::Lognormal { sigma, .. } => {
            if *sigma < 0.0 {
                return Err(ModelError::NegativeSigma {
                    owner: owner.to_string(),
                    got: *sigma,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContextDef, EventDef, TaskDef, WiringEdge};
    use std::collections::BTreeMap;

    fn minimal_model() -> Model {
        let mut contexts = BTreeMap::new();
        contexts.insert(
            "main".to_string(),
            ContextDef {
                concurrency: 1,
                policy: "fifo".to_string(),
            },
        );
        let mut events = BTreeMap::new();
        events.insert("e0".to_string(), EventDef::default());
        let mut tasks = BTreeMap::new();
        tasks.insert(
            "t0".to_string(),
            TaskDef {
                context: "main".to_string(),
                duration_ms: DurationDist::fixed(1.0),
                emit: vec![],
                meta: None,
            },
        );
        let mut wiring = BTreeMap::new();
        wiring.insert(
            "e0".to_string(),
            vec![WiringEdge {
                task: "t0".to_string(),
                delay_ms: None,
            }],
        );
        Model {
            schema_version: 2,
            entry_event: "e0".to_string(),
            contexts,
            events,
            tasks,
            wiring,
        }
    }

    #[test]
    fn test_minimal_model_is_valid() {
        validate(&minimal_model()).unwrap();
    }

    #[test]
    fn test_rejects_bad_version() {
        let mut model = minimal_model();
        model.schema_version = 3;
        assert!(matches!(
            validate(&model),
            Err(ModelError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn test_rejects_unknown_entry_event() {
        let mut model = minimal_model();
        model.entry_event = "missing".to_string();
        assert!(matches!(
            validate(&model),
            Err(ModelError::UnknownEntryEvent(_))
        ));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut model = minimal_model();
        model.contexts.get_mut("main").unwrap().concurrency = 0;
        assert!(matches!(
            validate(&model),
            Err(ModelError::BadConcurrency { .. })
        ));
    }

    #[test]
    fn test_rejects_non_fifo_policy() {
        let mut model = minimal_model();
        model.contexts.get_mut("main").unwrap().policy = "lifo".to_string();
        assert!(matches!(
            validate(&model),
            Err(ModelError::UnsupportedPolicy { .. })
        ));
    }

    #[test]
    fn test_rejects_reserved_context_name() {
        let mut model = minimal_model();
        model.contexts.insert(
            DELAY_CONTEXT.to_string(),
            ContextDef {
                concurrency: 1,
                policy: "fifo".to_string(),
            },
        );
        assert!(matches!(
            validate(&model),
            Err(ModelError::ReservedContextName(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_task_context() {
        let mut model = minimal_model();
        model.tasks.get_mut("t0").unwrap().context = "gpu".to_string();
        assert!(matches!(
            validate(&model),
            Err(ModelError::UnknownTaskContext { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_emitted_event() {
        let mut model = minimal_model();
        model.tasks.get_mut("t0").unwrap().emit = vec!["nope".to_string()];
        assert!(matches!(
            validate(&model),
            Err(ModelError::UnknownEmittedEvent { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_wiring_task() {
        let mut model = minimal_model();
        model.wiring.get_mut("e0").unwrap()[0].task = "nope".to_string();
        assert!(matches!(
            validate(&model),
            Err(ModelError::UnknownWiringTask { .. })
        ));
    }

    #[test]
    fn test_rejects_delay_on_v1() {
        let mut model = minimal_model();
        model.schema_version = 1;
        model.wiring.get_mut("e0").unwrap()[0].delay_ms = Some(DurationDist::fixed(5.0));
        assert!(matches!(
            validate(&model),
            Err(ModelError::DelayRequiresV2 { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_dist_params() {
        let mut model = minimal_model();
        model.tasks.get_mut("t0").unwrap().duration_ms = DurationDist::Normal {
            mean: 10.0,
            std: -1.0,
            min: None,
        };
        assert!(matches!(
            validate(&model),
            Err(ModelError::NegativeStd { .. })
        ));

        let mut model = minimal_model();
        model.tasks.get_mut("t0").unwrap().duration_ms = DurationDist::fixed(-1.0);
        assert!(matches!(
            validate(&model),
            Err(ModelError::NegativeFixedValue { .. })
        ));

        let mut model = minimal_model();
        model.tasks.get_mut("t0").unwrap().duration_ms = DurationDist::Lognormal {
            mu: 0.0,
            sigma: -0.5,
        };
        assert!(matches!(
            validate(&model),
            Err(ModelError::NegativeSigma { .. })
        ));
    }
}
