//! Scenario tests for the extended scheduler
//!
//! Each test builds a small model and checks exact timings, causality
//! pointers, and critical paths against hand-computed values.

use latencylab::model::Model;
use latencylab::{run_many, RunOptions, RunResult};

fn simulate(json: &str) -> RunResult {
    let model = Model::from_json(json).unwrap();
    let mut results = run_many(&model, 1, 42, &RunOptions::default()).unwrap();
    assert_eq!(results.len(), 1);
    results.remove(0)
}

#[test]
fn test_single_fixed_task() {
    let run = simulate(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"main": {"concurrency": 1}},
            "events": {"e0": {}},
            "tasks": {"t0": {"context": "main", "duration_ms": {"dist": "fixed", "value": 10.0}}},
            "wiring": {"e0": ["t0"]}
        }"#,
    );

    assert_eq!(run.task_instances.len(), 1);
    let t0 = &run.task_instances[0];
    assert_eq!(t0.id, 0);
    assert_eq!(t0.task_name, "t0");
    assert_eq!((t0.enqueue_ms, t0.start_ms, t0.end_ms), (0.0, 0.0, 10.0));
    assert_eq!(t0.parent_task_instance_id, None);
    assert_eq!(t0.capacity_parent_instance_id, None);
    assert_eq!(run.makespan_ms, 10.0);
    assert_eq!(run.critical_path_tasks, "t0");
    assert!(!run.failed);
}

#[test]
fn test_chain_across_separate_contexts() {
    let run = simulate(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"a": {"concurrency": 1}, "b": {"concurrency": 1}},
            "events": {"e0": {}, "e1": {}},
            "tasks": {
                "t1": {"context": "a", "duration_ms": {"dist": "fixed", "value": 10.0}, "emit": ["e1"]},
                "t2": {"context": "b", "duration_ms": {"dist": "fixed", "value": 10.0}}
            },
            "wiring": {"e0": ["t1"], "e1": ["t2"]}
        }"#,
    );

    assert_eq!(run.task_instances.len(), 2);
    let t1 = &run.task_instances[0];
    let t2 = &run.task_instances[1];
    assert_eq!(t1.task_name, "t1");
    assert_eq!(t2.task_name, "t2");
    assert_eq!(t2.enqueue_ms, 10.0);
    assert_eq!(t2.start_ms, 10.0);
    assert_eq!(t2.parent_task_instance_id, Some(t1.id));
    assert_eq!(t2.capacity_parent_instance_id, None);
    assert_eq!(run.makespan_ms, 20.0);
    assert_eq!(run.critical_path_tasks, "t1>t2");
}

#[test]
fn test_chain_on_shared_context_records_capacity_parent() {
    let run = simulate(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"main": {"concurrency": 1}},
            "events": {"e0": {}, "e1": {}},
            "tasks": {
                "t1": {"context": "main", "duration_ms": {"dist": "fixed", "value": 10.0}, "emit": ["e1"]},
                "t2": {"context": "main", "duration_ms": {"dist": "fixed", "value": 10.0}}
            },
            "wiring": {"e0": ["t1"], "e1": ["t2"]}
        }"#,
    );

    let t1 = &run.task_instances[0];
    let t2 = &run.task_instances[1];
    assert_eq!(t2.start_ms, 10.0);
    assert_eq!(t2.capacity_parent_instance_id, Some(t1.id));
    assert_eq!(run.makespan_ms, 20.0);
    assert_eq!(run.critical_path_tasks, "t1>t2");
}

#[test]
fn test_fanout_on_saturated_context_is_fifo_by_insertion() {
    let run = simulate(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"main": {"concurrency": 1}},
            "events": {"e0": {}},
            "tasks": {
                "ta": {"context": "main", "duration_ms": {"dist": "fixed", "value": 5.0}},
                "tb": {"context": "main", "duration_ms": {"dist": "fixed", "value": 5.0}}
            },
            "wiring": {"e0": ["ta", "tb"]}
        }"#,
    );

    assert_eq!(run.task_instances.len(), 2);
    let first = &run.task_instances[0];
    let second = &run.task_instances[1];
    // Admission order is wiring declaration order.
    assert_eq!(first.task_name, "ta");
    assert_eq!(second.task_name, "tb");
    assert_eq!(first.start_ms, 0.0);
    assert_eq!(second.enqueue_ms, 0.0);
    assert_eq!(second.start_ms, 5.0);
    assert_eq!(second.capacity_parent_instance_id, Some(first.id));
}

#[test]
fn test_delayed_edge_creates_synthetic_instance() {
    let run = simulate(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"main": {"concurrency": 1}},
            "events": {"e0": {}, "e1": {}},
            "tasks": {
                "t0": {"context": "main", "duration_ms": {"dist": "fixed", "value": 10.0}, "emit": ["e1"]},
                "t1": {"context": "main", "duration_ms": {"dist": "fixed", "value": 2.0}}
            },
            "wiring": {
                "e0": ["t0"],
                "e1": [{"task": "t1", "delay_ms": {"dist": "fixed", "value": 5.0}}]
            }
        }"#,
    );

    assert_eq!(run.task_instances.len(), 3);
    let t0 = &run.task_instances[0];
    let delay = &run.task_instances[1];
    let t1 = &run.task_instances[2];

    assert_eq!(t0.task_name, "t0");
    assert_eq!((t0.start_ms, t0.end_ms), (0.0, 10.0));

    assert_eq!(delay.task_name, "delay(e1->t1)");
    assert_eq!(delay.context, "__delay__");
    assert!(delay.synthetic);
    assert_eq!((delay.enqueue_ms, delay.start_ms, delay.end_ms), (10.0, 10.0, 15.0));
    assert_eq!(delay.parent_task_instance_id, Some(t0.id));
    assert_eq!(delay.capacity_parent_instance_id, None);

    assert_eq!(t1.task_name, "t1");
    assert_eq!(t1.enqueue_ms, 15.0);
    assert_eq!(t1.start_ms, 15.0);
    assert_eq!(t1.parent_task_instance_id, Some(delay.id));

    assert_eq!(run.critical_path_tasks, "t0>delay(e1->t1)>t1");
    // Makespan counts real work only; the delay ends inside it anyway.
    assert_eq!(run.makespan_ms, 17.0);
}

#[test]
fn test_ui_tagged_events_set_first_and_last_times() {
    let run = simulate(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"main": {"concurrency": 1}},
            "events": {"e0": {"tags": ["ui"]}, "e1": {"tags": []}, "e2": {"tags": ["ui"]}},
            "tasks": {
                "t0": {"context": "main", "duration_ms": {"dist": "fixed", "value": 4.0}, "emit": ["e1"]},
                "t1": {"context": "main", "duration_ms": {"dist": "fixed", "value": 3.0}, "emit": ["e2"]}
            },
            "wiring": {"e0": ["t0"], "e1": ["t1"]}
        }"#,
    );

    // The entry occurrence at t=0 is UI-tagged; e2 fires when t1 ends at 7.
    assert_eq!(run.first_ui_event_time_ms, Some(0.0));
    assert_eq!(run.last_ui_event_time_ms, Some(7.0));
}

#[test]
fn test_unwired_emission_is_a_no_op() {
    let run = simulate(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"main": {"concurrency": 1}},
            "events": {"e0": {}, "e_unwired": {}},
            "tasks": {
                "t0": {"context": "main", "duration_ms": {"dist": "fixed", "value": 1.0}, "emit": ["e_unwired"]}
            },
            "wiring": {"e0": ["t0"]}
        }"#,
    );
    assert_eq!(run.task_instances.len(), 1);
    assert_eq!(run.makespan_ms, 1.0);
}

#[test]
fn test_cyclic_model_hits_task_cap_and_fails_the_run() {
    let model = Model::from_json(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"main": {"concurrency": 1}},
            "events": {"e0": {}},
            "tasks": {
                "t0": {"context": "main", "duration_ms": {"dist": "fixed", "value": 1.0}, "emit": ["e0"]}
            },
            "wiring": {"e0": ["t0"]}
        }"#,
    )
    .unwrap();

    let opts = RunOptions {
        max_tasks_per_run: 10,
        ..RunOptions::default()
    };
    let results = run_many(&model, 1, 7, &opts).unwrap();
    let run = &results[0];
    assert!(run.failed);
    assert!(run
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("max_tasks_per_run exceeded"));
    // The cap bounds the instance log too.
    assert!(run.task_instances.len() <= 10);
}

#[test]
fn test_degenerate_normal_collapses_all_percentiles() {
    let model = Model::from_json(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"main": {"concurrency": 1}},
            "events": {"e0": {"tags": ["ui"]}, "done": {"tags": ["ui"]}},
            "tasks": {
                "t0": {"context": "main", "duration_ms": {"dist": "normal", "mean": 10.0, "std": 0.0}, "emit": ["done"]}
            },
            "wiring": {"e0": ["t0"]}
        }"#,
    )
    .unwrap();

    let results = run_many(&model, 1000, 99, &RunOptions::default()).unwrap();
    let summary = latencylab::aggregate_runs(&model, &results);

    let makespan = &summary.percentiles["makespan_ms"];
    assert_eq!(
        (makespan.p50, makespan.p90, makespan.p95, makespan.p99),
        (10.0, 10.0, 10.0, 10.0)
    );
    let last_ui = &summary.percentiles["last_ui_event_time_ms"];
    assert_eq!(
        (last_ui.p50, last_ui.p90, last_ui.p95, last_ui.p99),
        (10.0, 10.0, 10.0, 10.0)
    );
    let first_ui = &summary.percentiles["first_ui_event_time_ms"];
    assert_eq!((first_ui.p50, first_ui.p99), (0.0, 0.0));
}

#[test]
fn test_zero_duration_chain_stays_at_time_zero() {
    let run = simulate(
        r#"{
            "schema_version": 2,
            "entry_event": "e0",
            "contexts": {"main": {"concurrency": 1}},
            "events": {"e0": {}, "e1": {}},
            "tasks": {
                "t0": {"context": "main", "duration_ms": {"dist": "fixed", "value": 0.0}, "emit": ["e1"]},
                "t1": {"context": "main", "duration_ms": {"dist": "fixed", "value": 0.0}}
            },
            "wiring": {"e0": ["t0"], "e1": ["t1"]}
        }"#,
    );
    assert_eq!(run.task_instances.len(), 2);
    assert_eq!(run.makespan_ms, 0.0);
    assert_eq!(run.critical_path_tasks, "t0>t1");
}
