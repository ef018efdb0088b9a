//! Legacy (schema v1) run scheduler
//!
//! Frozen v1 semantics, retained as a migration oracle: same-time
//! completions are drained as a batch and processed in `(context, task,
//! id)` order, newly runnable work is admitted only after the whole batch,
//! and wiring delays do not exist. No new features land here.
//!
//! The original v1 oracle's RNG stream is not reproducible in this host
//! runtime, so this engine is only reachable through the portable-numerics
//! opt-in (see the executor); its scheduling decisions are v1's, its draws
//! are the portable generator's.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, BTreeMap, VecDeque};

use crate::instance::{RunResult, TaskInstance};
use crate::model::Model;
use crate::rng::{rng_for_seed, RunRng};
use crate::sampler::sample_ms;

use super::{finish_run, InvariantViolated, RunConfig};

#[derive(Debug)]
struct Completion {
    end_ms: f64,
    context: String,
    task_name: String,
    id: u64,
    slot: usize,
}

impl PartialEq for Completion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Completion {}

impl PartialOrd for Completion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Completion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.end_ms
            .total_cmp(&other.end_ms)
            .then_with(|| self.context.cmp(&other.context))
            .then_with(|| self.task_name.cmp(&other.task_name))
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[derive(Debug)]
struct Pending {
    task: String,
    enqueue_ms: f64,
    parent: Option<u64>,
}

#[derive(Debug)]
struct Slots {
    ready: VecDeque<Pending>,
    free_slots: Vec<usize>,
    last_on_slot: Vec<Option<u64>>,
}

struct LegacyRun<'m> {
    model: &'m Model,
    run_index: u32,
    rng: RunRng,
    contexts: BTreeMap<String, Slots>,
    heap: BinaryHeap<Reverse<Completion>>,
    instances: Vec<TaskInstance>,
    ui_times: Vec<f64>,
    tasks_created: usize,
    failure: Option<String>,
    max_tasks: usize,
}

/// Execute one run of a schema-v1 model with the frozen v1 scheduling
/// semantics.
pub fn simulate_one(
    model: &Model,
    run_index: u32,
    seed: u64,
    cfg: &RunConfig,
) -> Result<RunResult, InvariantViolated> {
    let contexts = model
        .contexts
        .iter()
        .map(|(name, def)| {
            let concurrency = def.concurrency as usize;
            (
                name.clone(),
                Slots {
                    ready: VecDeque::new(),
                    free_slots: (0..concurrency).collect(),
                    last_on_slot: vec![None; concurrency],
                },
            )
        })
        .collect();

    let mut run = LegacyRun {
        model,
        run_index,
        rng: rng_for_seed(seed),
        contexts,
        heap: BinaryHeap::new(),
        instances: Vec::new(),
        ui_times: Vec::new(),
        tasks_created: 0,
        failure: None,
        max_tasks: cfg.max_tasks_per_run,
    };

    run.occur_event(&model.entry_event, 0.0, None)?;
    run.try_start(0.0)?;

    while run.failure.is_none() {
        let Some(t_next) = run.heap.peek().map(|Reverse(c)| c.end_ms) else {
            break;
        };

        // Drain the whole same-time batch; heap order already sorts it by
        // (context, task, id).
        let mut batch = Vec::new();
        while run
            .heap
            .peek()
            .is_some_and(|Reverse(c)| c.end_ms == t_next)
        {
            if let Some(Reverse(c)) = run.heap.pop() {
                batch.push(c);
            }
        }

        for completion in batch {
            run.complete(completion)?;
        }
        run.try_start(t_next)?;
    }

    let LegacyRun {
        instances,
        ui_times,
        failure,
        ..
    } = run;
    Ok(finish_run(
        run_index,
        seed,
        instances,
        &ui_times,
        failure,
        cfg.collect_traces,
    ))
}

impl<'m> LegacyRun<'m> {
    fn invariant(&self, message: impl Into<String>) -> InvariantViolated {
        InvariantViolated {
            run_index: self.run_index,
            message: message.into(),
        }
    }

    fn occur_event(
        &mut self,
        name: &str,
        time_ms: f64,
        source: Option<u64>,
    ) -> Result<(), InvariantViolated> {
        let model = self.model;
        let def = model
            .events
            .get(name)
            .ok_or_else(|| self.invariant(format!("unknown event '{name}' fired")))?;
        if def.has_tag("ui") {
            self.ui_times.push(time_ms);
        }

        for edge in model.edges_for(name) {
            if edge.delay_ms.is_some() {
                return Err(self.invariant(format!(
                    "delayed edge '{name}' -> '{}' reached the v1 engine",
                    edge.task
                )));
            }
            self.enqueue_task(edge.task.clone(), time_ms, source)?;
        }
        Ok(())
    }

    fn enqueue_task(
        &mut self,
        task: String,
        enqueue_ms: f64,
        parent: Option<u64>,
    ) -> Result<(), InvariantViolated> {
        if self.failure.is_some() {
            return Ok(());
        }
        if self.tasks_created >= self.max_tasks {
            self.failure = Some(format!("max_tasks_per_run exceeded ({})", self.max_tasks));
            return Ok(());
        }
        self.tasks_created += 1;

        let ctx_name = self
            .model
            .tasks
            .get(&task)
            .map(|t| t.context.clone())
            .ok_or_else(|| self.invariant(format!("enqueue of unknown task '{task}'")))?;
        let slots = self
            .contexts
            .get_mut(&ctx_name)
            .ok_or_else(|| InvariantViolated {
                run_index: self.run_index,
                message: format!("task '{task}' enqueued on unknown context '{ctx_name}'"),
            })?;
        slots.ready.push_back(Pending {
            task,
            enqueue_ms,
            parent,
        });
        Ok(())
    }

    fn complete(&mut self, completion: Completion) -> Result<(), InvariantViolated> {
        let slots = self
            .contexts
            .get_mut(&completion.context)
            .ok_or_else(|| InvariantViolated {
                run_index: self.run_index,
                message: format!("completion on unknown context '{}'", completion.context),
            })?;
        slots.free_slots.push(completion.slot);

        let model = self.model;
        let task_def = model
            .tasks
            .get(&completion.task_name)
            .ok_or_else(|| self.invariant(format!("completed unknown task '{}'", completion.task_name)))?;
        for event in &task_def.emit {
            self.occur_event(event, completion.end_ms, Some(completion.id))?;
        }
        Ok(())
    }

    /// Sweep all contexts, admitting one task per context per pass until no
    /// context makes progress (the v1 admission order).
    fn try_start(&mut self, now_ms: f64) -> Result<(), InvariantViolated> {
        let ctx_names: Vec<String> = self.contexts.keys().cloned().collect();
        let mut made_progress = true;
        while made_progress {
            made_progress = false;
            for ctx_name in &ctx_names {
                if self.admit_one(ctx_name, now_ms)? {
                    made_progress = true;
                }
            }
        }
        Ok(())
    }

    fn admit_one(&mut self, ctx_name: &str, now_ms: f64) -> Result<bool, InvariantViolated> {
        let admitted = {
            let slots = self
                .contexts
                .get_mut(ctx_name)
                .ok_or_else(|| InvariantViolated {
                    run_index: self.run_index,
                    message: format!("admission on unknown context '{ctx_name}'"),
                })?;
            if slots.ready.is_empty() || slots.free_slots.is_empty() {
                None
            } else {
                slots.free_slots.sort_unstable();
                let slot = slots.free_slots.remove(0);
                let capacity_parent = slots.last_on_slot[slot];
                slots
                    .ready
                    .pop_front()
                    .map(|pending| (pending, slot, capacity_parent))
            }
        };
        let Some((pending, slot, capacity_parent)) = admitted else {
            return Ok(false);
        };

        let task_def = self
            .model
            .tasks
            .get(&pending.task)
            .ok_or_else(|| self.invariant(format!("admission of unknown task '{}'", pending.task)))?;
        let duration = sample_ms(&task_def.duration_ms, &mut self.rng)
            .map_err(|e| self.invariant(e.to_string()))?;

        let id = self.instances.len() as u64;
        let end_ms = now_ms + duration;
        self.instances.push(TaskInstance {
            id,
            task_name: pending.task.clone(),
            context: ctx_name.to_string(),
            enqueue_ms: pending.enqueue_ms,
            start_ms: now_ms,
            end_ms,
            parent_task_instance_id: pending.parent,
            capacity_parent_instance_id: capacity_parent,
            synthetic: false,
        });

        if let Some(slots) = self.contexts.get_mut(ctx_name) {
            slots.last_on_slot[slot] = Some(id);
        }
        self.heap.push(Reverse(Completion {
            end_ms,
            context: ctx_name.to_string(),
            task_name: pending.task,
            id,
            slot,
        }));
        Ok(true)
    }
}
