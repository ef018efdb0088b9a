//! Extended (schema v2) run scheduler
//!
//! The central discrete-event loop. All scheduling flows through one
//! min-priority queue of [`ScheduledItem`]s keyed `(time_ms, tiebreak_seq)`:
//! the tiebreak sequence is a monotonically increasing counter, so equal-time
//! items are processed in insertion order and every decision is a pure
//! function of `(model, seed)`.
//!
//! Contexts admit FIFO from a per-context ready queue into a pool of
//! numbered slots (lowest free slot index first). A slot remembers its last
//! occupant, which becomes the `capacity_parent_instance_id` of the next
//! admission: the causal explanation for time spent queued on a busy
//! context. Wiring delays are materialized as synthetic instances on the
//! capacity-free `__delay__` context so they show up in traces and critical
//! paths like any other work.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, VecDeque};

use crate::instance::{RunResult, TaskInstance};
use crate::model::Model;
use crate::rng::{rng_for_seed, RunRng};
use crate::sampler::sample_ms;

use super::{delay_instance, finish_run, InvariantViolated, RunConfig};

#[derive(Debug)]
enum ScheduledItem {
    EnqueueTask { task: String, parent: Option<u64> },
    EndInstance { id: u64 },
}

#[derive(Debug)]
struct Scheduled {
    time_ms: f64,
    seq: u64,
    item: ScheduledItem,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time_ms
            .total_cmp(&other.time_ms)
            .then(self.seq.cmp(&other.seq))
    }
}

#[derive(Debug)]
struct Pending {
    task: String,
    enqueue_ms: f64,
    parent: Option<u64>,
}

/// Capacity state for one context: a FIFO ready queue plus numbered slots.
#[derive(Debug)]
struct ContextState {
    ready: VecDeque<Pending>,
    free_slots: Vec<usize>,
    last_on_slot: Vec<Option<u64>>,
}

impl ContextState {
    fn new(concurrency: usize) -> Self {
        Self {
            ready: VecDeque::new(),
            free_slots: (0..concurrency).collect(),
            last_on_slot: vec![None; concurrency],
        }
    }
}

struct Scheduler<'m> {
    model: &'m Model,
    run_index: u32,
    rng: RunRng,
    now_ms: f64,
    queue: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
    contexts: HashMap<String, ContextState>,
    instances: Vec<TaskInstance>,
    /// Target task for each in-flight synthetic delay instance.
    delay_targets: HashMap<u64, String>,
    /// Slot index occupied by each running non-delay instance.
    running_slot: HashMap<u64, usize>,
    ui_times: Vec<f64>,
    tasks_created: usize,
    failure: Option<String>,
    max_tasks: usize,
}

/// Execute one run of a schema-v2 model against a freshly seeded RNG.
pub fn simulate_one(
    model: &Model,
    run_index: u32,
    seed: u64,
    cfg: &RunConfig,
) -> Result<RunResult, InvariantViolated> {
    let contexts = model
        .contexts
        .iter()
        .map(|(name, def)| (name.clone(), ContextState::new(def.concurrency as usize)))
        .collect();

    let mut scheduler = Scheduler {
        model,
        run_index,
        rng: rng_for_seed(seed),
        now_ms: 0.0,
        queue: BinaryHeap::new(),
        next_seq: 0,
        contexts,
        instances: Vec::new(),
        delay_targets: HashMap::new(),
        running_slot: HashMap::new(),
        ui_times: Vec::new(),
        tasks_created: 0,
        failure: None,
        max_tasks: cfg.max_tasks_per_run,
    };

    scheduler.occur_event(&model.entry_event, 0.0, None)?;
    scheduler.run()?;

    let Scheduler {
        instances,
        ui_times,
        failure,
        ..
    } = scheduler;
    Ok(finish_run(
        run_index,
        seed,
        instances,
        &ui_times,
        failure,
        cfg.collect_traces,
    ))
}

impl<'m> Scheduler<'m> {
    fn invariant(&self, message: impl Into<String>) -> InvariantViolated {
        InvariantViolated {
            run_index: self.run_index,
            message: message.into(),
        }
    }

    fn push_item(&mut self, time_ms: f64, item: ScheduledItem) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled { time_ms, seq, item }));
    }

    /// Drain the event queue, advancing virtual time item by item.
    fn run(&mut self) -> Result<(), InvariantViolated> {
        while self.failure.is_none() {
            let Some(Reverse(next)) = self.queue.pop() else {
                break;
            };
            self.now_ms = next.time_ms;
            match next.item {
                ScheduledItem::EnqueueTask { task, parent } => {
                    self.handle_enqueue(task, parent)?;
                }
                ScheduledItem::EndInstance { id } => {
                    self.handle_end(id)?;
                }
            }
        }
        Ok(())
    }

    /// Record an event occurrence and dispatch its wiring edges.
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
            match &edge.delay_ms {
                None => self.schedule_enqueue(edge.task.clone(), time_ms, source),
                Some(delay) => {
                    let delay_ms = sample_ms(delay, &mut self.rng)
                        .map_err(|e| self.invariant(e.to_string()))?;
                    let id = self.instances.len() as u64;
                    let inst = delay_instance(id, name, &edge.task, time_ms, delay_ms, source);
                    let end_ms = inst.end_ms;
                    self.delay_targets.insert(id, edge.task.clone());
                    self.instances.push(inst);
                    self.push_item(end_ms, ScheduledItem::EndInstance { id });
                }
            }
        }
        Ok(())
    }

    /// Schedule a task enqueue, charging it against the safety cap.
    fn schedule_enqueue(&mut self, task: String, time_ms: f64, parent: Option<u64>) {
        if self.failure.is_some() {
            return;
        }
        if self.tasks_created >= self.max_tasks {
            self.failure = Some(format!("max_tasks_per_run exceeded ({})", self.max_tasks));
            return;
        }
        self.tasks_created += 1;
        self.push_item(time_ms, ScheduledItem::EnqueueTask { task, parent });
    }

    fn handle_enqueue(&mut self, task: String, parent: Option<u64>) -> Result<(), InvariantViolated> {
        let model = self.model;
        let task_def = model
            .tasks
            .get(&task)
            .ok_or_else(|| self.invariant(format!("enqueue of unknown task '{task}'")))?;
        let ctx_name = task_def.context.clone();
        let enqueue_ms = self.now_ms;

        let ctx = self
            .contexts
            .get_mut(&ctx_name)
            .ok_or_else(|| InvariantViolated {
                run_index: self.run_index,
                message: format!("task '{task}' enqueued on unknown context '{ctx_name}'"),
            })?;
        ctx.ready.push_back(Pending {
            task,
            enqueue_ms,
            parent,
        });

        self.try_admit(&ctx_name)
    }

    fn handle_end(&mut self, id: u64) -> Result<(), InvariantViolated> {
        let inst = self
            .instances
            .get(id as usize)
            .ok_or_else(|| self.invariant(format!("end of unknown instance {id}")))?;
        let synthetic = inst.synthetic;
        let task_name = inst.task_name.clone();
        let context = inst.context.clone();
        let end_ms = inst.end_ms;

        if synthetic {
            let target = self
                .delay_targets
                .remove(&id)
                .ok_or_else(|| self.invariant(format!("delay instance {id} has no target")))?;
            self.schedule_enqueue(target, self.now_ms, Some(id));
            return Ok(());
        }

        // Free the slot, then admit waiters before dispatching emissions so
        // earlier enqueues keep FIFO priority at this timestamp.
        let slot = self
            .running_slot
            .remove(&id)
            .ok_or_else(|| self.invariant(format!("instance {id} is not running")))?;
        let ctx = self
            .contexts
            .get_mut(&context)
            .ok_or_else(|| InvariantViolated {
                run_index: self.run_index,
                message: format!("instance {id} ended on unknown context '{context}'"),
            })?;
        ctx.free_slots.push(slot);
        self.try_admit(&context)?;

        let model = self.model;
        let task_def = model
            .tasks
            .get(&task_name)
            .ok_or_else(|| self.invariant(format!("completed unknown task '{task_name}'")))?;
        for event in &task_def.emit {
            self.occur_event(event, end_ms, Some(id))?;
        }
        Ok(())
    }

    /// Admit from a context's ready queue while capacity remains.
    fn try_admit(&mut self, ctx_name: &str) -> Result<(), InvariantViolated> {
        loop {
            let admitted = {
                let ctx = self
                    .contexts
                    .get_mut(ctx_name)
                    .ok_or_else(|| InvariantViolated {
                        run_index: self.run_index,
                        message: format!("admission on unknown context '{ctx_name}'"),
                    })?;
                if ctx.ready.is_empty() || ctx.free_slots.is_empty() {
                    None
                } else {
                    // Lowest free slot index wins, so slot reuse (and with it
                    // capacity parenthood) is deterministic.
                    ctx.free_slots.sort_unstable();
                    let slot = ctx.free_slots.remove(0);
                    let capacity_parent = ctx.last_on_slot[slot];
                    ctx.ready.pop_front().map(|pending| (pending, slot, capacity_parent))
                }
            };
            let Some((pending, slot, capacity_parent)) = admitted else {
                return Ok(());
            };

            let task_def = self
                .model
                .tasks
                .get(&pending.task)
                .ok_or_else(|| self.invariant(format!("admission of unknown task '{}'", pending.task)))?;
            let duration = sample_ms(&task_def.duration_ms, &mut self.rng)
                .map_err(|e| self.invariant(e.to_string()))?;

            let id = self.instances.len() as u64;
            let start_ms = self.now_ms;
            let end_ms = start_ms + duration;
            self.instances.push(TaskInstance {
                id,
                task_name: pending.task,
                context: ctx_name.to_string(),
                enqueue_ms: pending.enqueue_ms,
                start_ms,
                end_ms,
                parent_task_instance_id: pending.parent,
                capacity_parent_instance_id: capacity_parent,
                synthetic: false,
            });

            if let Some(ctx) = self.contexts.get_mut(ctx_name) {
                ctx.last_on_slot[slot] = Some(id);
            }
            self.running_slot.insert(id, slot);
            self.push_item(end_ms, ScheduledItem::EndInstance { id });
        }
    }
}
