//! Critical-path reconstruction
//!
//! The terminal instance is the non-delay instance with the greatest
//! `end_ms` (ties go to the highest id, i.e. the latest-created). From
//! there the walk follows `parent_task_instance_id` (true causal
//! dependence) when set, and otherwise falls back to `capacity_parent_instance_id`,
//! which explains queueing delay when an instance was blocked on a busy
//! context rather than on an emission. Synthetic delay instances appear
//! inline under their `delay(<event>-><task>)` names.

use crate::instance::TaskInstance;

/// Reconstruct the `>`-joined critical path for a run's instance log.
///
/// Instances must be in id order (id == index), which is how both engines
/// produce them. Returns an empty string for an empty run.
pub fn critical_path_tasks(instances: &[TaskInstance]) -> String {
    let terminal = instances
        .iter()
        .filter(|i| !i.synthetic)
        .max_by(|a, b| a.end_ms.total_cmp(&b.end_ms).then(a.id.cmp(&b.id)));

    let Some(terminal) = terminal else {
        return String::new();
    };

    let mut names: Vec<&str> = Vec::new();
    let mut cursor = Some(terminal);
    while let Some(inst) = cursor {
        names.push(&inst.task_name);
        let next_id = inst
            .parent_task_instance_id
            .or(inst.capacity_parent_instance_id);
        cursor = next_id.and_then(|id| instances.get(id as usize));
    }

    names.reverse();
    names.join(">")
}
