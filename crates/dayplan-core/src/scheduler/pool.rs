//! Working pool of tasks for one planning run.
//!
//! Tasks are never removed while the pool is scanned; placement flips an
//! `assigned` flag instead, so the iteration order stays fixed for the whole run.

use crate::schedule::Task;

#[derive(Debug)]
struct Slot<'a> {
    task: &'a Task,
    assigned: bool,
}

/// Arena of borrowed tasks in pool order.
#[derive(Debug)]
pub(crate) struct TaskPool<'a> {
    slots: Vec<Slot<'a>>,
}

impl<'a> TaskPool<'a> {
    /// Build a pool visiting `tasks` in `order` (indices into `tasks`).
    pub fn new(tasks: &'a [Task], order: &[usize]) -> Self {
        Self {
            slots: order
                .iter()
                .map(|&i| Slot {
                    task: &tasks[i],
                    assigned: false,
                })
                .collect(),
        }
    }

    /// Unassigned tasks with their slot numbers, in pool order.
    pub fn unassigned(&self) -> impl Iterator<Item = (usize, &'a Task)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.assigned)
            .map(|(i, slot)| (i, slot.task))
    }

    pub fn task(&self, slot: usize) -> &'a Task {
        self.slots[slot].task
    }

    pub fn assign(&mut self, slot: usize) {
        self.slots[slot].assigned = true;
    }

    /// Whether any unassigned task follows `slot` in pool order.
    pub fn has_unassigned_after(&self, slot: usize) -> bool {
        self.slots.iter().skip(slot + 1).any(|s| !s.assigned)
    }

    pub fn is_exhausted(&self) -> bool {
        self.slots.iter().all(|s| s.assigned)
    }

    /// Tasks never assigned, in pool order.
    pub fn remaining(&self) -> Vec<&'a Task> {
        self.unassigned().map(|(_, task)| task).collect()
    }
}
