//! # EDF priority queue
//!
//! Ordered by `(deadline, task_id, job_id)` ascending. `pop_job` implements
//! the G-EDF "keep the running job unless something strictly higher
//! priority is ready" rule: the currently executing job is compared
//! against the queue head and only preempted if the head is strictly
//! earlier by `(deadline, task_id)`.

use crate::task::{ReplicaKey, Time};

/// A queued candidate: the fields needed to order and admit it, independent
/// of the replica arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub key: ReplicaKey,
    pub release_time: Time,
    pub deadline: Time,
}

fn priority_key(e: &QueueEntry) -> (Time, i64, i64) {
    (e.deadline, e.key.task_id, e.key.job_id)
}

#[derive(Debug, Default)]
pub struct EdfQueue {
    entries: Vec<QueueEntry>,
}

impl EdfQueue {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_job(&mut self, entry: QueueEntry) {
        self.entries.push(entry);
        self.entries.sort_by_key(priority_key);
    }

    /// True if any queued replica shares `(task_id, job_id)`, ignoring
    /// `backup_id` — used by the passive-release rule.
    pub fn contains_job(&self, task_id: i64, job_id: i64) -> bool {
        self.entries
            .iter()
            .any(|e| e.key.task_id == task_id && e.key.job_id == job_id)
    }

    /// Drop every queued replica of `(task_id, job_id)`, regardless of
    /// `backup_id`. Called once a tuple is resolved so redundant siblings
    /// (an active backup that lost the race, say) never also run.
    pub fn remove_tuple(&mut self, task_id: i64, job_id: i64) {
        self.entries
            .retain(|e| !(e.key.task_id == task_id && e.key.job_id == job_id));
    }

    /// Decide what should run next given the current time and the job
    /// previously executing on the candidate core (if any).
    ///
    /// Returns `(job, did_preempt_previous)`. If nothing released is ready,
    /// keeps `previous` (or `None`) and never preempts.
    pub fn pop_job(
        &mut self,
        t: Time,
        previous: Option<QueueEntry>,
    ) -> (Option<QueueEntry>, bool) {
        let head_index = self
            .entries
            .iter()
            .position(|e| e.release_time <= t);
        let Some(idx) = head_index else {
            return (previous, false);
        };
        let head = self.entries[idx];

        if let Some(prev) = previous {
            if (prev.deadline, prev.key.task_id) <= (head.deadline, head.key.task_id) {
                return (Some(prev), false);
            }
        }

        self.entries.remove(idx);
        (Some(head), previous.is_some())
    }
}
