//! # Task model
//!
//! A [`Task`] describes a periodic or sporadic unit of work: a period (or
//! `None` for sporadic release), a WCET, and a relative deadline. At load
//! time a [`TaskSet`] expands each task into the primary jobs it releases
//! over the simulated horizon plus `active_backups` pre-materialized backup
//! replicas per job. Every replica of a job shares the job's `(task_id,
//! job_id)` identity and is distinguished only by `backup_id` — see
//! [`ReplicaKey`].

use std::collections::HashMap;

use crate::error::SimError;

pub type Time = i64;

/// A task as read from the input task set: immutable after load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    /// First release time. Zero if unspecified.
    pub offset: Time,
    /// Release period. `None` marks the task as sporadic — releases come
    /// from an explicit release-time list instead of `offset + k*period`.
    pub period: Option<Time>,
    pub wcet: Time,
    pub relative_deadline: Time,
}

/// Identifies one replica of one job: the primary (`backup_id == 0`) or one
/// of its active/passive backups. `(task_id, job_id)` is the logical job
/// identity that deadline-feasibility is judged against; siblings are
/// interchangeable for that purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplicaKey {
    pub task_id: i64,
    pub job_id: i64,
    pub backup_id: u32,
}

/// One schedulable instance: a primary job or one of its replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replica {
    pub key: ReplicaKey,
    pub release_time: Time,
    pub deadline: Time,
    pub wcet: Time,
    pub remaining: Time,
}

impl Replica {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// The task set plus the flattened pool of replicas (primary + active
/// backups) it has released, keyed by [`ReplicaKey`]. Replicas live here
/// uniquely; the priority queue and cores hold only `ReplicaKey`s into this
/// pool, so moving a replica between "queued" and "on core" never copies
/// its mutable state.
#[derive(Debug, Clone)]
pub struct TaskSet {
    pub tasks: Vec<Task>,
    pub active_backups: u32,
    pub replicas: HashMap<ReplicaKey, Replica>,
    next_backup_id: HashMap<(i64, i64), u32>,
}

impl TaskSet {
    pub fn validate(tasks: &[Task]) -> Result<(), SimError> {
        let mut seen = std::collections::HashSet::new();
        for task in tasks {
            if !seen.insert(task.id) {
                return Err(SimError::DuplicateTaskId(task.id));
            }
            if task.period.is_none() && task.relative_deadline <= 0 {
                return Err(SimError::AperiodicTaskMissingDeadline(task.id));
            }
        }
        Ok(())
    }

    /// Build a task set and release every primary job (plus `active_backups`
    /// backup replicas each) over `[start, end)`.
    ///
    /// `sporadic_releases` maps a task id to its explicit release instants;
    /// tasks absent from the map use `offset + k*period`. A task with
    /// `period = None` must appear in the map.
    pub fn build(
        tasks: Vec<Task>,
        active_backups: u32,
        start: Time,
        end: Time,
        sporadic_releases: &HashMap<i64, Vec<Time>>,
    ) -> Result<Self, SimError> {
        Self::validate(&tasks)?;
        let mut set = TaskSet {
            tasks,
            active_backups,
            replicas: HashMap::new(),
            next_backup_id: HashMap::new(),
        };
        for task in set.tasks.clone() {
            let releases = match (&task.period, sporadic_releases.get(&task.id)) {
                (_, Some(explicit)) => explicit.clone(),
                (Some(period), None) => {
                    let mut r = task.offset;
                    let mut out = Vec::new();
                    while r < end {
                        if r >= start {
                            out.push(r);
                        }
                        r += period;
                    }
                    out
                }
                (None, None) => Vec::new(),
            };
            let mut previous: Option<Time> = None;
            for (job_id, release_time) in releases.into_iter().enumerate() {
                let job_id = job_id as i64;
                if let Some(prev) = previous {
                    if release_time <= prev {
                        return Err(SimError::NonMonotonicRelease {
                            task_id: task.id,
                            previous: prev,
                            release: release_time,
                        });
                    }
                }
                previous = Some(release_time);
                set.spawn_job(&task, job_id, release_time);
            }
        }
        Ok(set)
    }

    fn spawn_job(&mut self, task: &Task, job_id: i64, release_time: Time) {
        for backup_id in 0..=self.active_backups {
            let key = ReplicaKey {
                task_id: task.id,
                job_id,
                backup_id,
            };
            self.replicas.insert(
                key,
                Replica {
                    key,
                    release_time,
                    deadline: release_time + task.relative_deadline,
                    wcet: task.wcet,
                    remaining: task.wcet,
                },
            );
        }
        self.next_backup_id
            .insert((task.id, job_id), self.active_backups + 1);
    }

    /// Materialize a fresh passive backup of an already-known job, with a
    /// newly allocated `backup_id`. Used by the scheduler's passive-release
    /// rule when no replica of a job remains in flight.
    pub fn release_passive_backup(&mut self, task_id: i64, job_id: i64) -> ReplicaKey {
        let task = self
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .expect("passive backup requested for unknown task");
        let existing = self
            .replicas
            .values()
            .find(|r| r.key.task_id == task_id && r.key.job_id == job_id)
            .expect("passive backup requested for unknown job");
        let release_time = existing.release_time;
        let deadline = existing.deadline;
        let backup_id = self
            .next_backup_id
            .entry((task_id, job_id))
            .or_insert(self.active_backups + 1);
        let key = ReplicaKey {
            task_id,
            job_id,
            backup_id: *backup_id,
        };
        *self.next_backup_id.get_mut(&(task_id, job_id)).unwrap() += 1;
        self.replicas.insert(
            key,
            Replica {
                key,
                release_time,
                deadline,
                wcet: task.wcet,
                remaining: task.wcet,
            },
        );
        key
    }

    /// Every distinct `(task_id, job_id)` tuple released into this task set,
    /// in release order.
    pub fn job_tuples(&self) -> Vec<(i64, i64)> {
        let mut tuples: Vec<(i64, i64, Time)> = self
            .replicas
            .values()
            .filter(|r| r.key.backup_id == 0)
            .map(|r| (r.key.task_id, r.key.job_id, r.release_time))
            .collect();
        tuples.sort_by_key(|&(task_id, job_id, release)| (release, task_id, job_id));
        tuples
            .into_iter()
            .map(|(task_id, job_id, _)| (task_id, job_id))
            .collect()
    }
}
