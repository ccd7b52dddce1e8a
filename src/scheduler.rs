//! # Scheduler
//!
//! The fault-tolerant global-EDF dispatch loop. Every tick:
//!
//! 1. advances each faulty core's Gilbert–Elliott regime and samples its
//!    activity ([`CoreSet::step_faults`]);
//! 2. repeatedly picks the globally lowest-priority remaining core and
//!    either charges it a fault interval or lets it make a scheduling
//!    decision against the EDF queue, releasing passive backups as needed;
//! 3. advances the chosen job by one tick and logs the interval.
//!
//! Scheduling-invariant violations (a core holding a job unknown to the
//! task set, popping from a queue the caller already knows is non-empty)
//! are programmer errors, not recoverable run outcomes, and are checked
//! with `debug_assert!` rather than returned as `Result`.

use tracing::{debug_span, info, warn};

use crate::core::{CoreSet, CoreState};
use crate::queue::{EdfQueue, QueueEntry};
use crate::rng::FaultRng;
use crate::schedule::{Schedule, ScheduleInterval};
use crate::task::{ReplicaKey, TaskSet, Time};

pub struct Scheduler {
    pub task_set: TaskSet,
    pub core_set: CoreSet,
}

impl Scheduler {
    pub fn new(task_set: TaskSet, core_set: CoreSet) -> Self {
        Self { task_set, core_set }
    }

    fn queue_entry(&self, key: ReplicaKey) -> QueueEntry {
        let replica = &self.task_set.replicas[&key];
        QueueEntry {
            key,
            release_time: replica.release_time,
            deadline: replica.deadline,
        }
    }

    /// Pick the globally lowest-priority core among `remaining`: the first
    /// non-executing core encountered (ascending id), or else the executing
    /// core whose job has the latest `(deadline, task_id)`, ties broken by
    /// ascending core id.
    fn pick_lowest_priority(&self, remaining: &[usize], core_jobs: &[Option<ReplicaKey>]) -> usize {
        for &idx in remaining {
            if core_jobs[idx].is_none() {
                return idx;
            }
        }
        let mut best = remaining[0];
        let mut best_prio = {
            let key = core_jobs[best].expect("scanned cores all executing");
            let r = &self.task_set.replicas[&key];
            (r.deadline, key.task_id)
        };
        for &idx in &remaining[1..] {
            let key = core_jobs[idx].expect("scanned cores all executing");
            let r = &self.task_set.replicas[&key];
            let prio = (r.deadline, key.task_id);
            if prio > best_prio {
                best = idx;
                best_prio = prio;
            }
        }
        best
    }

    /// Release a fresh passive replica for every tuple that has neither a
    /// queued replica nor one assigned to any core.
    fn release_due_passive_backups(
        &mut self,
        tuples: &[(i64, i64)],
        completed: &std::collections::HashSet<(i64, i64)>,
        core_jobs: &[Option<ReplicaKey>],
        queue: &mut EdfQueue,
    ) {
        for &(task_id, job_id) in tuples {
            if completed.contains(&(task_id, job_id)) {
                continue;
            }
            if queue.contains_job(task_id, job_id) {
                continue;
            }
            if core_jobs
                .iter()
                .flatten()
                .any(|k| k.task_id == task_id && k.job_id == job_id)
            {
                continue;
            }
            let key = self.task_set.release_passive_backup(task_id, job_id);
            queue.add_job(self.queue_entry(key));
        }
    }

    /// Run the dispatch loop over `[start, end)`, draining any jobs still
    /// in flight once the queue empties, and return the completed schedule.
    pub fn build_schedule(
        mut self,
        start: Time,
        end: Time,
        rng: &mut impl FaultRng,
    ) -> Schedule {
        let mut queue = EdfQueue::new();
        for key in self.task_set.replicas.keys().copied().collect::<Vec<_>>() {
            queue.add_job(self.queue_entry(key));
        }

        let tuples = self.task_set.job_tuples();
        let mut completed: std::collections::HashSet<(i64, i64)> = std::collections::HashSet::new();
        let mut core_jobs: Vec<Option<ReplicaKey>> = vec![None; self.core_set.cores.len()];
        let mut schedule = Schedule::new(start, end);

        let horizon = (end - start).max(1);
        let tick_cap = end + horizon * 4 + 16;
        let mut t = start;

        while !queue.is_empty() && t < tick_cap {
            let _span = debug_span!("tick", t).entered();
            self.core_set.step_faults(t, rng);

            // Faults for the whole core set are now known for this tick;
            // drop any in-flight job on a core that just went inactive so
            // a passive-release check run by any other core this same
            // tick sees an accurate picture, not a stale `core_jobs` entry
            // for a core that hasn't had its own turn yet.
            for (idx, core) in self.core_set.cores.iter().enumerate() {
                if !core.is_active {
                    core_jobs[idx] = None;
                }
            }

            let mut remaining: Vec<usize> = (0..self.core_set.cores.len()).collect();
            while !remaining.is_empty() {
                let idx = self.pick_lowest_priority(&remaining, &core_jobs);
                remaining.retain(|&i| i != idx);
                let core_id = self.core_set.cores[idx].id;

                if !self.core_set.cores[idx].is_active {
                    schedule.push(ScheduleInterval::fail(t, t + 1, core_id));
                    self.core_set.cores[idx].set_state(CoreState::Failed);
                    core_jobs[idx] = None;
                    continue;
                }

                let previous = core_jobs[idx].and_then(|key| {
                    if completed.contains(&(key.task_id, key.job_id)) {
                        return None;
                    }
                    let replica = &self.task_set.replicas[&key];
                    if replica.remaining == 0 {
                        None
                    } else {
                        Some(self.queue_entry(key))
                    }
                });

                self.release_due_passive_backups(&tuples, &completed, &core_jobs, &mut queue);

                let (new_job, preempted) = queue.pop_job(t, previous);
                if preempted {
                    if let Some(prev) = previous {
                        queue.add_job(prev);
                    }
                }

                let Some(new_job) = new_job else {
                    schedule.push(ScheduleInterval::idle(t, t + 1, core_id));
                    self.core_set.cores[idx].set_state(CoreState::Idle);
                    core_jobs[idx] = None;
                    continue;
                };

                let will_finish = {
                    let replica = &self.task_set.replicas[&new_job.key];
                    replica.remaining <= 1
                };

                let mut job_completed = false;
                if will_finish {
                    let tuple = (new_job.key.task_id, new_job.key.job_id);
                    if !completed.contains(&tuple) {
                        if t >= new_job.deadline {
                            warn!(task_id = tuple.0, job_id = tuple.1, t, "deadline missed");
                            schedule.record_miss(tuple.0, tuple.1);
                        }
                        completed.insert(tuple);
                        queue.remove_tuple(tuple.0, tuple.1);
                    }
                    let replica = self
                        .task_set
                        .replicas
                        .get_mut(&new_job.key)
                        .expect("dispatched replica exists");
                    replica.remaining = 0;
                    job_completed = true;
                } else {
                    let replica = self
                        .task_set
                        .replicas
                        .get_mut(&new_job.key)
                        .expect("dispatched replica exists");
                    replica.remaining -= 1;
                }

                schedule.push(ScheduleInterval {
                    start_time: t,
                    end_time: t + 1,
                    core_id,
                    task_id: new_job.key.task_id,
                    job_id: new_job.key.job_id,
                    backup_id: new_job.key.backup_id,
                    did_preempt: preempted,
                    job_completed,
                });

                self.core_set.cores[idx].set_state(CoreState::Executing(new_job.key));
                core_jobs[idx] = if job_completed { None } else { Some(new_job.key) };
            }

            t += 1;
        }

        if !queue.is_empty() {
            warn!(t, "tick cap reached with jobs still queued; treating as infeasible");
            for &(task_id, job_id) in &tuples {
                if !completed.contains(&(task_id, job_id)) && queue.contains_job(task_id, job_id) {
                    schedule.record_miss(task_id, job_id);
                    completed.insert((task_id, job_id));
                }
            }
        }

        // Drain partially-executed jobs, ascending core id order, no further
        // preemption (queue is empty) or fault sampling.
        for idx in 0..self.core_set.cores.len() {
            let core_id = self.core_set.cores[idx].id;
            let mut cur = t;
            let key = core_jobs[idx].filter(|k| !completed.contains(&(k.task_id, k.job_id)));
            let Some(key) = key else {
                schedule.push(ScheduleInterval::idle(cur, cur + 1, core_id));
                continue;
            };
            loop {
                let remaining = self.task_set.replicas[&key].remaining;
                if remaining == 0 {
                    break;
                }
                let finishes = remaining <= 1;
                let deadline = self.task_set.replicas[&key].deadline;
                if finishes {
                    let tuple = (key.task_id, key.job_id);
                    if !completed.contains(&tuple) {
                        if cur >= deadline {
                            schedule.record_miss(tuple.0, tuple.1);
                        }
                        completed.insert(tuple);
                        queue.remove_tuple(tuple.0, tuple.1);
                    }
                }
                let replica = self.task_set.replicas.get_mut(&key).unwrap();
                replica.remaining = if finishes { 0 } else { replica.remaining - 1 };
                schedule.push(ScheduleInterval {
                    start_time: cur,
                    end_time: cur + 1,
                    core_id,
                    task_id: key.task_id,
                    job_id: key.job_id,
                    backup_id: key.backup_id,
                    did_preempt: false,
                    job_completed: finishes,
                });
                cur += 1;
                if finishes {
                    break;
                }
            }
            schedule.push(ScheduleInterval::idle(cur, cur + 1, core_id));
        }

        let latest_deadline = self
            .task_set
            .replicas
            .values()
            .map(|r| r.deadline)
            .max()
            .unwrap_or(end);
        schedule.end_time = (t + 1).max(latest_deadline + 1).max(end);
        schedule.post_process();

        info!(
            feasible = schedule.meets_deadlines(),
            ticks = t - start,
            "schedule built"
        );
        schedule
    }
}
