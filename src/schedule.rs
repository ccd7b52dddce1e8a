//! # Schedule record
//!
//! An append-only log of per-core intervals produced by the scheduler, plus
//! the post-processing pass that merges contiguous same-job intervals and
//! fills in `end_time`/`job_completed` from the next interval on the same
//! core.

use serde::{Deserialize, Serialize};

use crate::task::Time;

/// Idle uses task id 0; fault uses task id -1, matching the external JSON
/// contract's sentinel task ids.
pub const IDLE_TASK_ID: i64 = 0;
pub const FAIL_TASK_ID: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    Exec,
    Idle,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleInterval {
    pub start_time: Time,
    pub end_time: Time,
    pub core_id: u32,
    pub task_id: i64,
    pub job_id: i64,
    pub backup_id: u32,
    pub did_preempt: bool,
    pub job_completed: bool,
}

impl ScheduleInterval {
    pub fn kind(&self) -> IntervalKind {
        if self.task_id == FAIL_TASK_ID {
            IntervalKind::Fail
        } else if self.task_id == IDLE_TASK_ID {
            IntervalKind::Idle
        } else {
            IntervalKind::Exec
        }
    }

    pub fn idle(start: Time, end: Time, core_id: u32) -> Self {
        Self {
            start_time: start,
            end_time: end,
            core_id,
            task_id: IDLE_TASK_ID,
            job_id: -1,
            backup_id: 0,
            did_preempt: false,
            job_completed: false,
        }
    }

    pub fn fail(start: Time, end: Time, core_id: u32) -> Self {
        Self {
            start_time: start,
            end_time: end,
            core_id,
            task_id: FAIL_TASK_ID,
            job_id: -1,
            backup_id: 0,
            did_preempt: false,
            job_completed: false,
        }
    }
}

/// The full interval log for a run, plus the recorded deadline misses
/// (keyed by `(task_id, job_id)`) used to answer [`Schedule::meets_deadlines`].
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub start_time: Time,
    pub end_time: Time,
    pub intervals: Vec<ScheduleInterval>,
    pub missed_tuples: Vec<(i64, i64)>,
}

impl Schedule {
    pub fn new(start_time: Time, end_time: Time) -> Self {
        Self {
            start_time,
            end_time,
            intervals: Vec::new(),
            missed_tuples: Vec::new(),
        }
    }

    pub fn push(&mut self, interval: ScheduleInterval) {
        self.intervals.push(interval);
    }

    pub fn record_miss(&mut self, task_id: i64, job_id: i64) {
        self.missed_tuples.push((task_id, job_id));
    }

    /// Sort by `(core_id, start_time)`, then merge contiguous intervals that
    /// share `(core_id, task_id, job_id, backup_id)`, propagating
    /// `job_completed` from the last merged interval.
    pub fn post_process(&mut self) {
        self.intervals.sort_by_key(|i| (i.core_id, i.start_time));
        let mut merged: Vec<ScheduleInterval> = Vec::with_capacity(self.intervals.len());
        for interval in self.intervals.drain(..) {
            if let Some(last) = merged.last_mut() {
                let contiguous = last.core_id == interval.core_id
                    && last.end_time == interval.start_time
                    && last.task_id == interval.task_id
                    && last.job_id == interval.job_id
                    && last.backup_id == interval.backup_id;
                if contiguous {
                    last.end_time = interval.end_time;
                    last.job_completed = interval.job_completed;
                    last.did_preempt = last.did_preempt || interval.did_preempt;
                    continue;
                }
            }
            merged.push(interval);
        }
        self.intervals = merged;
    }

    /// A run is feasible iff no job tuple was recorded as missed — i.e.
    /// every primary tuple had at least one replica complete at or before
    /// its deadline.
    pub fn meets_deadlines(&self) -> bool {
        self.missed_tuples.is_empty()
    }

    pub fn exceeds_wcet(&self, wcet_of: impl Fn(i64) -> Time) -> bool {
        use std::collections::HashMap;
        let mut totals: HashMap<(i64, i64, u32), Time> = HashMap::new();
        for interval in &self.intervals {
            if interval.kind() != IntervalKind::Exec {
                continue;
            }
            *totals
                .entry((interval.task_id, interval.job_id, interval.backup_id))
                .or_insert(0) += interval.end_time - interval.start_time;
        }
        totals
            .into_iter()
            .any(|((task_id, _, _), total)| total > wcet_of(task_id))
    }
}
