//! # Schedulability synthesis
//!
//! Random task-set generation at a target utilization, and the classic
//! Liu & Layland rate-monotonic utilization-bound test. Grounded on
//! `schedulability.py` in the original implementation; the matplotlib sweep
//! it drove is out of scope here, but the numeric contract it exercised is
//! fully implemented.

use crate::rng::FaultRng;
use crate::task::{Task, Time};

/// One synthesized task, before a task id is assigned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskSpec {
    pub utilization: f64,
    pub period: Time,
    pub wcet: Time,
}

/// Greedily add tasks with utilization drawn uniformly from `util_range`
/// (clamped so the running sum never exceeds `target_util`) and period
/// drawn uniformly from `period_range`, until the target is reached or the
/// remaining budget is too small to matter.
pub fn generate_random_task_set(
    target_util: f64,
    util_range: (f64, f64),
    period_range: (f64, f64),
    rng: &mut impl FaultRng,
) -> Vec<TaskSpec> {
    let mut tasks = Vec::new();
    let mut remaining = target_util;
    while remaining > 1e-6 {
        let (lo, hi) = util_range;
        let u = (lo + rng.uniform01() * (hi - lo)).min(remaining);
        let (plo, phi) = period_range;
        let period = (plo + rng.uniform01() * (phi - plo)).round().max(1.0) as Time;
        let wcet = ((period as f64) * u).round().max(1.0) as Time;
        tasks.push(TaskSpec {
            utilization: wcet as f64 / period as f64,
            period,
            wcet,
        });
        remaining -= u;
    }
    tasks
}

pub fn to_tasks(specs: &[TaskSpec]) -> Vec<Task> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| Task {
            id: i as i64 + 1,
            offset: 0,
            period: Some(spec.period),
            wcet: spec.wcet,
            relative_deadline: spec.period,
        })
        .collect()
}

/// The Liu & Layland utilization bound test: schedulable on one processor
/// iff total utilization does not exceed `n(2^(1/n) - 1)`.
pub fn rm_schedulable(specs: &[TaskSpec]) -> bool {
    if specs.is_empty() {
        return true;
    }
    let n = specs.len() as f64;
    let bound = n * (2f64.powf(1.0 / n) - 1.0);
    let total: f64 = specs.iter().map(|s| s.utilization).sum();
    total <= bound
}

/// Fraction of `n_sets` synthesized task sets at `target_util` that pass
/// [`rm_schedulable`].
pub fn schedulability_fraction(
    n_sets: usize,
    target_util: f64,
    util_range: (f64, f64),
    period_range: (f64, f64),
    rng: &mut impl FaultRng,
) -> f64 {
    if n_sets == 0 {
        return 0.0;
    }
    let passed = (0..n_sets)
        .filter(|_| {
            let specs = generate_random_task_set(target_util, util_range, period_range, rng);
            rm_schedulable(&specs)
        })
        .count();
    passed as f64 / n_sets as f64
}
