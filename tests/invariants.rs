//! Property tests for the seven universal invariants that must hold for
//! every fault-tolerant global-EDF run, regardless of the generated task
//! set, core topology, or fault parameters.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use ftmgedf_sim::core::CoreSet;
use ftmgedf_sim::rng::seeded;
use ftmgedf_sim::schedule::{IntervalKind, Schedule};
use ftmgedf_sim::scheduler::Scheduler;
use ftmgedf_sim::task::{Task, TaskSet, Time};

const HORIZON: Time = 24;

fn arb_task_set() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec((2..=6i64, 1..=4i64), 2..=4).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (period, wcet))| Task {
                id: (i + 1) as i64,
                offset: 0,
                period: Some(period),
                wcet: wcet.min(period),
                relative_deadline: period,
            })
            .collect()
    })
}

#[derive(Debug, Clone, Copy)]
struct FaultParams {
    m: usize,
    num_faulty: usize,
    active_backups: u32,
    lambda_c: f64,
    lambda_b: f64,
    lambda_r: f64,
    bursty_chance: f64,
    scaler: u32,
    seed: u64,
}

fn arb_fault_params() -> impl Strategy<Value = FaultParams> {
    (1..=3usize, 0..=1u32, 0.0..1.0f64, 0.0..1.0f64, 0.0..1.0f64, 0.0..1.0f64, 1..=3u32, any::<u64>())
        .prop_flat_map(|(m, active_backups, lambda_c, lambda_b, lambda_r, bursty_chance, scaler, seed)| {
            (0..=m).prop_map(move |num_faulty| FaultParams {
                m,
                num_faulty,
                active_backups,
                lambda_c: lambda_c * 0.05,
                lambda_b,
                lambda_r,
                bursty_chance,
                scaler,
                seed,
            })
        })
}

/// Build the task set, core set and run the scheduler, returning the
/// schedule plus the per-tuple deadline and per-task wcet lookups computed
/// before the task set is consumed.
struct RunOutcome {
    schedule: Schedule,
    deadline_of: HashMap<(i64, i64), Time>,
    release_of: HashMap<(i64, i64), Time>,
    wcet_of: HashMap<i64, Time>,
    active_backups: usize,
}

fn run(tasks: Vec<Task>, params: FaultParams) -> Option<RunOutcome> {
    let wcet_of: HashMap<i64, Time> = tasks.iter().map(|t| (t.id, t.wcet)).collect();
    let task_set = TaskSet::build(tasks, params.active_backups, 0, HORIZON, &HashMap::new()).ok()?;
    let deadline_of: HashMap<(i64, i64), Time> = task_set
        .replicas
        .values()
        .filter(|r| r.key.backup_id == 0)
        .map(|r| ((r.key.task_id, r.key.job_id), r.deadline))
        .collect();
    let release_of: HashMap<(i64, i64), Time> = task_set
        .replicas
        .values()
        .filter(|r| r.key.backup_id == 0)
        .map(|r| ((r.key.task_id, r.key.job_id), r.release_time))
        .collect();
    let core_set = CoreSet::new(
        params.m,
        params.num_faulty,
        params.bursty_chance,
        params.scaler,
        params.lambda_c,
        params.lambda_b,
        params.lambda_r,
    );
    let active_backups = params.active_backups as usize;
    let scheduler = Scheduler::new(task_set, core_set);
    let mut rng = seeded(params.seed);
    let schedule = scheduler.build_schedule(0, HORIZON, &mut rng);
    Some(RunOutcome { schedule, deadline_of, release_of, wcet_of, active_backups })
}

/// Expand merged intervals back into a per-tick, per-core occupant so the
/// tick-local invariants can be checked directly.
fn per_tick_occupants(schedule: &Schedule) -> Vec<(Time, u32, &ftmgedf_sim::schedule::ScheduleInterval)> {
    let mut out = Vec::new();
    for interval in &schedule.intervals {
        let mut t = interval.start_time;
        while t < interval.end_time {
            out.push((t, interval.core_id, interval));
            t += 1;
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// 1. Passive-replica uniqueness: at no tick do two different cores run
    /// distinct passive replicas (`backup_id > active_backups`) of the same
    /// `(task_id, job_id)` tuple.
    #[test]
    fn passive_replica_uniqueness(tasks in arb_task_set(), params in arb_fault_params()) {
        let Some(outcome) = run(tasks, params) else { return Ok(()); };
        let occupants = per_tick_occupants(&outcome.schedule);
        let mut by_tick: HashMap<Time, Vec<&ftmgedf_sim::schedule::ScheduleInterval>> = HashMap::new();
        for (t, _core, interval) in &occupants {
            if interval.kind() == IntervalKind::Exec && interval.backup_id as usize > outcome.active_backups {
                by_tick.entry(*t).or_default().push(interval);
            }
        }
        for intervals in by_tick.values() {
            let mut seen: HashSet<(i64, i64)> = HashSet::new();
            for interval in intervals {
                prop_assert!(seen.insert((interval.task_id, interval.job_id)));
            }
        }
    }

    /// 2. Conservation: a replica that is ever recorded as completed occupies
    /// exactly its task's wcet in EXEC ticks, no more and no less.
    #[test]
    fn conservation(tasks in arb_task_set(), params in arb_fault_params()) {
        let Some(outcome) = run(tasks, params) else { return Ok(()); };
        let mut totals: HashMap<(i64, i64, u32), Time> = HashMap::new();
        let mut completed: HashSet<(i64, i64, u32)> = HashSet::new();
        for interval in &outcome.schedule.intervals {
            if interval.kind() != IntervalKind::Exec {
                continue;
            }
            let key = (interval.task_id, interval.job_id, interval.backup_id);
            *totals.entry(key).or_insert(0) += interval.end_time - interval.start_time;
            if interval.job_completed {
                completed.insert(key);
            }
        }
        for key in completed {
            let wcet = outcome.wcet_of[&key.0];
            prop_assert_eq!(totals[&key], wcet);
        }
    }

    /// 3. WCET bound: no replica ever occupies more ticks than its task's wcet.
    #[test]
    fn wcet_bound(tasks in arb_task_set(), params in arb_fault_params()) {
        let Some(outcome) = run(tasks, params) else { return Ok(()); };
        prop_assert!(!outcome.schedule.exceeds_wcet(|task_id| outcome.wcet_of[&task_id]));
    }

    /// 4. Work conservation (the checkable face of EDF local optimality): a
    /// tuple that has been released and not yet completed is assigned to
    /// some core on every tick that any core sits idle.
    #[test]
    fn work_conservation(tasks in arb_task_set(), params in arb_fault_params()) {
        let Some(outcome) = run(tasks, params) else { return Ok(()); };
        let schedule = &outcome.schedule;

        let mut completed_at: HashMap<(i64, i64), Time> = HashMap::new();
        for interval in &schedule.intervals {
            if interval.kind() == IntervalKind::Exec && interval.job_completed {
                let tuple = (interval.task_id, interval.job_id);
                let at = completed_at.entry(tuple).or_insert(interval.end_time);
                *at = (*at).min(interval.end_time);
            }
        }

        let mut assigned_at: HashMap<(i64, i64), HashSet<Time>> = HashMap::new();
        let mut idle_ticks: HashSet<Time> = HashSet::new();
        for interval in &schedule.intervals {
            let mut t = interval.start_time;
            while t < interval.end_time {
                match interval.kind() {
                    IntervalKind::Exec => {
                        assigned_at
                            .entry((interval.task_id, interval.job_id))
                            .or_default()
                            .insert(t);
                    }
                    IntervalKind::Idle => {
                        idle_ticks.insert(t);
                    }
                    IntervalKind::Fail => {}
                }
                t += 1;
            }
        }

        // Beyond the nominal horizon the loop is in its tick-capped drain
        // phase (an infeasible run being wound down), not live dispatch;
        // the work-conservation property only binds within [0, HORIZON).
        for (&tuple, &release) in &outcome.release_of {
            let done_at = completed_at.get(&tuple).copied().unwrap_or(Time::MAX);
            let assigned = assigned_at.get(&tuple);
            for &t in &idle_ticks {
                if t < release || t >= done_at || t >= HORIZON {
                    continue;
                }
                let was_assigned = assigned.is_some_and(|ticks| ticks.contains(&t));
                prop_assert!(
                    was_assigned,
                    "tuple {:?} ready at tick {t} while some core idle",
                    tuple
                );
            }
        }
    }

    /// 5. Feasibility <-> completion: the run is reported feasible iff every
    /// released tuple has some replica completing at or before its deadline.
    #[test]
    fn feasibility_matches_completion(tasks in arb_task_set(), params in arb_fault_params()) {
        let Some(outcome) = run(tasks, params) else { return Ok(()); };
        let mut completed_on_time: HashMap<(i64, i64), bool> = HashMap::new();
        for interval in &outcome.schedule.intervals {
            if interval.kind() == IntervalKind::Exec && interval.job_completed {
                let tuple = (interval.task_id, interval.job_id);
                let on_time = interval.end_time <= outcome.deadline_of[&tuple];
                let entry = completed_on_time.entry(tuple).or_insert(false);
                *entry = *entry || on_time;
            }
        }
        let all_on_time = outcome
            .deadline_of
            .keys()
            .all(|tuple| *completed_on_time.get(tuple).unwrap_or(&false));
        prop_assert_eq!(outcome.schedule.meets_deadlines(), all_on_time);
    }

    /// 6. Post-processing idempotence: running it again on an already
    /// post-processed schedule changes nothing.
    #[test]
    fn post_process_idempotent(tasks in arb_task_set(), params in arb_fault_params()) {
        let Some(mut outcome) = run(tasks, params) else { return Ok(()); };
        let once = outcome.schedule.intervals.clone();
        outcome.schedule.post_process();
        prop_assert_eq!(once, outcome.schedule.intervals);
    }

    /// 7. Stable cores never fail: a core outside the faulty id range never
    /// emits a FAIL interval.
    #[test]
    fn stable_cores_never_fail(tasks in arb_task_set(), params in arb_fault_params()) {
        let Some(outcome) = run(tasks, params) else { return Ok(()); };
        for interval in &outcome.schedule.intervals {
            if interval.kind() == IntervalKind::Fail {
                prop_assert!((interval.core_id as usize) < params.num_faulty);
            }
        }
    }
}
