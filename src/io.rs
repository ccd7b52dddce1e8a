//! # JSON task-set and schedule I/O
//!
//! Wire formats mirror the original Python tool's JSON schema: a `taskset`
//! array of task records, a `startTime`/`endTime` horizon, and an optional
//! `releaseTimes` array for sporadic task sets. Parsing goes through
//! `serde_json` into these DTOs and is then lowered into [`crate::task::Task`]
//! and [`crate::task::TaskSet`] — no hand-rolled JSON walking.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::schedule::Schedule;
use crate::task::{Task, TaskSet, Time};

#[derive(Debug, Deserialize)]
struct TaskRecord {
    #[serde(rename = "taskId")]
    task_id: i64,
    period: f64,
    wcet: f64,
    deadline: Option<f64>,
    offset: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReleaseRecord {
    #[serde(rename = "taskId")]
    task_id: i64,
    #[serde(rename = "timeInstant")]
    time_instant: f64,
}

#[derive(Debug, Deserialize)]
struct TaskSetFile {
    taskset: Vec<TaskRecord>,
    #[serde(rename = "startTime")]
    start_time: f64,
    #[serde(rename = "endTime")]
    end_time: f64,
    #[serde(rename = "releaseTimes")]
    release_times: Option<Vec<ReleaseRecord>>,
}

/// A loaded task set plus the horizon it was parsed with.
pub struct LoadedTaskSet {
    pub task_set: TaskSet,
    pub start_time: Time,
    pub end_time: Time,
}

pub fn load_task_set(path: impl AsRef<Path>, active_backups: u32) -> Result<LoadedTaskSet, SimError> {
    let raw = std::fs::read_to_string(path)?;
    parse_task_set(&raw, active_backups)
}

pub fn parse_task_set(raw: &str, active_backups: u32) -> Result<LoadedTaskSet, SimError> {
    let file: TaskSetFile = serde_json::from_str(raw)?;
    let start_time = file.start_time as Time;
    let end_time = file.end_time as Time;

    let tasks: Vec<Task> = file
        .taskset
        .iter()
        .map(|t| {
            let period = if t.period < 0.0 { None } else { Some(t.period as Time) };
            let relative_deadline = t.deadline.unwrap_or(t.period) as Time;
            Task {
                id: t.task_id,
                offset: t.offset.unwrap_or(0.0) as Time,
                period,
                wcet: t.wcet as Time,
                relative_deadline,
            }
        })
        .collect();

    let mut sporadic: HashMap<i64, Vec<Time>> = HashMap::new();
    if let Some(releases) = &file.release_times {
        for r in releases {
            sporadic
                .entry(r.task_id)
                .or_default()
                .push(r.time_instant as Time);
        }
    }

    let task_set = TaskSet::build(tasks, active_backups, start_time, end_time, &sporadic)?;
    Ok(LoadedTaskSet {
        task_set,
        start_time,
        end_time,
    })
}

#[derive(Debug, Serialize)]
struct IntervalRecord {
    #[serde(rename = "timeInstant")]
    time_instant: Time,
    #[serde(rename = "taskId")]
    task_id: i64,
    #[serde(rename = "jobId")]
    job_id: i64,
    #[serde(rename = "didPreempt")]
    did_preempt: bool,
    #[serde(rename = "coreId")]
    core_id: u32,
}

#[derive(Debug, Serialize)]
struct ScheduleOutput {
    #[serde(rename = "startTime")]
    start_time: Time,
    #[serde(rename = "endTime")]
    end_time: Time,
    intervals: Vec<IntervalRecord>,
}

#[derive(Debug, Serialize)]
struct ScheduleFile {
    #[serde(rename = "scheduleOutput")]
    schedule_output: ScheduleOutput,
}

pub fn schedule_to_json(schedule: &Schedule) -> Result<String, SimError> {
    let intervals = schedule
        .intervals
        .iter()
        .map(|i| IntervalRecord {
            time_instant: i.start_time,
            task_id: i.task_id,
            job_id: i.job_id,
            did_preempt: i.did_preempt,
            core_id: i.core_id,
        })
        .collect();
    let file = ScheduleFile {
        schedule_output: ScheduleOutput {
            start_time: schedule.start_time,
            end_time: schedule.end_time,
            intervals,
        },
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_periodic_task_set() {
        let raw = r#"{
            "taskset": [
                {"taskId": 1, "period": 3, "wcet": 1, "deadline": 3, "offset": 0}
            ],
            "startTime": 0,
            "endTime": 6
        }"#;
        let loaded = parse_task_set(raw, 0).unwrap();
        assert_eq!(loaded.task_set.tasks.len(), 1);
        assert_eq!(loaded.start_time, 0);
        assert_eq!(loaded.end_time, 6);
    }

    #[test]
    fn parses_sporadic_release_times() {
        let raw = r#"{
            "taskset": [
                {"taskId": 1, "period": -1, "wcet": 1, "deadline": 5}
            ],
            "startTime": 0,
            "endTime": 10,
            "releaseTimes": [
                {"taskId": 1, "timeInstant": 0},
                {"taskId": 1, "timeInstant": 6}
            ]
        }"#;
        let loaded = parse_task_set(raw, 0).unwrap();
        let mut releases: Vec<Time> = loaded
            .task_set
            .replicas
            .values()
            .map(|r| r.release_time)
            .collect();
        releases.sort();
        assert_eq!(releases, vec![0, 6]);
    }
}
