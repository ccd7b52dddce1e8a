//! # Text timeline renderer
//!
//! Stands in for the original's pygame renderer, which cannot run in a
//! terminal. Renders the same event stream — release, deadline, completion
//! markers plus execution/idle/fail bars — as fixed-width text rows, one
//! per core or per task.

use std::io::{self, Write};

use crate::schedule::{IntervalKind, Schedule};
use crate::task::{TaskSet, Time};

fn glyph(kind: IntervalKind) -> char {
    match kind {
        IntervalKind::Exec => '#',
        IntervalKind::Idle => '.',
        IntervalKind::Fail => '!',
    }
}

/// One row per core: a character per tick across `[schedule.start_time,
/// schedule.end_time)` showing what that core was doing.
pub fn render_by_core(schedule: &Schedule, out: &mut dyn Write) -> io::Result<()> {
    let width = (schedule.end_time - schedule.start_time).max(0) as usize;
    let max_core = schedule.intervals.iter().map(|i| i.core_id).max().unwrap_or(0);
    for core_id in 0..=max_core {
        let mut row = vec!['.'; width];
        for interval in schedule.intervals.iter().filter(|i| i.core_id == core_id) {
            let start = (interval.start_time - schedule.start_time).max(0) as usize;
            let end = (interval.end_time - schedule.start_time).max(0) as usize;
            for slot in row.iter_mut().take(end.min(width)).skip(start) {
                *slot = glyph(interval.kind());
            }
        }
        writeln!(out, "core {core_id:>2} |{}|", row.iter().collect::<String>())?;
    }
    Ok(())
}

/// One row per task: release (`v`), deadline (`^`), and completion (`*`)
/// markers layered over the same execution bar, for every job of that task.
pub fn render_by_task(schedule: &Schedule, task_set: &TaskSet, out: &mut dyn Write) -> io::Result<()> {
    let width = (schedule.end_time - schedule.start_time).max(0) as usize;
    for task in &task_set.tasks {
        let mut row = vec!['.'; width];
        for interval in schedule
            .intervals
            .iter()
            .filter(|i| i.task_id == task.id && i.backup_id == 0)
        {
            let start = (interval.start_time - schedule.start_time).max(0) as usize;
            let end = (interval.end_time - schedule.start_time).max(0) as usize;
            for slot in row.iter_mut().take(end.min(width)).skip(start) {
                *slot = glyph(interval.kind());
            }
        }
        for replica in task_set
            .replicas
            .values()
            .filter(|r| r.key.task_id == task.id && r.key.backup_id == 0)
        {
            mark(&mut row, schedule.start_time, replica.release_time, 'v');
            mark(&mut row, schedule.start_time, replica.deadline, '^');
        }
        for interval in schedule
            .intervals
            .iter()
            .filter(|i| i.task_id == task.id && i.job_completed)
        {
            mark(&mut row, schedule.start_time, interval.end_time - 1, '*');
        }
        writeln!(out, "task {:>2} |{}|", task.id, row.iter().collect::<String>())?;
    }
    Ok(())
}

fn mark(row: &mut [char], start_time: Time, at: Time, glyph: char) {
    let idx = at - start_time;
    if idx >= 0 && (idx as usize) < row.len() {
        row[idx as usize] = glyph;
    }
}
