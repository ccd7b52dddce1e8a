//! # CLI entry point
//!
//! A single positional argument: the path to a task-set JSON file. No
//! scheduling flags — `m`, fault rates, and replication factor are contract
//! knobs (see [`ftmgedf_sim::config::SimConfig`]), not CLI surface.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ftmgedf_sim::config::SimConfig;
use ftmgedf_sim::core::CoreSet;
use ftmgedf_sim::display;
use ftmgedf_sim::io::load_task_set;
use ftmgedf_sim::rng::seeded;
use ftmgedf_sim::scheduler::Scheduler;

/// Simulate a fault-tolerant global-EDF schedule for a task set.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the task-set JSON file.
    #[arg(default_value = "demos/sample.json")]
    taskset: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match SimConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let loaded = match load_task_set(&args.taskset, config.active_backups) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let core_set = CoreSet::new(
        config.m,
        config.num_faulty,
        config.bursty_chance,
        config.fault_period_scaler,
        config.lambda_c,
        config.lambda_b,
        config.lambda_r,
    );
    let scheduler = Scheduler::new(loaded.task_set, core_set);
    let mut rng = seeded(0);
    let schedule = scheduler.build_schedule(loaded.start_time, loaded.end_time, &mut rng);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = display::render_by_core(&schedule, &mut handle);

    if schedule.meets_deadlines() {
        println!("\nAll deadlines are met!");
        ExitCode::SUCCESS
    } else {
        println!("\nA deadline was missed.");
        for (task_id, job_id) in &schedule.missed_tuples {
            println!("  task {task_id} job {job_id} missed its deadline");
        }
        ExitCode::FAILURE
    }
}
