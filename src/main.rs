use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::LevelFilter;

use pid_workflow_scheduler::domain::pid_system_model::utils::statistics;
use pid_workflow_scheduler::{RunOptions, logger, run_simulation};

/// Simulates a workflow on finite storage and memory with PID-controlled admission.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Workflow description file
    workflow: String,

    /// Admit every queued task whenever the schedule changed, without controllers
    #[arg(long)]
    no_pid: bool,

    /// JSON simulation configuration
    #[arg(long)]
    config: Option<String>,

    /// Seed for the random task selection
    #[arg(long)]
    seed: Option<u64>,

    /// Write scheduling events as CSV to this file
    #[arg(long)]
    stats: Option<String>,

    /// Abort once the simulated time reaches this value
    #[arg(long)]
    max_ticks: Option<i64>,

    /// off, error, warn, info, debug or trace
    #[arg(long, value_parser = parse_level)]
    log_level: Option<LevelFilter>,
}

fn parse_level(level: &str) -> std::result::Result<LevelFilter, String> {
    level.parse().map_err(|_| format!("unknown log level '{}'", level))
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.log_level);

    if let Some(path) = &args.stats {
        statistics::init_global(Some(path.as_str())).with_context(|| format!("Failed to create statistics file '{}'", path))?;
    }

    let options =
        RunOptions { config_path: args.config.clone(), disable_pid: args.no_pid, seed: args.seed, max_ticks: args.max_ticks };

    let result = run_simulation(&args.workflow, &options)
        .with_context(|| format!("Simulation of workflow '{}' failed", args.workflow));

    statistics::shutdown_global();

    let report = result?;
    println!("{} {}", "Workflow Makespan:".green().bold(), report.makespan);
    log::info!(
        "Scheduled {} tasks, preempted {}, created {} cleanup tasks.",
        report.num_of_scheduled_tasks,
        report.num_of_preempted_tasks,
        report.num_of_cleanup_tasks
    );

    Ok(())
}
