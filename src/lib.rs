use crate::domain::pid_system_model::scheduler::simulation_report::SimulationReport;
use crate::domain::pid_system_model::scheduler::task_selector::{RandomSelector, TaskSelector};
use crate::error::Result;
use crate::domain::pid_system_model::system::PidSystem;
use crate::loader::parser::load_config;
use crate::loader::workflow_parser::parse_workflow_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Options of a single simulation run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// JSON simulation configuration, the three-cluster default setup without one.
    pub config_path: Option<String>,
    /// Overrides `enablePid` of the configuration when set.
    pub disable_pid: bool,
    /// Seed of the random task selection.
    pub seed: Option<u64>,
    /// Overrides `maxTicks` of the configuration when set.
    pub max_ticks: Option<i64>,
}

/// Loads the system and the workflow and simulates the workflow until it completes.
pub fn run_simulation(workflow_path: &str, options: &RunOptions) -> Result<SimulationReport> {
    let mut config = load_config(options.config_path.as_deref())?;

    // Overrides go through the same validation as the file contents.
    if options.disable_pid {
        config.enable_pid = false;
    }
    if options.max_ticks.is_some() {
        config.max_ticks = options.max_ticks;
    }

    let system = PidSystem::try_from(config)?;
    log::info!("Simulated system constructed with {} compute resources.", system.compute_resources.len());

    let workflow = parse_workflow_file(workflow_path)?;

    let selector: Box<dyn TaskSelector> = match options.seed {
        Some(seed) => Box::new(RandomSelector::seeded(seed)),
        None => Box::new(RandomSelector::new()),
    };

    system.into_scheduler(workflow).with_selector(selector).start()
}
