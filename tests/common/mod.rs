#![allow(dead_code)]

use pid_workflow_scheduler::domain::pid_system_model::controller::controller::PidGains;
use pid_workflow_scheduler::domain::pid_system_model::resource::compute_resource::ComputeResource;
use pid_workflow_scheduler::domain::pid_system_model::scheduler::estimation::Estimations;
use pid_workflow_scheduler::domain::pid_system_model::scheduler::pid_scheduler::PidScheduler;
use pid_workflow_scheduler::domain::pid_system_model::scheduler::scheduler_config::SchedulerConfig;
use pid_workflow_scheduler::domain::pid_system_model::scheduler::task_selector::FifoSelector;
use pid_workflow_scheduler::domain::pid_system_model::storage::storage::SharedStorage;
use pid_workflow_scheduler::domain::pid_system_model::workflow::task::TaskTransformation;
use pid_workflow_scheduler::domain::pid_system_model::workflow::workflow::Workflow;
use pid_workflow_scheduler::loader::workflow_parser::parse_workflow;

pub const ALL_TRANSFORMATIONS: [TaskTransformation; 5] = [
    TaskTransformation::Individuals,
    TaskTransformation::Sifting,
    TaskTransformation::Population,
    TaskTransformation::Pair,
    TaskTransformation::Frequency,
];

pub fn data_path(file_name: &str) -> String {
    format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), file_name)
}

/// Proportional-only controllers without dead-band and tiny estimates, so admission is
/// limited by the exact storage and memory accounting.
pub fn test_config(storage_limit: f64) -> SchedulerConfig {
    SchedulerConfig {
        storage_limit,
        disk_gains: PidGains::new(1.0, 0.0, 0.0),
        disk_tolerance: 0.0,
        memory_gains: PidGains::new(1.0, 0.0, 0.0),
        memory_tolerance: 0.0,
        estimations: Estimations::uniform(1.0, 1.0),
        ..SchedulerConfig::default()
    }
}

/// One resource running every transformation.
pub fn single_resource_scheduler(
    workflow_description: &str,
    storage_capacity: f64,
    memory_capacity: i64,
    units: usize,
    config: SchedulerConfig,
) -> PidScheduler {
    let workflow: Workflow = parse_workflow(workflow_description).unwrap();
    let shared = SharedStorage::new(storage_capacity);
    let mut resource = ComputeResource::new("cluster", ALL_TRANSFORMATIONS, shared.clone(), memory_capacity);
    resource.generate_compute_units(units);

    PidScheduler::new(workflow, vec![resource], shared, config).with_selector(Box::new(FifoSelector))
}

/// Storage and memory accounting must hold after every tick.
pub fn assert_accounting(scheduler: &PidScheduler) {
    let storage = scheduler.shared_storage().read();
    let resident: f64 = storage.files().map(|file| file.size).sum();
    assert!((storage.get_available() + resident - storage.get_capacity()).abs() < 1e-9);
    assert!(storage.get_available() >= 0.0);

    for resource in scheduler.compute_resources() {
        let busy: i64 = resource
            .compute_units()
            .filter_map(|unit| unit.get_current_task())
            .map(|key| scheduler.workflow().tasks.get(key).unwrap().peak_memory)
            .sum();
        let memory = resource.get_memory();
        assert_eq!(memory.available + busy, memory.capacity);
    }
}

/// Ticks until the workflow completes, checking the accounting after every tick.
pub fn run_checked(scheduler: &mut PidScheduler, max_ticks: usize) {
    for _ in 0..max_ticks {
        if scheduler.workflow().is_completed() {
            return;
        }
        scheduler.tick().unwrap();
        assert_accounting(scheduler);
    }
    panic!("workflow did not complete within {} ticks", max_ticks);
}
