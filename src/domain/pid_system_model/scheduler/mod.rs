pub mod estimation;
pub mod pid_scheduler;
pub mod scheduler_config;
pub mod simulation_report;
pub mod task_selector;
