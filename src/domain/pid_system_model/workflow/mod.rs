pub mod task;
pub mod task_store;
pub mod workflow;
