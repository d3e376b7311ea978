use serde::{Deserialize, Serialize};

use crate::api::simulation_config_dto::compute_resource_dto::ComputeResourceDto;
use crate::domain::pid_system_model::controller::controller::{DEFAULT_TOLERANCE, PidGains};
use crate::domain::pid_system_model::resource::compute_resource::DEFAULT_MEMORY_THRESHOLD;
use crate::domain::pid_system_model::scheduler::estimation::Estimations;
use crate::domain::pid_system_model::scheduler::scheduler_config::{
    DEFAULT_CLEANUP_DURATION_FACTOR, DEFAULT_STORAGE_CAPACITY, DEFAULT_STORAGE_LIMIT,
};

/// Simulated system and scheduler tuning as read from a JSON document. Every field
/// is optional, missing fields fall back to the three-cluster default setup.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfigDto {
    pub shared_storage_capacity: f64,
    pub storage_limit: f64,
    pub enable_pid: bool,

    pub disk_gains: PidGains,
    pub disk_tolerance: f64,

    pub memory_threshold: f64,
    pub memory_gains: PidGains,
    pub memory_tolerance: f64,

    pub cleanup_duration_factor: f64,
    pub estimations: Estimations,
    pub max_ticks: Option<i64>,

    pub compute_resources: Vec<ComputeResourceDto>,
}

impl Default for SimulationConfigDto {
    fn default() -> Self {
        SimulationConfigDto {
            shared_storage_capacity: DEFAULT_STORAGE_CAPACITY,
            storage_limit: DEFAULT_STORAGE_LIMIT,
            enable_pid: true,
            disk_gains: PidGains::default(),
            disk_tolerance: DEFAULT_TOLERANCE,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            memory_gains: PidGains::default(),
            memory_tolerance: DEFAULT_TOLERANCE,
            cleanup_duration_factor: DEFAULT_CLEANUP_DURATION_FACTOR,
            estimations: Estimations::default(),
            max_ticks: None,
            compute_resources: vec![
                ComputeResourceDto::cluster_large(),
                ComputeResourceDto::cluster_intermediate(),
                ComputeResourceDto::cluster_small(),
            ],
        }
    }
}
