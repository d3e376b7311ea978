use serde::{Deserialize, Serialize};

use crate::domain::pid_system_model::workflow::task::TaskTransformation;

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResourceDto {
    pub id: String,
    pub accepted_tasks: Vec<TaskTransformation>,
    pub compute_units: usize,
    pub memory_capacity: i64,

    /// Zero means the resource writes to the shared storage only.
    #[serde(default)]
    pub local_storage_capacity: f64,
}

impl ComputeResourceDto {
    /// Large cluster, 2TB RAM, 32 cores.
    pub fn cluster_large() -> Self {
        ComputeResourceDto {
            id: "cluster-large".to_string(),
            accepted_tasks: vec![TaskTransformation::Individuals],
            compute_units: 32,
            memory_capacity: 2000000,
            local_storage_capacity: 0.0,
        }
    }

    /// Intermediate cluster, 192GB RAM, 16 cores.
    pub fn cluster_intermediate() -> Self {
        ComputeResourceDto {
            id: "cluster-intermediate".to_string(),
            accepted_tasks: vec![TaskTransformation::Sifting],
            compute_units: 16,
            memory_capacity: 192000,
            local_storage_capacity: 0.0,
        }
    }

    /// Small cluster, 64GB RAM, 32 cores.
    pub fn cluster_small() -> Self {
        ComputeResourceDto {
            id: "cluster-small".to_string(),
            accepted_tasks: vec![TaskTransformation::Population, TaskTransformation::Pair, TaskTransformation::Frequency],
            compute_units: 32,
            memory_capacity: 100000,
            local_storage_capacity: 0.0,
        }
    }
}
