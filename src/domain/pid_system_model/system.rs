use std::collections::HashSet;

use crate::api::simulation_config_dto::simulation_config_dto::SimulationConfigDto;
use crate::domain::pid_system_model::resource::compute_resource::ComputeResource;
use crate::domain::pid_system_model::scheduler::pid_scheduler::PidScheduler;
use crate::domain::pid_system_model::scheduler::scheduler_config::SchedulerConfig;
use crate::domain::pid_system_model::storage::storage::SharedStorage;
use crate::domain::pid_system_model::workflow::task::TaskTransformation;
use crate::domain::pid_system_model::workflow::workflow::Workflow;
use crate::error::{Error, Result};

/// The simulated infrastructure: one shared storage, the compute resources writing to
/// it and the scheduler tuning.
#[derive(Debug)]
pub struct PidSystem {
    pub shared_storage: SharedStorage,
    pub compute_resources: Vec<ComputeResource>,
    pub config: SchedulerConfig,
}

impl PidSystem {
    /// Hands the system and a workflow to a new scheduler.
    pub fn into_scheduler(self, workflow: Workflow) -> PidScheduler {
        PidScheduler::new(workflow, self.compute_resources, self.shared_storage, self.config)
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfiguration(reason.into())
}

fn validate(dto: &SimulationConfigDto) -> Result<()> {
    if dto.shared_storage_capacity <= 0.0 {
        return Err(invalid(format!("shared storage capacity must be positive, got {}", dto.shared_storage_capacity)));
    }
    if dto.storage_limit <= 0.0 || dto.storage_limit >= dto.shared_storage_capacity {
        return Err(invalid(format!(
            "storage limit {} must be positive and below the shared storage capacity {}",
            dto.storage_limit, dto.shared_storage_capacity
        )));
    }
    if dto.memory_threshold <= 0.0 || dto.memory_threshold > 1.0 {
        return Err(invalid(format!("memory threshold must be in (0, 1], got {}", dto.memory_threshold)));
    }
    if dto.disk_tolerance < 0.0 || dto.memory_tolerance < 0.0 {
        return Err(invalid("controller tolerances must not be negative"));
    }
    if dto.cleanup_duration_factor < 0.0 {
        return Err(invalid("cleanup duration factor must not be negative"));
    }
    if dto.max_ticks.is_some_and(|ticks| ticks <= 0) {
        return Err(invalid("max ticks must be positive"));
    }
    if dto.compute_resources.is_empty() {
        return Err(invalid("at least one compute resource is required"));
    }

    let mut ids = HashSet::new();
    for resource in &dto.compute_resources {
        if !ids.insert(resource.id.as_str()) {
            return Err(invalid(format!("compute resource '{}' is declared more than once", resource.id)));
        }
        if resource.compute_units == 0 {
            return Err(invalid(format!("compute resource '{}' has no compute units", resource.id)));
        }
        if resource.memory_capacity <= 0 {
            return Err(invalid(format!("compute resource '{}' needs a positive memory capacity", resource.id)));
        }
        if resource.local_storage_capacity < 0.0 {
            return Err(invalid(format!("compute resource '{}' has a negative local storage capacity", resource.id)));
        }
        if resource.accepted_tasks.contains(&TaskTransformation::Cleanup) {
            return Err(invalid(format!(
                "compute resource '{}' lists cleanup, which every resource accepts implicitly",
                resource.id
            )));
        }
    }
    Ok(())
}

impl TryFrom<SimulationConfigDto> for PidSystem {
    type Error = Error;

    fn try_from(dto: SimulationConfigDto) -> Result<Self> {
        validate(&dto)?;

        let shared_storage = SharedStorage::new(dto.shared_storage_capacity);

        let compute_resources = dto
            .compute_resources
            .into_iter()
            .map(|resource_dto| {
                let mut resource = ComputeResource::new(
                    resource_dto.id,
                    resource_dto.accepted_tasks,
                    shared_storage.clone(),
                    resource_dto.memory_capacity,
                )
                .with_local_storage(resource_dto.local_storage_capacity);
                resource.generate_compute_units(resource_dto.compute_units);
                resource
            })
            .collect();

        let config = SchedulerConfig {
            enable_pid: dto.enable_pid,
            storage_limit: dto.storage_limit,
            disk_gains: dto.disk_gains,
            disk_tolerance: dto.disk_tolerance,
            memory_threshold: dto.memory_threshold,
            memory_gains: dto.memory_gains,
            memory_tolerance: dto.memory_tolerance,
            cleanup_duration_factor: dto.cleanup_duration_factor,
            estimations: dto.estimations,
            max_ticks: dto.max_ticks,
        };

        Ok(PidSystem { shared_storage, compute_resources, config })
    }
}
