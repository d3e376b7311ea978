pub mod compute_resource_dto;
pub mod simulation_config_dto;
