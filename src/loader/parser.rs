use serde::de::DeserializeOwned;
use std::fs;

use crate::api::simulation_config_dto::simulation_config_dto::SimulationConfigDto;
use crate::domain::pid_system_model::system::PidSystem;
use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// Errors are automatically converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path).map_err(Error::IoError)?;

    let parsed_data: T = serde_json::from_str(&data).map_err(Error::DeserializationError)?;

    Ok(parsed_data)
}

/// Reads a JSON simulation configuration, or returns the default three-cluster
/// setup without one. Nothing is validated yet.
pub fn load_config(config_path: Option<&str>) -> Result<SimulationConfigDto> {
    match config_path {
        Some(path) => {
            log::info!("Loading simulation configuration from '{}'.", path);
            parse_json_file::<SimulationConfigDto>(path)
        }
        None => Ok(SimulationConfigDto::default()),
    }
}

/// Builds and validates the simulated system from a JSON configuration file, or the
/// default setup without one.
pub fn load_system(config_path: Option<&str>) -> Result<PidSystem> {
    PidSystem::try_from(load_config(config_path)?)
}
