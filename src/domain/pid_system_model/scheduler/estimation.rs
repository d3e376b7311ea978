use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::domain::pid_system_model::workflow::task::TaskTransformation;

lazy_static! {
    /// Mean storage footprint per transformation, measured on real executions.
    pub static ref DEFAULT_STORAGE_ESTIMATION: HashMap<TaskTransformation, f64> = HashMap::from([
        (TaskTransformation::Individuals, 173795.35),
        (TaskTransformation::Sifting, 948.51),
        (TaskTransformation::Population, 0.14),
        (TaskTransformation::Pair, 1837.15),
        (TaskTransformation::Frequency, 1837.15),
    ]);

    /// Mean peak memory per transformation, measured on real executions.
    pub static ref DEFAULT_MEMORY_ESTIMATION: HashMap<TaskTransformation, f64> = HashMap::from([
        (TaskTransformation::Individuals, 411080.18),
        (TaskTransformation::Sifting, 7956.18),
        (TaskTransformation::Population, 1.00),
        (TaskTransformation::Pair, 18237.66),
        (TaskTransformation::Frequency, 8372.45),
    ]);
}

/// Estimated storage and memory footprints per transformation.
///
/// The estimates only gate admission and preemption decisions, exact usage is tracked
/// by the storages and compute resources. A transformation without an entry is
/// estimated at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Estimations {
    pub storage: HashMap<TaskTransformation, f64>,
    pub memory: HashMap<TaskTransformation, f64>,
}

impl Estimations {
    pub fn new(storage: HashMap<TaskTransformation, f64>, memory: HashMap<TaskTransformation, f64>) -> Self {
        Estimations { storage, memory }
    }

    /// The same storage and memory estimate for every transformation.
    pub fn uniform(storage: f64, memory: f64) -> Self {
        let all = [
            TaskTransformation::Individuals,
            TaskTransformation::Sifting,
            TaskTransformation::Population,
            TaskTransformation::Pair,
            TaskTransformation::Frequency,
        ];
        Estimations {
            storage: all.iter().map(|t| (*t, storage)).collect(),
            memory: all.iter().map(|t| (*t, memory)).collect(),
        }
    }

    pub fn storage_for(&self, transformation: TaskTransformation) -> f64 {
        self.storage.get(&transformation).copied().unwrap_or(0.0)
    }

    pub fn memory_for(&self, transformation: TaskTransformation) -> f64 {
        self.memory.get(&transformation).copied().unwrap_or(0.0)
    }
}

impl Default for Estimations {
    fn default() -> Self {
        Estimations { storage: DEFAULT_STORAGE_ESTIMATION.clone(), memory: DEFAULT_MEMORY_ESTIMATION.clone() }
    }
}
