use crate::domain::pid_system_model::controller::controller::{DEFAULT_TOLERANCE, PidGains};
use crate::domain::pid_system_model::resource::compute_resource::DEFAULT_MEMORY_THRESHOLD;
use crate::domain::pid_system_model::scheduler::estimation::Estimations;
use crate::domain::pid_system_model::utils::id::SimTime;

pub const DEFAULT_STORAGE_CAPACITY: f64 = 500000.0;

/// Storage setpoint of the disk controller, below the physical capacity.
pub const DEFAULT_STORAGE_LIMIT: f64 = 450000.0;

/// Cleanup duration per byte removed.
pub const DEFAULT_CLEANUP_DURATION_FACTOR: f64 = 10.0;

/// Tuning of the [`PidScheduler`](super::pid_scheduler::PidScheduler).
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Without PID control every queued task is tried each time the schedule changed.
    pub enable_pid: bool,

    pub storage_limit: f64,
    pub disk_gains: PidGains,
    pub disk_tolerance: f64,

    /// Memory setpoint of every resource as a fraction of its capacity.
    pub memory_threshold: f64,
    pub memory_gains: PidGains,
    pub memory_tolerance: f64,

    pub cleanup_duration_factor: f64,
    pub estimations: Estimations,

    /// Abort the simulation once this time is reached.
    pub max_ticks: Option<SimTime>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            enable_pid: true,
            storage_limit: DEFAULT_STORAGE_LIMIT,
            disk_gains: PidGains::default(),
            disk_tolerance: DEFAULT_TOLERANCE,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            memory_gains: PidGains::default(),
            memory_tolerance: DEFAULT_TOLERANCE,
            cleanup_duration_factor: DEFAULT_CLEANUP_DURATION_FACTOR,
            estimations: Estimations::default(),
            max_ticks: None,
        }
    }
}
