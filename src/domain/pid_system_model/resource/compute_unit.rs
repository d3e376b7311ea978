use std::fmt;

use crate::domain::pid_system_model::utils::id::ComputeUnitId;
use crate::domain::pid_system_model::workflow::task_store::TaskKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Idle,
    Busy,
}

/// One execution slot of a compute resource. Runs at most one task at a time.
#[derive(Debug, Clone)]
pub struct ComputeUnit {
    pub id: ComputeUnitId,
    status: UnitStatus,
    current_task: Option<TaskKey>,
}

impl ComputeUnit {
    pub fn new(id: ComputeUnitId) -> Self {
        ComputeUnit { id, status: UnitStatus::Idle, current_task: None }
    }

    pub fn get_status(&self) -> UnitStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == UnitStatus::Idle
    }

    pub fn get_current_task(&self) -> Option<TaskKey> {
        self.current_task
    }

    pub fn run_task(&mut self, task: TaskKey) {
        self.status = UnitStatus::Busy;
        self.current_task = Some(task);
    }

    /// Frees the unit and hands back the task it was running.
    pub fn release(&mut self) -> Option<TaskKey> {
        self.status = UnitStatus::Idle;
        self.current_task.take()
    }
}

impl fmt::Display for ComputeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CU: {{id: {}, status: {:?}}}", self.id, self.status)
    }
}
