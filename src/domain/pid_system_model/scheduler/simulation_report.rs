use crate::domain::pid_system_model::utils::id::{ComputeResourceId, ComputeUnitId, FileName, SimTime, TaskId};
use crate::domain::pid_system_model::utils::statistics::{StatParameter, StatisticEvent};

/// Something the scheduler did to the simulated system.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    Scheduled { time: SimTime, task: TaskId, resource: ComputeResourceId, unit: ComputeUnitId },
    Finished { time: SimTime, task: TaskId, resource: ComputeResourceId },
    Preempted { time: SimTime, task: TaskId, resource: ComputeResourceId },
    CleanupCreated { time: SimTime, task: TaskId, files: Vec<FileName>, total_size: f64 },
}

impl SchedulerEvent {
    pub fn time(&self) -> SimTime {
        match self {
            SchedulerEvent::Scheduled { time, .. }
            | SchedulerEvent::Finished { time, .. }
            | SchedulerEvent::Preempted { time, .. }
            | SchedulerEvent::CleanupCreated { time, .. } => *time,
        }
    }

    pub fn task(&self) -> &TaskId {
        match self {
            SchedulerEvent::Scheduled { task, .. }
            | SchedulerEvent::Finished { task, .. }
            | SchedulerEvent::Preempted { task, .. }
            | SchedulerEvent::CleanupCreated { task, .. } => task,
        }
    }

    pub fn to_statistic_event(&self) -> StatisticEvent {
        let mut event = StatisticEvent::new();
        event.set(StatParameter::Time, self.time()).set(StatParameter::TaskName, self.task().to_string());

        match self {
            SchedulerEvent::Scheduled { resource, .. } => {
                event.set(StatParameter::Event, "SCHEDULED").set(StatParameter::ResourceName, resource.to_string());
            }
            SchedulerEvent::Finished { resource, .. } => {
                event.set(StatParameter::Event, "FINISHED").set(StatParameter::ResourceName, resource.to_string());
            }
            SchedulerEvent::Preempted { resource, .. } => {
                event.set(StatParameter::Event, "PREEMPTED").set(StatParameter::ResourceName, resource.to_string());
            }
            SchedulerEvent::CleanupCreated { total_size, .. } => {
                event.set(StatParameter::Event, "CLEANUP_CREATED").set(StatParameter::CleanupSize, *total_size);
            }
        }
        event
    }
}

/// Outcome of a complete simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    /// Ticks from the first scheduling decision until the last task completed.
    pub makespan: SimTime,
    pub num_of_scheduled_tasks: usize,
    pub num_of_preempted_tasks: usize,
    pub num_of_cleanup_tasks: usize,

    /// All events in the order they happened.
    pub events: Vec<SchedulerEvent>,
}

impl SimulationReport {
    pub fn push(&mut self, event: SchedulerEvent) {
        match &event {
            SchedulerEvent::Scheduled { .. } => self.num_of_scheduled_tasks += 1,
            SchedulerEvent::Preempted { .. } => self.num_of_preempted_tasks += 1,
            SchedulerEvent::CleanupCreated { .. } => self.num_of_cleanup_tasks += 1,
            SchedulerEvent::Finished { .. } => {}
        }
        self.events.push(event);
    }

    /// Events concerning one task, in order.
    pub fn events_of<'a>(&'a self, task: &'a str) -> impl Iterator<Item = &'a SchedulerEvent> + 'a {
        self.events.iter().filter(move |event| event.task().as_str() == task)
    }

    pub fn finish_time_of(&self, task: &str) -> Option<SimTime> {
        self.events_of(task).filter(|event| matches!(event, SchedulerEvent::Finished { .. })).map(|event| event.time()).last()
    }

    pub fn start_time_of(&self, task: &str) -> Option<SimTime> {
        self.events_of(task).filter(|event| matches!(event, SchedulerEvent::Scheduled { .. })).map(|event| event.time()).last()
    }
}
