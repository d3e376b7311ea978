use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::pid_system_model::storage::file::{File, FileLink};
use crate::domain::pid_system_model::utils::id::{FileName, SimTime, TaskId};
use crate::domain::pid_system_model::workflow::task_store::TaskKey;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Idle,
    Queued,
    Running,
    /// Reserved, no simulated path fails a task.
    Failed,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Regular,
    /// Synthesized by the scheduler to free storage. Never charged for storage or memory.
    Cleanup,
}

/// Workflow stage a task belongs to. Derived from the task id prefix before the first `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskTransformation {
    Individuals,
    Sifting,
    Population,
    Pair,
    Frequency,
    Cleanup,
}

impl TaskTransformation {
    /// Derives the transformation from a task id such as `individuals_12`.
    pub fn from_task_id(id: &str) -> Result<Self, Error> {
        let prefix = id.split('_').next().unwrap_or(id);
        prefix.parse()
    }
}

impl FromStr for TaskTransformation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "individuals" => Ok(TaskTransformation::Individuals),
            "sifting" => Ok(TaskTransformation::Sifting),
            "population" => Ok(TaskTransformation::Population),
            "pair" => Ok(TaskTransformation::Pair),
            "frequency" => Ok(TaskTransformation::Frequency),
            "cleanup" => Ok(TaskTransformation::Cleanup),
            other => Err(Error::UnknownTransformation(other.to_string())),
        }
    }
}

impl fmt::Display for TaskTransformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskTransformation::Individuals => "individuals",
            TaskTransformation::Sifting => "sifting",
            TaskTransformation::Population => "population",
            TaskTransformation::Pair => "pair",
            TaskTransformation::Frequency => "frequency",
            TaskTransformation::Cleanup => "cleanup",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub transformation: TaskTransformation,
    pub kind: TaskKind,

    /// Simulated time units the task occupies a compute unit.
    pub duration: f64,
    pub peak_memory: i64,

    pub input_data: HashMap<FileName, File>,
    pub intermediate_data: HashMap<FileName, File>,
    pub output_data: HashMap<FileName, File>,

    /// Keys into the owning workflow's task table.
    pub parent_tasks: Vec<TaskKey>,

    status: TaskStatus,

    /// -1 while the task is not running.
    start_time: SimTime,
    end_time: SimTime,
}

impl Task {
    /// Creates a regular task. The transformation is read from the id prefix, which
    /// must name a regular transformation.
    pub fn new(id: impl Into<String>, duration: f64, peak_memory: i64) -> Result<Self, Error> {
        let id = id.into();
        let transformation = TaskTransformation::from_task_id(&id)?;
        // Cleanup tasks are only synthesized by the scheduler.
        if transformation == TaskTransformation::Cleanup {
            return Err(Error::UnknownTransformation(id));
        }
        Ok(Self::build(TaskId::new(id), transformation, TaskKind::Regular, duration, peak_memory))
    }

    /// Creates a cleanup task which removes the given files once it finishes.
    pub fn new_cleanup(id: impl Into<String>, files: impl IntoIterator<Item = File>, duration: f64) -> Self {
        let mut task = Self::build(TaskId::new(id), TaskTransformation::Cleanup, TaskKind::Cleanup, duration, 0);
        for file in files {
            task.input_data.insert(file.name.clone(), file);
        }
        task
    }

    fn build(id: TaskId, transformation: TaskTransformation, kind: TaskKind, duration: f64, peak_memory: i64) -> Self {
        Task {
            id,
            transformation,
            kind,
            duration,
            peak_memory,
            input_data: HashMap::new(),
            intermediate_data: HashMap::new(),
            output_data: HashMap::new(),
            parent_tasks: Vec::new(),
            status: TaskStatus::Idle,
            start_time: -1,
            end_time: -1,
        }
    }

    pub fn is_cleanup(&self) -> bool {
        self.kind == TaskKind::Cleanup
    }

    pub fn get_status(&self) -> TaskStatus {
        self.status
    }

    pub fn get_start_time(&self) -> SimTime {
        self.start_time
    }

    pub fn get_end_time(&self) -> SimTime {
        self.end_time
    }

    pub fn add_parent(&mut self, parent: TaskKey) {
        if !self.parent_tasks.contains(&parent) {
            self.parent_tasks.push(parent);
        }
    }

    pub fn add_file(&mut self, file: File, link: FileLink) {
        let data = match link {
            FileLink::Input => &mut self.input_data,
            FileLink::Intermediate => &mut self.intermediate_data,
            FileLink::Output => &mut self.output_data,
        };
        data.insert(file.name.clone(), file);
    }

    /// Input, intermediate and output files in that order.
    pub fn all_files(&self) -> impl Iterator<Item = &File> {
        self.input_data.values().chain(self.intermediate_data.values()).chain(self.output_data.values())
    }

    pub fn uses_file(&self, name: &FileName) -> bool {
        self.input_data.contains_key(name) || self.intermediate_data.contains_key(name) || self.output_data.contains_key(name)
    }

    /// `Idle -> Queued`
    pub fn queue(&mut self) -> Result<(), Error> {
        self.transition(TaskStatus::Idle, TaskStatus::Queued)
    }

    /// `Queued -> Running`. Fractional durations end on the next full tick, end times
    /// beyond the clock range saturate.
    pub fn run(&mut self, start_time: SimTime) -> Result<(), Error> {
        self.transition(TaskStatus::Queued, TaskStatus::Running)?;
        self.start_time = start_time;
        self.end_time = start_time.saturating_add(self.duration.ceil() as SimTime);
        Ok(())
    }

    /// `Running -> Idle`, the progress is discarded.
    pub fn preempt(&mut self) -> Result<(), Error> {
        self.transition(TaskStatus::Running, TaskStatus::Idle)?;
        self.start_time = -1;
        self.end_time = -1;
        Ok(())
    }

    /// `Running -> Completed`
    pub fn complete(&mut self) -> Result<(), Error> {
        self.transition(TaskStatus::Running, TaskStatus::Completed)
    }

    fn transition(&mut self, from: TaskStatus, to: TaskStatus) -> Result<(), Error> {
        if self.status != from {
            return Err(Error::IllegalTransition {
                task: self.id.to_string(),
                from: format!("{:?}", self.status),
                to: format!("{:?}", to),
            });
        }
        self.status = to;
        Ok(())
    }
}

fn sorted_names(data: &HashMap<FileName, File>) -> String {
    let mut names: Vec<&str> = data.keys().map(|n| n.as_str()).collect();
    names.sort_unstable();
    names.join(", ")
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task: {{id: {}, duration: {}, peak_memory: {}, status: {:?}, kind: {:?}, parents: {}, input_data: ({}), intermediate_data: ({}), output_data: ({})}}",
            self.id,
            self.duration,
            self.peak_memory,
            self.status,
            self.kind,
            self.parent_tasks.len(),
            sorted_names(&self.input_data),
            sorted_names(&self.intermediate_data),
            sorted_names(&self.output_data)
        )
    }
}
