use std::collections::{HashMap, HashSet};
use std::fmt;

use slotmap::SecondaryMap;

use crate::domain::pid_system_model::storage::file::{File, FileLink};
use crate::domain::pid_system_model::utils::id::{FileName, TaskId};
use crate::domain::pid_system_model::workflow::task::{Task, TaskStatus};
use crate::domain::pid_system_model::workflow::task_store::{TaskKey, TaskStore};
use crate::error::{Error, Result};

/// A workflow DAG: all tasks, all files and the set of tasks not completed yet.
///
/// Dependencies are recorded on the child only, a parent does not know its children.
/// Cycles are not detected here, a cyclic workflow never becomes ready and is reported
/// by the scheduler as a deadlock.
#[derive(Debug, Default)]
pub struct Workflow {
    pub tasks: TaskStore,
    files: HashMap<FileName, File>,

    /// Tasks not completed yet, iterated in insertion order.
    pending_tasks: SecondaryMap<TaskKey, ()>,
}

impl Workflow {
    pub fn new() -> Self {
        Workflow { tasks: TaskStore::new(), files: HashMap::new(), pending_tasks: SecondaryMap::new() }
    }

    /// Adds a task and marks it pending.
    pub fn add_task(&mut self, task: Task) -> Result<TaskKey> {
        if self.tasks.get_key(&task.id).is_some() {
            return Err(Error::DuplicateTask(task.id.to_string()));
        }
        let key = self.tasks.add(task);
        self.pending_tasks.insert(key, ());
        Ok(key)
    }

    /// Adds a file. A file whose name is already known is ignored.
    pub fn add_file(&mut self, file: File) {
        self.files.entry(file.name.clone()).or_insert(file);
    }

    /// Attaches a known file to a known task in the given role.
    pub fn add_use(&mut self, task_id: &TaskId, file_name: &FileName, link: FileLink) -> Result<()> {
        let file = self.files.get(file_name).cloned().ok_or_else(|| Error::UnknownFile(file_name.to_string()))?;
        let key = self.tasks.get_key(task_id).ok_or_else(|| Error::UnknownTask(task_id.to_string()))?;

        if let Some(task) = self.tasks.get_mut(key) {
            task.add_file(file, link);
        }
        Ok(())
    }

    /// Registers `parent_id` as a parent of `child_id`.
    pub fn add_dependency(&mut self, child_id: &TaskId, parent_id: &TaskId) -> Result<()> {
        let parent_key = self.tasks.get_key(parent_id).ok_or_else(|| Error::UnknownTask(parent_id.to_string()))?;
        let child_key = self.tasks.get_key(child_id).ok_or_else(|| Error::UnknownTask(child_id.to_string()))?;

        if let Some(child) = self.tasks.get_mut(child_key) {
            child.add_parent(parent_key);
        }
        Ok(())
    }

    /// A task is ready once every parent has completed. Tasks without parents are
    /// always ready.
    pub fn is_ready(&self, key: TaskKey) -> bool {
        match self.tasks.get(key) {
            Some(task) => task
                .parent_tasks
                .iter()
                .all(|parent| self.tasks.get(*parent).is_some_and(|p| p.get_status() == TaskStatus::Completed)),
            None => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.pending_tasks.is_empty()
    }

    pub fn is_pending(&self, key: TaskKey) -> bool {
        self.pending_tasks.contains_key(key)
    }

    pub fn num_of_pending_tasks(&self) -> usize {
        self.pending_tasks.len()
    }

    /// Pending task keys in insertion order.
    pub fn pending_keys(&self) -> Vec<TaskKey> {
        self.pending_tasks.keys().collect()
    }

    pub fn pending_task_ids(&self) -> Vec<String> {
        self.pending_tasks.keys().filter_map(|key| self.tasks.get(key)).map(|task| task.id.to_string()).collect()
    }

    /// Removes a finished task from the pending set. The task itself stays in the table.
    pub fn remove_pending(&mut self, key: TaskKey) -> bool {
        self.pending_tasks.remove(key).is_some()
    }

    /// Input files of all pending tasks. These must survive preemption.
    pub fn required_files(&self) -> HashSet<FileName> {
        self.pending_tasks
            .keys()
            .filter_map(|key| self.tasks.get(key))
            .flat_map(|task| task.input_data.keys().cloned())
            .collect()
    }

    pub fn get_file(&self, name: &FileName) -> Option<&File> {
        self.files.get(name)
    }

    pub fn num_of_files(&self) -> usize {
        self.files.len()
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Workflow {{")?;
        writeln!(f, "  tasks:")?;
        for (_, task) in self.tasks.iter() {
            writeln!(f, "    {}", task)?;
        }
        writeln!(f, "  files:")?;
        let mut files: Vec<&File> = self.files.values().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        for file in files {
            writeln!(f, "    {}", file)?;
        }
        writeln!(f, "  pending_tasks: ({})", self.pending_task_ids().join(", "))?;
        write!(f, "}}")
    }
}
