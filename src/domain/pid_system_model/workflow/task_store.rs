use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;

use crate::domain::pid_system_model::utils::id::TaskId;
use crate::domain::pid_system_model::workflow::task::Task;

new_key_type! {
    pub struct TaskKey;
}

/// Owning table of all tasks of a workflow.
///
/// Tasks refer to each other (parents) and compute units refer to their current task
/// through the internal `TaskKey`, never through an owning reference.
#[derive(Debug, Default)]
pub struct TaskStore {
    /// Task Storage.
    slots: SlotMap<TaskKey, Task>,

    /// Index lookup TaskKey using the task id from the workflow description.
    id_index: HashMap<TaskId, TaskKey>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self { slots: SlotMap::with_key(), id_index: HashMap::new() }
    }

    /// Adds a Task to the store. A task with the same id replaces the old entry in
    /// the id index.
    ///
    /// # Returns
    /// Returns the TaskKey (internal key for TaskStore).
    pub fn add(&mut self, task: Task) -> TaskKey {
        let id = task.id.clone();
        let key = self.slots.insert(task);
        self.id_index.insert(id, key);
        key
    }

    pub fn get(&self, key: TaskKey) -> Option<&Task> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: TaskKey) -> Option<&mut Task> {
        self.slots.get_mut(key)
    }

    /// Get the TaskKey of a task by its id.
    ///
    /// # Returns
    /// Returns Some(TaskKey) if the id is known else return None.
    pub fn get_key(&self, id: &TaskId) -> Option<TaskKey> {
        self.id_index.get(id).copied()
    }

    pub fn get_by_id(&self, id: &TaskId) -> Option<&Task> {
        self.get_key(id).and_then(|key| self.slots.get(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskKey, &Task)> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
