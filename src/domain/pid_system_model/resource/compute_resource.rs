use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;

use crate::domain::pid_system_model::controller::controller::{Controller, DEFAULT_TOLERANCE, PidGains};
use crate::domain::pid_system_model::resource::compute_unit::ComputeUnit;
use crate::domain::pid_system_model::storage::storage::{SharedStorage, Storage};
use crate::domain::pid_system_model::utils::id::{ComputeResourceId, ComputeUnitId, FileName};
use crate::domain::pid_system_model::workflow::task::{Task, TaskTransformation};
use crate::domain::pid_system_model::workflow::task_store::{TaskKey, TaskStore};
use crate::error::{AdmissionError, Error};

/// Default memory setpoint, as a fraction of the memory capacity.
pub const DEFAULT_MEMORY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memory {
    pub capacity: i64,
    pub available: i64,
}

/// A pool of identical compute units with a memory budget.
///
/// Admitted task files go to the local storage if the resource has one, otherwise to
/// the shared storage. Invariant: `memory.available == memory.capacity - sum(peak
/// memory of the tasks on busy units)`.
#[derive(Debug)]
pub struct ComputeResource {
    pub id: ComputeResourceId,

    /// Transformations this resource runs. Cleanup tasks are always accepted.
    accepted_tasks: HashSet<TaskTransformation>,

    shared_storage: SharedStorage,
    local_storage: Option<Storage>,

    memory: Memory,
    compute_units: BTreeMap<ComputeUnitId, ComputeUnit>,
    mem_controller: Controller,
}

impl ComputeResource {
    pub fn new(
        id: impl Into<String>,
        accepted_tasks: impl IntoIterator<Item = TaskTransformation>,
        shared_storage: SharedStorage,
        memory_capacity: i64,
    ) -> Self {
        ComputeResource {
            id: ComputeResourceId::new(id),
            accepted_tasks: accepted_tasks.into_iter().collect(),
            shared_storage,
            local_storage: None,
            memory: Memory { capacity: memory_capacity, available: memory_capacity },
            compute_units: BTreeMap::new(),
            mem_controller: Controller::new(
                DEFAULT_MEMORY_THRESHOLD * memory_capacity as f64,
                PidGains::default(),
                DEFAULT_TOLERANCE,
            ),
        }
    }

    /// Gives the resource its own storage pool. A capacity of zero means none.
    pub fn with_local_storage(mut self, capacity: f64) -> Self {
        self.local_storage = if capacity > 0.0 { Some(Storage::new(capacity)) } else { None };
        self
    }

    /// Replaces the compute units by `count` fresh idle units.
    pub fn generate_compute_units(&mut self, count: usize) {
        self.compute_units = (0..count).map(|id| (id, ComputeUnit::new(id))).collect();
    }

    /// Sets the memory controller with a setpoint of `memory_threshold * capacity`.
    pub fn set_mem_controller(&mut self, memory_threshold: f64, gains: PidGains, tolerance: f64) {
        self.mem_controller = Controller::new(memory_threshold * self.memory.capacity as f64, gains, tolerance);
    }

    pub fn get_memory(&self) -> Memory {
        self.memory
    }

    pub fn get_current_used_memory(&self) -> i64 {
        self.memory.capacity - self.memory.available
    }

    pub fn get_local_storage(&self) -> Option<&Storage> {
        self.local_storage.as_ref()
    }

    pub fn compute_units(&self) -> impl Iterator<Item = &ComputeUnit> {
        self.compute_units.values()
    }

    pub fn accepts(&self, task: &Task) -> bool {
        task.is_cleanup() || self.accepted_tasks.contains(&task.transformation)
    }

    /// Tries to start a task on an idle compute unit.
    ///
    /// Storage is checked before memory and both checks happen before anything is
    /// mutated, a failed admission leaves the resource untouched.
    ///
    /// # Returns
    /// `Ok(Some(unit))` on success, `Ok(None)` if the transformation is not accepted or
    /// all units are busy, and an `AdmissionError` if storage or memory is exhausted.
    pub fn run_task(&mut self, key: TaskKey, tasks: &TaskStore) -> Result<Option<ComputeUnitId>, AdmissionError> {
        let Some(task) = tasks.get(key) else {
            return Ok(None);
        };

        if !self.accepts(task) {
            return Ok(None);
        }

        let Some(unit_id) = self.compute_units.values().find(|unit| unit.is_idle()).map(|unit| unit.id) else {
            return Ok(None);
        };

        if !task.is_cleanup() {
            let (required_storage, available) = match &self.local_storage {
                Some(local) => (local.required_storage(task.all_files()), local.get_available()),
                None => {
                    let shared = self.shared_storage.read();
                    (shared.required_storage(task.all_files()), shared.get_available())
                }
            };

            if required_storage > available {
                return Err(AdmissionError::InsufficientSpace { required: required_storage, available });
            }

            if task.peak_memory > self.memory.available {
                return Err(AdmissionError::InsufficientMemory {
                    resource: self.id.to_string(),
                    required: task.peak_memory,
                    available: self.memory.available,
                });
            }

            self.add_to_storage(task)?;
            self.memory.available -= task.peak_memory;
        }

        if let Some(unit) = self.compute_units.get_mut(&unit_id) {
            unit.run_task(key);
        }

        Ok(Some(unit_id))
    }

    /// Retires the task of a unit: refunds its memory, releases its files and marks it
    /// completed.
    ///
    /// # Returns
    /// The finished task, or `None` if the unit was idle.
    pub fn process_finished_task(&mut self, unit_id: ComputeUnitId, tasks: &mut TaskStore) -> Result<Option<TaskKey>, Error> {
        let Some(key) = self.compute_units.get(&unit_id).and_then(|unit| unit.get_current_task()) else {
            return Ok(None);
        };

        if let Some(task) = tasks.get(key) {
            self.memory.available += task.peak_memory;
            self.clean_files(task, tasks, &HashSet::new());
        }

        if let Some(unit) = self.compute_units.get_mut(&unit_id) {
            unit.release();
        }

        if let Some(task) = tasks.get_mut(key) {
            task.complete()?;
        }

        Ok(Some(key))
    }

    /// Stops a running task and resets it to idle. Its files are released unless they
    /// are in `required_files` or used by another busy unit of this resource.
    ///
    /// # Returns
    /// The preempted task, or `None` if it does not run on this resource.
    pub fn preempt_task(
        &mut self,
        key: TaskKey,
        required_files: &HashSet<FileName>,
        tasks: &mut TaskStore,
    ) -> Result<Option<TaskKey>, Error> {
        let Some(unit) = self.compute_units.values_mut().find(|unit| unit.get_current_task() == Some(key)) else {
            return Ok(None);
        };
        unit.release();

        let Some(task) = tasks.get_mut(key) else {
            return Ok(None);
        };
        task.preempt()?;

        if let Some(task) = tasks.get(key) {
            self.clean_files(task, tasks, required_files);
            self.memory.available += task.peak_memory;
        }

        Ok(Some(key))
    }

    /// Files referenced by the regular tasks currently running on this resource.
    pub fn get_list_of_current_used_files(&self, tasks: &TaskStore) -> HashSet<FileName> {
        self.running_regular_tasks(tasks).flat_map(|(_, task)| task.all_files().map(|f| f.name.clone())).collect()
    }

    /// Regular tasks currently running on this resource, cleanup tasks are skipped.
    pub fn get_running_tasks(&self, tasks: &TaskStore) -> Vec<TaskKey> {
        self.running_regular_tasks(tasks).map(|(key, _)| key).collect()
    }

    /// Number of busy units, cleanup tasks included.
    pub fn num_of_busy_units(&self) -> usize {
        self.compute_units.values().filter(|unit| !unit.is_idle()).count()
    }

    /// Feeds the current memory usage into the memory controller. The signal is
    /// clamped to the memory capacity.
    pub fn get_mem_controller_input(&mut self) -> f64 {
        let controller_input = self.mem_controller.process(self.get_current_used_memory() as f64);
        controller_input.min(self.memory.capacity as f64)
    }

    /// Human readable utilization snapshot.
    pub fn describe(&self, tasks: &TaskStore) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Resource {{");
        let _ = writeln!(out, "  id: {}", self.id);
        if let Some(local) = &self.local_storage {
            let _ = writeln!(out, "  local storage: {}", local);
        }
        let _ = writeln!(out, "  shared storage: {}", *self.shared_storage.read());
        let _ = writeln!(out, "  memory: capacity: {}, available: {}", self.memory.capacity, self.memory.available);
        let _ = writeln!(out, "  compute_units:");
        for unit in self.compute_units.values().filter(|unit| !unit.is_idle()) {
            let task_id = unit.get_current_task().and_then(|key| tasks.get(key)).map(|task| task.id.to_string()).unwrap_or_default();
            let _ = writeln!(out, "    {} running {}", unit, task_id);
        }
        out.push('}');
        out
    }

    fn running_regular_tasks<'a>(&'a self, tasks: &'a TaskStore) -> impl Iterator<Item = (TaskKey, &'a Task)> + 'a {
        self.compute_units
            .values()
            .filter_map(|unit| unit.get_current_task())
            .filter_map(|key| tasks.get(key).map(|task| (key, task)))
            .filter(|(_, task)| !task.is_cleanup())
    }

    fn add_to_storage(&mut self, task: &Task) -> Result<(), AdmissionError> {
        match &mut self.local_storage {
            Some(local) => {
                for file in task.all_files() {
                    local.add_file(file)?;
                }
            }
            None => {
                let mut shared = self.shared_storage.write();
                for file in task.all_files() {
                    shared.add_file(file)?;
                }
            }
        }
        Ok(())
    }

    /// Releases the input files of a task, and its intermediate files for a regular
    /// task. Files in `required_files` or used by another running regular task of this
    /// resource are kept.
    fn clean_files(&mut self, task: &Task, tasks: &TaskStore, required_files: &HashSet<FileName>) {
        let mut to_remove: Vec<&FileName> = task.input_data.keys().collect();
        if !task.is_cleanup() {
            to_remove.extend(task.intermediate_data.keys());
        }

        to_remove.retain(|name| !required_files.contains(*name));
        to_remove.retain(|name| {
            !self
                .running_regular_tasks(tasks)
                .any(|(_, other)| other.id != task.id && other.uses_file(name))
        });

        for name in to_remove {
            if let Some(local) = self.local_storage.as_mut().filter(|local| local.contains(name)) {
                local.remove_file(name);
            } else {
                self.shared_storage.write().remove_file(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pid_system_model::storage::file::{File, FileLink};

    fn add_task(tasks: &mut TaskStore, id: &str, peak_memory: i64, files: &[(&str, f64, FileLink)]) -> TaskKey {
        let mut task = Task::new(id, 10.0, peak_memory).unwrap();
        for (name, size, link) in files {
            task.add_file(File::new(*name, *size), *link);
        }
        task.queue().unwrap();
        tasks.add(task)
    }

    fn assert_memory_accounting(resource: &ComputeResource, tasks: &TaskStore) {
        let busy: i64 = resource
            .compute_units()
            .filter_map(|unit| unit.get_current_task())
            .map(|key| tasks.get(key).unwrap().peak_memory)
            .sum();
        let memory = resource.get_memory();
        assert_eq!(memory.available + busy, memory.capacity);
    }

    fn resource(shared: &SharedStorage, units: usize, memory: i64) -> ComputeResource {
        let mut resource =
            ComputeResource::new("cluster", [TaskTransformation::Sifting, TaskTransformation::Pair], shared.clone(), memory);
        resource.generate_compute_units(units);
        resource
    }

    #[test]
    fn test_admission_charges_storage_and_memory() {
        let shared = SharedStorage::new(100.0);
        let mut resource = resource(&shared, 2, 1000);
        let mut tasks = TaskStore::new();
        let key = add_task(&mut tasks, "sifting_1", 300, &[("a", 10.0, FileLink::Input), ("b", 5.0, FileLink::Output)]);

        let unit = resource.run_task(key, &tasks).unwrap();

        assert_eq!(unit, Some(0));
        assert_eq!(shared.current_used_storage(), 15.0);
        assert_eq!(resource.get_current_used_memory(), 300);
        assert_memory_accounting(&resource, &tasks);
    }

    #[test]
    fn test_unaccepted_transformation_is_not_admitted() {
        let shared = SharedStorage::new(100.0);
        let mut resource = resource(&shared, 1, 1000);
        let mut tasks = TaskStore::new();
        let key = add_task(&mut tasks, "individuals_1", 1, &[]);

        assert_eq!(resource.run_task(key, &tasks), Ok(None));
    }

    #[test]
    fn test_no_free_unit() {
        let shared = SharedStorage::new(100.0);
        let mut resource = resource(&shared, 1, 1000);
        let mut tasks = TaskStore::new();
        let first = add_task(&mut tasks, "sifting_1", 1, &[]);
        let second = add_task(&mut tasks, "sifting_2", 1, &[]);

        assert_eq!(resource.run_task(first, &tasks), Ok(Some(0)));
        assert_eq!(resource.run_task(second, &tasks), Ok(None));
    }

    #[test]
    fn test_insufficient_space_leaves_state_untouched() {
        let shared = SharedStorage::new(20.0);
        let mut resource = resource(&shared, 1, 1000);
        let mut tasks = TaskStore::new();
        let key = add_task(&mut tasks, "sifting_1", 100, &[("a", 15.0, FileLink::Input), ("b", 10.0, FileLink::Output)]);

        let result = resource.run_task(key, &tasks);

        assert_eq!(result, Err(AdmissionError::InsufficientSpace { required: 25.0, available: 20.0 }));
        assert_eq!(result.unwrap_err().deficit(), 5.0);
        assert_eq!(shared.current_used_storage(), 0.0);
        assert_eq!(resource.get_current_used_memory(), 0);
        assert_eq!(resource.num_of_busy_units(), 0);
    }

    #[test]
    fn test_insufficient_memory_leaves_state_untouched() {
        let shared = SharedStorage::new(100.0);
        let mut resource = resource(&shared, 2, 100);
        let mut tasks = TaskStore::new();
        let key = add_task(&mut tasks, "sifting_1", 101, &[("a", 15.0, FileLink::Input)]);

        assert!(matches!(resource.run_task(key, &tasks), Err(AdmissionError::InsufficientMemory { .. })));
        assert_eq!(shared.current_used_storage(), 0.0);
        assert_eq!(resource.num_of_busy_units(), 0);
    }

    #[test]
    fn test_resident_files_are_not_charged_twice() {
        let shared = SharedStorage::new(30.0);
        let mut resource = resource(&shared, 2, 1000);
        let mut tasks = TaskStore::new();
        let first = add_task(&mut tasks, "sifting_1", 1, &[("shared", 20.0, FileLink::Input)]);
        let second = add_task(&mut tasks, "pair_1", 1, &[("shared", 20.0, FileLink::Input), ("x", 10.0, FileLink::Output)]);

        resource.run_task(first, &tasks).unwrap();
        assert_eq!(resource.run_task(second, &tasks), Ok(Some(1)));
        assert_eq!(shared.current_used_storage(), 30.0);
    }

    #[test]
    fn test_finish_releases_inputs_and_intermediates_but_keeps_outputs() {
        let shared = SharedStorage::new(100.0);
        let mut resource = resource(&shared, 2, 1000);
        let mut tasks = TaskStore::new();
        let key = add_task(
            &mut tasks,
            "sifting_1",
            50,
            &[("in", 10.0, FileLink::Input), ("tmp", 20.0, FileLink::Intermediate), ("out", 5.0, FileLink::Output)],
        );
        let unit = resource.run_task(key, &tasks).unwrap().unwrap();
        tasks.get_mut(key).unwrap().run(1).unwrap();

        assert_eq!(resource.process_finished_task(unit, &mut tasks).unwrap(), Some(key));

        let storage = shared.read();
        assert!(storage.contains(&FileName::new("out")));
        assert!(!storage.contains(&FileName::new("in")));
        assert!(!storage.contains(&FileName::new("tmp")));
        assert_eq!(resource.get_current_used_memory(), 0);
        assert_eq!(tasks.get(key).unwrap().get_status(), crate::domain::pid_system_model::workflow::task::TaskStatus::Completed);
    }

    #[test]
    fn test_files_used_by_other_busy_units_survive() {
        let shared = SharedStorage::new(100.0);
        let mut resource = resource(&shared, 2, 1000);
        let mut tasks = TaskStore::new();
        let first = add_task(&mut tasks, "sifting_1", 1, &[("common", 10.0, FileLink::Input)]);
        let second = add_task(&mut tasks, "pair_1", 1, &[("common", 10.0, FileLink::Input)]);
        let unit = resource.run_task(first, &tasks).unwrap().unwrap();
        resource.run_task(second, &tasks).unwrap();
        tasks.get_mut(first).unwrap().run(1).unwrap();

        resource.process_finished_task(unit, &mut tasks).unwrap();

        assert!(shared.read().contains(&FileName::new("common")));
    }

    #[test]
    fn test_preemption_keeps_required_files_and_refunds_memory() {
        let shared = SharedStorage::new(100.0);
        let mut resource = resource(&shared, 2, 1000);
        let mut tasks = TaskStore::new();
        let key = add_task(&mut tasks, "sifting_1", 400, &[("needed", 10.0, FileLink::Input), ("tmp", 20.0, FileLink::Intermediate)]);
        resource.run_task(key, &tasks).unwrap();
        tasks.get_mut(key).unwrap().run(1).unwrap();

        let required: HashSet<FileName> = [FileName::new("needed")].into_iter().collect();
        assert_eq!(resource.preempt_task(key, &required, &mut tasks).unwrap(), Some(key));

        assert!(shared.read().contains(&FileName::new("needed")));
        assert!(!shared.read().contains(&FileName::new("tmp")));
        assert_eq!(resource.get_current_used_memory(), 0);
        assert_eq!(resource.num_of_busy_units(), 0);
        assert_eq!(tasks.get(key).unwrap().get_start_time(), -1);
        assert_memory_accounting(&resource, &tasks);
    }

    #[test]
    fn test_local_storage_takes_priority() {
        let shared = SharedStorage::new(100.0);
        let mut resource = resource(&shared, 1, 1000).with_local_storage(50.0);
        let mut tasks = TaskStore::new();
        let key = add_task(&mut tasks, "sifting_1", 1, &[("in", 30.0, FileLink::Input)]);

        resource.run_task(key, &tasks).unwrap();

        assert_eq!(shared.current_used_storage(), 0.0);
        assert_eq!(resource.get_local_storage().unwrap().current_used_storage(), 30.0);
    }

    #[test]
    fn test_cleanup_task_is_accepted_and_not_charged() {
        let shared = SharedStorage::new(10.0);
        let mut resource = resource(&shared, 1, 10);
        let mut tasks = TaskStore::new();
        let mut cleanup = Task::new_cleanup("cleanup_1", vec![File::new("big", 500.0)], 5000.0);
        cleanup.queue().unwrap();
        let key = tasks.add(cleanup);

        assert_eq!(resource.run_task(key, &tasks), Ok(Some(0)));
        assert_eq!(resource.get_current_used_memory(), 0);
        assert!(resource.get_running_tasks(&tasks).is_empty());
        assert_eq!(resource.num_of_busy_units(), 1);
    }

    #[test]
    fn test_mem_controller_input_is_clamped_to_capacity() {
        let shared = SharedStorage::new(10.0);
        let mut resource = resource(&shared, 1, 100);
        resource.set_mem_controller(0.8, PidGains::new(10.0, 0.0, 0.0), 0.0);

        // 10 * (80 - 0) is far above the capacity.
        assert_eq!(resource.get_mem_controller_input(), 100.0);
    }
}
