use std::collections::HashSet;

use crate::domain::pid_system_model::controller::controller::Controller;
use crate::domain::pid_system_model::resource::compute_resource::ComputeResource;
use crate::domain::pid_system_model::scheduler::scheduler_config::SchedulerConfig;
use crate::domain::pid_system_model::scheduler::simulation_report::{SchedulerEvent, SimulationReport};
use crate::domain::pid_system_model::scheduler::task_selector::{RandomSelector, TaskSelector};
use crate::domain::pid_system_model::storage::file::File;
use crate::domain::pid_system_model::storage::storage::SharedStorage;
use crate::domain::pid_system_model::utils::id::{ComputeUnitId, FileName, SimTime};
use crate::domain::pid_system_model::utils::statistics::{self, StatParameter, StatisticEvent};
use crate::domain::pid_system_model::workflow::task::{Task, TaskStatus};
use crate::domain::pid_system_model::workflow::task_store::TaskKey;
use crate::domain::pid_system_model::workflow::workflow::Workflow;
use crate::error::{AdmissionError, Error, Result};

/// Ticks are numbered from one, the first scheduling decision happens at time 1.
const FIRST_TICK: SimTime = 1;

/// Controller inputs sampled at the start of a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerInputs {
    pub disk: f64,
    /// One entry per compute resource, in resource order.
    pub memory: Vec<f64>,
}

/**
 * Time-stepped workflow scheduler with closed-loop admission control.
 *
 * Each tick retires finished tasks, samples a disk controller (shared storage
 * usage against a storage limit) and one memory controller per compute resource,
 * and then either admits queued tasks while the disk controller reports headroom or
 * preempts the most recently started tasks while it reports an overflow. When tasks
 * cannot be admitted for lack of space, a cleanup task is synthesized which removes
 * files no pending task needs anymore.
 *
 * Ready tasks are picked through a [`TaskSelector`].
 */
#[derive(Debug)]
pub struct PidScheduler {
    workflow: Workflow,
    compute_resources: Vec<ComputeResource>,
    shared_storage: SharedStorage,
    disk_controller: Controller,
    config: SchedulerConfig,
    selector: Box<dyn TaskSelector>,

    /// Admission queue, oldest first.
    queue: Vec<TaskKey>,
    current_time: SimTime,
    cleanup_task_id: u64,

    /// Whether the previous tick admitted, preempted or created anything.
    changed_schedule: bool,
    report: SimulationReport,
}

impl PidScheduler {
    pub fn new(workflow: Workflow, mut compute_resources: Vec<ComputeResource>, shared_storage: SharedStorage, config: SchedulerConfig) -> Self {
        for resource in compute_resources.iter_mut() {
            resource.set_mem_controller(config.memory_threshold, config.memory_gains, config.memory_tolerance);
        }

        PidScheduler {
            workflow,
            compute_resources,
            shared_storage,
            disk_controller: Controller::new(config.storage_limit, config.disk_gains, config.disk_tolerance),
            config,
            selector: Box::new(RandomSelector::new()),
            queue: Vec::new(),
            current_time: 0,
            cleanup_task_id: 1,
            changed_schedule: true,
            report: SimulationReport::default(),
        }
    }

    /// Replaces the default random choice among ready tasks.
    pub fn with_selector(mut self, selector: Box<dyn TaskSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn compute_resources(&self) -> &[ComputeResource] {
        &self.compute_resources
    }

    pub fn shared_storage(&self) -> &SharedStorage {
        &self.shared_storage
    }

    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    pub fn queue(&self) -> &[TaskKey] {
        &self.queue
    }

    pub fn report(&self) -> &SimulationReport {
        &self.report
    }

    /// Runs ticks until every task completed.
    ///
    /// # Returns
    /// The report of the run, or `Deadlock`/`TickLimitExceeded` if the workflow can
    /// never complete.
    pub fn start(&mut self) -> Result<SimulationReport> {
        log::info!(
            "Starting simulation of {} tasks on {} compute resources (PID control {}).",
            self.workflow.num_of_pending_tasks(),
            self.compute_resources.len(),
            if self.config.enable_pid { "enabled" } else { "disabled" }
        );

        while !self.workflow.is_completed() {
            if let Some(limit) = self.config.max_ticks {
                if self.current_time >= limit {
                    return Err(Error::TickLimitExceeded(limit));
                }
            }
            self.tick()?;
        }

        self.report.makespan = (self.current_time - FIRST_TICK).max(0);
        log::info!("Workflow Makespan: {}", self.report.makespan);

        Ok(self.report.clone())
    }

    /// Advances the simulation by one time unit.
    pub fn tick(&mut self) -> Result<()> {
        self.current_time += 1;

        let finished_tasks = self.retire_finished_tasks()?;

        let inputs = if self.config.enable_pid && (self.changed_schedule || finished_tasks) {
            self.sample_controllers()
        } else {
            ControllerInputs { disk: 0.0, memory: vec![0.0; self.compute_resources.len()] }
        };

        if !finished_tasks && !self.changed_schedule {
            return self.check_for_deadlock();
        }

        self.log_controller_inputs(&inputs);

        self.changed_schedule = false;

        self.enqueue_ready_tasks()?;

        if !self.config.enable_pid || inputs.disk > 0.0 {
            self.changed_schedule = self.admit_tasks(inputs)?;
        } else if inputs.disk < 0.0 {
            self.changed_schedule = self.preempt_tasks(inputs.disk)?;
        }

        if log::log_enabled!(log::Level::Debug) {
            for resource in &self.compute_resources {
                log::debug!("[Time] {}\n{}", self.current_time, resource.describe(&self.workflow.tasks));
            }
        }

        Ok(())
    }

    /// Retires every task whose end time has been reached.
    fn retire_finished_tasks(&mut self) -> Result<bool> {
        let now = self.current_time;
        let mut finished_tasks = false;

        for resource in self.compute_resources.iter_mut() {
            let done: Vec<ComputeUnitId> = resource
                .compute_units()
                .filter_map(|unit| {
                    let task = self.workflow.tasks.get(unit.get_current_task()?)?;
                    (task.get_end_time() <= now).then_some(unit.id)
                })
                .collect();

            for unit_id in done {
                let Some(key) = resource.process_finished_task(unit_id, &mut self.workflow.tasks)? else {
                    continue;
                };
                self.workflow.remove_pending(key);
                finished_tasks = true;

                if let Some(task) = self.workflow.tasks.get(key) {
                    log::info!("[{}] Finished {} on {}", now, task.id, resource.id);
                    record(&mut self.report, SchedulerEvent::Finished { time: now, task: task.id.clone(), resource: resource.id.clone() });
                }
            }
        }

        Ok(finished_tasks)
    }

    fn sample_controllers(&mut self) -> ControllerInputs {
        let disk = self.disk_controller.process(self.shared_storage.current_used_storage());
        let memory = self.compute_resources.iter_mut().map(|resource| resource.get_mem_controller_input()).collect();
        ControllerInputs { disk, memory }
    }

    fn log_controller_inputs(&self, inputs: &ControllerInputs) {
        for (resource, input) in self.compute_resources.iter().zip(&inputs.memory) {
            log::debug!(
                "[{}] Mem Controller Input [{}]: {} - {}",
                self.current_time,
                resource.id,
                input,
                resource.get_current_used_memory()
            );
        }

        let used_storage = self.shared_storage.current_used_storage();
        log::debug!("[{}] Disk Controller Input: {} - {}", self.current_time, inputs.disk, used_storage);

        let mut event = StatisticEvent::new();
        event
            .set(StatParameter::Time, self.current_time)
            .set(StatParameter::Event, "CONTROLLER_SAMPLE")
            .set(StatParameter::DiskControllerInput, inputs.disk)
            .set(StatParameter::SharedStorageUsed, used_storage)
            .set(StatParameter::NumberOfPendingTasks, self.workflow.num_of_pending_tasks())
            .set(StatParameter::QueueLength, self.queue.len());
        statistics::add_global_event(event);
    }

    /// Moves every idle pending task whose parents completed into the queue.
    fn enqueue_ready_tasks(&mut self) -> Result<()> {
        for key in self.workflow.pending_keys() {
            let is_idle = self.workflow.tasks.get(key).is_some_and(|task| task.get_status() == TaskStatus::Idle);

            if is_idle && !self.queue.contains(&key) && self.workflow.is_ready(key) {
                if let Some(task) = self.workflow.tasks.get_mut(key) {
                    task.queue()?;
                }
                self.queue.push(key);
            }
        }
        Ok(())
    }

    /// Admits queued tasks while the controllers report headroom.
    ///
    /// # Returns
    /// Whether the schedule changed.
    fn admit_tasks(&mut self, inputs: ControllerInputs) -> Result<bool> {
        let enable_pid = self.config.enable_pid;
        let now = self.current_time;
        let mut diff_input = inputs.disk;
        let mut mem_inputs = inputs.memory;

        let mut changed_schedule = false;
        let mut insufficient_space_error = false;
        let mut num_tasks_scheduled = 0;

        let mut tasks_to_schedule = self.queue.clone();

        while let Some(index) = self.selector.select(&tasks_to_schedule) {
            let key = tasks_to_schedule.remove(index);

            let Some(task) = self.workflow.tasks.get(key) else {
                continue;
            };
            let task_id = task.id.clone();
            let transformation = task.transformation;
            let is_cleanup = task.is_cleanup();
            let storage_estimation = self.config.estimations.storage_for(transformation);
            let memory_estimation = self.config.estimations.memory_for(transformation);

            // Skip tasks whose estimated footprint does not fit the remaining headroom.
            if enable_pid && !is_cleanup && storage_estimation > diff_input {
                continue;
            }

            for (resource_index, resource) in self.compute_resources.iter_mut().enumerate() {
                if enable_pid && !is_cleanup && memory_estimation > mem_inputs[resource_index] {
                    continue;
                }

                match resource.run_task(key, &self.workflow.tasks) {
                    Ok(Some(unit)) => {
                        if let Some(task) = self.workflow.tasks.get_mut(key) {
                            task.run(now)?;
                        }
                        self.queue.retain(|queued| *queued != key);
                        changed_schedule = true;
                        num_tasks_scheduled += 1;

                        if !is_cleanup {
                            diff_input -= storage_estimation;
                            mem_inputs[resource_index] -= memory_estimation;
                        }

                        log::info!("[{}] Scheduled {} on {} (unit {})", now, task_id, resource.id, unit);
                        record(&mut self.report, SchedulerEvent::Scheduled { time: now, task: task_id, resource: resource.id.clone(), unit });
                        break;
                    }
                    Ok(None) => {}
                    Err(error @ AdmissionError::InsufficientSpace { .. }) => {
                        // A cleanup task may be needed.
                        log::debug!("[{}] {}", now, error);
                        insufficient_space_error = true;
                        break;
                    }
                    Err(error @ AdmissionError::InsufficientMemory { .. }) => {
                        // Wait for other tasks to finish.
                        log::debug!("[{}] {}", now, error);
                        break;
                    }
                }
            }

            if enable_pid && self.shared_storage.current_used_storage() > self.config.storage_limit {
                break;
            }
        }

        log::debug!("[{}] Tasks Scheduled: {}", now, num_tasks_scheduled);

        // No task could be scheduled due to insufficient disk space.
        if insufficient_space_error && !changed_schedule {
            if let Some(cleanup_task) = self.create_cleanup_task() {
                let files: Vec<FileName> = {
                    let mut names: Vec<FileName> = cleanup_task.input_data.keys().cloned().collect();
                    names.sort();
                    names
                };
                let total_size: f64 = cleanup_task.input_data.values().map(|f| f.size).sum();
                let event = SchedulerEvent::CleanupCreated { time: now, task: cleanup_task.id.clone(), files, total_size };

                log::info!("[{}] Created {} to free {} of shared storage", now, cleanup_task.id, total_size);
                self.workflow.add_task(cleanup_task)?;
                record(&mut self.report, event);
                changed_schedule = true;
            } else {
                log::warn!("[{}] Shared storage exhausted and no file can be cleaned up.", now);
            }
        }

        Ok(changed_schedule)
    }

    /// Preempts the most recently started tasks until the disk deficit is covered or
    /// at most one task is left running.
    ///
    /// # Returns
    /// Whether the schedule changed.
    fn preempt_tasks(&mut self, mut diff_input: f64) -> Result<bool> {
        let now = self.current_time;
        let mut changed_schedule = false;
        let mut num_tasks_preempted = 0;

        while diff_input < 0.0 {
            let mut total_running_tasks = 0;
            let mut latest_started: Option<(usize, TaskKey, SimTime)> = None;

            for (index, resource) in self.compute_resources.iter().enumerate() {
                let running_tasks = resource.get_running_tasks(&self.workflow.tasks);
                total_running_tasks += running_tasks.len();

                for key in running_tasks {
                    let start_time = self.workflow.tasks.get(key).map_or(-1, |task| task.get_start_time());
                    if latest_started.is_none_or(|(_, _, latest)| latest < start_time) {
                        latest_started = Some((index, key, start_time));
                    }
                }
            }

            if total_running_tasks <= 1 {
                break;
            }
            let Some((index, key, _)) = latest_started else {
                break;
            };

            let required_files = self.workflow.required_files();
            let resource = &mut self.compute_resources[index];
            let Some(preempted) = resource.preempt_task(key, &required_files, &mut self.workflow.tasks)? else {
                break;
            };

            if let Some(task) = self.workflow.tasks.get(preempted) {
                diff_input += self.config.estimations.storage_for(task.transformation);
                log::info!("[{}] Preempted {} on {}", now, task.id, resource.id);

                record(&mut self.report, SchedulerEvent::Preempted { time: now, task: task.id.clone(), resource: resource.id.clone() });
            }
            changed_schedule = true;
            num_tasks_preempted += 1;
        }

        log::debug!("[{}] Tasks Preempted: {}", now, num_tasks_preempted);
        Ok(changed_schedule)
    }

    /// Builds a cleanup task for every shared storage file that is neither used by a
    /// running task nor an input of a pending task.
    ///
    /// # Returns
    /// `None` if there is nothing to remove.
    fn create_cleanup_task(&mut self) -> Option<Task> {
        let mut protected_files: HashSet<FileName> = self.workflow.required_files();
        for resource in &self.compute_resources {
            protected_files.extend(resource.get_list_of_current_used_files(&self.workflow.tasks));
        }

        let mut candidates: Vec<File> =
            self.shared_storage.read().files().filter(|file| !protected_files.contains(&file.name)).cloned().collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name));

        if candidates.is_empty() {
            return None;
        }

        let total_size: f64 = candidates.iter().map(|file| file.size).sum();
        let task_id = format!("cleanup_{}", self.cleanup_task_id);
        self.cleanup_task_id += 1;

        Some(Task::new_cleanup(task_id, candidates, total_size * self.config.cleanup_duration_factor))
    }

    /// Without busy units and without a schedule change no later tick can make
    /// progress.
    fn check_for_deadlock(&self) -> Result<()> {
        let busy_units: usize = self.compute_resources.iter().map(|resource| resource.num_of_busy_units()).sum();

        if busy_units == 0 && !self.workflow.is_completed() {
            log::error!("[{}] No task is running and the schedule cannot change anymore.", self.current_time);
            return Err(Error::Deadlock { time: self.current_time, pending: self.workflow.pending_task_ids() });
        }
        Ok(())
    }
}

/// Keeps the report and the statistics output in step.
fn record(report: &mut SimulationReport, event: SchedulerEvent) {
    statistics::add_global_event(event.to_statistic_event());
    report.push(event);
}
