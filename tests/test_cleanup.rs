mod common;

use common::{assert_accounting, run_checked, single_resource_scheduler, test_config};
use pid_workflow_scheduler::domain::pid_system_model::scheduler::simulation_report::SchedulerEvent;
use pid_workflow_scheduler::domain::pid_system_model::utils::id::{FileName, TaskId};

/// `junk` is produced by `individuals_1` and read by nobody. Once it sits in the
/// shared storage there is not enough room for the input of `sifting_1`.
const SATURATING: &str = "\
task,individuals_1,1,1
task,sifting_1,2,1
file,junk,80
file,data,30
uses,individuals_1,junk,output
uses,sifting_1,data,input
depends,sifting_1,individuals_1
";

fn cleanup_scheduler() -> pid_workflow_scheduler::domain::pid_system_model::scheduler::pid_scheduler::PidScheduler {
    let mut config = test_config(95.0);
    config.cleanup_duration_factor = 0.1;
    single_resource_scheduler(SATURATING, 100.0, 1000, 4, config)
}

#[test]
fn test_saturated_storage_yields_exactly_one_cleanup_task() {
    let mut scheduler = cleanup_scheduler();

    run_checked(&mut scheduler, 100);

    let report = scheduler.report();
    assert_eq!(report.num_of_cleanup_tasks, 1);

    let created: Vec<&SchedulerEvent> =
        report.events.iter().filter(|event| matches!(event, SchedulerEvent::CleanupCreated { .. })).collect();
    match created[0] {
        SchedulerEvent::CleanupCreated { time, task, files, total_size } => {
            assert_eq!(*time, 2);
            assert_eq!(task.as_str(), "cleanup_1");
            assert_eq!(files, &vec![FileName::new("junk")]);
            assert_eq!(*total_size, 80.0);
        }
        _ => unreachable!(),
    }

    let cleanup = scheduler.workflow().tasks.get_by_id(&TaskId::new("cleanup_1")).unwrap();
    assert!(cleanup.is_cleanup());
    assert_eq!(cleanup.duration, 8.0);
    assert_eq!(cleanup.peak_memory, 0);
    assert!(cleanup.parent_tasks.is_empty());
}

#[test]
fn test_cleanup_completion_frees_the_storage() {
    let mut scheduler = cleanup_scheduler();

    // individuals_1 runs during the first tick and leaves its output behind.
    scheduler.tick().unwrap();
    scheduler.tick().unwrap();
    assert_eq!(scheduler.shared_storage().current_used_storage(), 80.0);
    assert!(scheduler.workflow().tasks.get_by_id(&TaskId::new("cleanup_1")).is_some());

    // The cleanup task starts on the next tick and runs for ceil(80 * 0.1) ticks.
    scheduler.tick().unwrap();
    assert_eq!(scheduler.report().start_time_of("cleanup_1"), Some(3));

    while scheduler.report().finish_time_of("cleanup_1").is_none() {
        scheduler.tick().unwrap();
        assert_accounting(&scheduler);
    }
    assert_eq!(scheduler.report().finish_time_of("cleanup_1"), Some(11));
    assert!(!scheduler.shared_storage().read().contains(&FileName::new("junk")));

    run_checked(&mut scheduler, 100);
    assert_eq!(scheduler.report().start_time_of("sifting_1"), Some(11));
}

#[test]
fn test_files_needed_later_are_never_cleaned_up() {
    // `keep` is an input of the pending `pair_1`, so only `junk` may go.
    let description = "\
task,individuals_1,1,1
task,sifting_1,2,1
task,pair_1,1,1
file,junk,50
file,keep,30
file,data,30
uses,individuals_1,junk,output
uses,individuals_1,keep,output
uses,sifting_1,data,input
uses,pair_1,keep,input
depends,sifting_1,individuals_1
depends,pair_1,sifting_1
";
    let mut config = test_config(95.0);
    config.cleanup_duration_factor = 0.1;
    let mut scheduler = single_resource_scheduler(description, 100.0, 1000, 4, config);

    run_checked(&mut scheduler, 100);

    let cleaned: Vec<Vec<FileName>> = scheduler
        .report()
        .events
        .iter()
        .filter_map(|event| match event {
            SchedulerEvent::CleanupCreated { files, .. } => Some(files.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(cleaned, vec![vec![FileName::new("junk")]]);
}
