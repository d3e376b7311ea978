use std::fs;

use crate::domain::pid_system_model::storage::file::{File, FileLink};
use crate::domain::pid_system_model::utils::id::{FileName, TaskId};
use crate::domain::pid_system_model::workflow::task::Task;
use crate::domain::pid_system_model::workflow::workflow::Workflow;
use crate::error::{Error, Result};

/// Reads a workflow description file. See [`parse_workflow`] for the format.
pub fn parse_workflow_file(file_path: &str) -> Result<Workflow> {
    let data = fs::read_to_string(file_path).map_err(Error::IoError)?;
    let workflow = parse_workflow(&data)?;

    log::info!(
        "Loaded workflow '{}' with {} tasks and {} files.",
        file_path,
        workflow.tasks.len(),
        workflow.num_of_files()
    );
    Ok(workflow)
}

/// Parses a line oriented workflow description.
///
/// ```text
/// # comment
/// task,<id>,<duration>,<peak_memory>
/// file,<name>,<size>
/// uses,<task_id>,<file_name>,<input|output|intermediate>
/// depends,<child_id>,<parent_id>
/// ```
///
/// Lines are case-insensitive. Every malformed line is an error naming its 1-based
/// line number.
pub fn parse_workflow(input: &str) -> Result<Workflow> {
    let mut workflow = Workflow::new();

    for (index, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line_number = index + 1;
        parse_line(&mut workflow, &line.to_lowercase()).map_err(|reason| Error::WorkflowParseError {
            line: line_number,
            reason,
        })?;
    }

    Ok(workflow)
}

fn parse_line(workflow: &mut Workflow, line: &str) -> std::result::Result<(), String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    match fields[0] {
        "task" => {
            let [_, id, duration, peak_memory] = expect_fields::<4>(&fields)?;
            let duration = parse_amount(duration, "duration")?;
            let peak_memory = parse_number::<i64>(peak_memory, "peak memory")?;
            if peak_memory < 0 {
                return Err(format!("peak memory must not be negative, got {}", peak_memory));
            }
            let task = Task::new(id, duration, peak_memory).map_err(|e| e.to_string())?;
            workflow.add_task(task).map_err(|e| e.to_string())?;
        }
        "file" => {
            let [_, name, size] = expect_fields::<3>(&fields)?;
            let size = parse_amount(size, "size")?;
            workflow.add_file(File::new(name, size));
        }
        "uses" => {
            let [_, task_id, file_name, link] = expect_fields::<4>(&fields)?;
            let link: FileLink = link.parse().map_err(|e: Error| e.to_string())?;
            workflow.add_use(&TaskId::new(task_id), &FileName::new(file_name), link).map_err(|e| e.to_string())?;
        }
        "depends" => {
            let [_, child_id, parent_id] = expect_fields::<3>(&fields)?;
            workflow.add_dependency(&TaskId::new(child_id), &TaskId::new(parent_id)).map_err(|e| e.to_string())?;
        }
        other => return Err(format!("unknown element '{}'", other)),
    }
    Ok(())
}

fn expect_fields<'a, const N: usize>(fields: &[&'a str]) -> std::result::Result<[&'a str; N], String> {
    <[&str; N]>::try_from(fields).map_err(|_| format!("'{}' expects {} fields, got {}", fields[0], N, fields.len()))
}

/// A finite, non-negative number.
fn parse_amount(value: &str, what: &str) -> std::result::Result<f64, String> {
    let amount = parse_number::<f64>(value, what)?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("{} must be a finite, non-negative number, got '{}'", what, value));
    }
    Ok(amount)
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> std::result::Result<T, String> {
    value.parse::<T>().map_err(|_| format!("invalid {} '{}'", what, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pid_system_model::workflow::task::TaskTransformation;

    const WORKFLOW: &str = "\
# 1000 genome fragment
TASK,individuals_1,5,100
task,sifting_1,2.5,10

file,chr1.tar.gz,300
file,chr1.out,20
uses,individuals_1,chr1.tar.gz,input
uses,Individuals_1,chr1.out,OUTPUT
uses,sifting_1,chr1.out,input
depends,sifting_1,individuals_1
";

    #[test]
    fn test_parse_workflow() {
        let workflow = parse_workflow(WORKFLOW).unwrap();

        assert_eq!(workflow.tasks.len(), 2);
        assert_eq!(workflow.num_of_files(), 2);

        let sifting = workflow.tasks.get_by_id(&TaskId::new("sifting_1")).unwrap();
        assert_eq!(sifting.transformation, TaskTransformation::Sifting);
        assert_eq!(sifting.duration, 2.5);
        assert_eq!(sifting.parent_tasks.len(), 1);
        assert!(sifting.input_data.contains_key(&FileName::new("chr1.out")));

        let individuals = workflow.tasks.get_by_id(&TaskId::new("individuals_1")).unwrap();
        assert_eq!(individuals.peak_memory, 100);
        assert!(individuals.output_data.contains_key(&FileName::new("chr1.out")));
    }

    fn parse_error_line(input: &str) -> usize {
        match parse_workflow(input) {
            Err(Error::WorkflowParseError { line, .. }) => line,
            other => panic!("expected a parse error, got {:?}", other.map(|w| w.tasks.len())),
        }
    }

    #[test]
    fn test_malformed_lines_name_their_line_number() {
        assert_eq!(parse_error_line("task,sifting_1,1,1\nfoo,bar"), 2);
        assert_eq!(parse_error_line("# c\n\ntask,sifting_1,1"), 3);
        assert_eq!(parse_error_line("task,sifting_1,abc,1"), 1);
        assert_eq!(parse_error_line("task,sorting_1,1,1"), 1);
        assert_eq!(parse_error_line("task,sifting_1,1,1\nfile,a,1\nuses,sifting_1,a,scratch"), 3);
        assert_eq!(parse_error_line("task,sifting_1,1,1\nuses,sifting_1,missing,input"), 2);
        assert_eq!(parse_error_line("task,sifting_1,1,1\ndepends,sifting_1,pair_1"), 2);
        assert_eq!(parse_error_line("task,sifting_1,1,1\ntask,sifting_1,2,2"), 2);
        assert_eq!(parse_error_line("file,a,-1"), 1);
    }

    #[test]
    fn test_non_finite_and_negative_amounts_are_rejected() {
        assert_eq!(parse_error_line("task,pair_1,inf,1"), 1);
        assert_eq!(parse_error_line("task,pair_1,nan,1"), 1);
        assert_eq!(parse_error_line("task,pair_1,-5,1"), 1);
        assert_eq!(parse_error_line("task,pair_1,3,-100"), 1);
        assert_eq!(parse_error_line("task,pair_1,3,1\nfile,a,nan"), 2);
        assert_eq!(parse_error_line("file,a,inf"), 1);
        assert_eq!(parse_error_line("file,a,-inf"), 1);

        assert!(parse_workflow("task,pair_1,0,0\nfile,a,0").is_ok());
    }
}
