use std::fmt;
use std::str::FromStr;

use crate::domain::pid_system_model::utils::id::FileName;
use crate::error::Error;

/// A named data item. Two files are equal iff name and size match.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub name: FileName,
    pub size: f64,
}

impl File {
    pub fn new(name: impl Into<String>, size: f64) -> Self {
        File { name: FileName::new(name), size }
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File: {{name: {}, size: {}}}", self.name, self.size)
    }
}

/// Role of a file within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileLink {
    Input,
    Output,
    Intermediate,
}

impl FromStr for FileLink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "input" => Ok(FileLink::Input),
            "output" => Ok(FileLink::Output),
            "intermediate" => Ok(FileLink::Intermediate),
            other => Err(Error::UnknownFileLink(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_equality_needs_name_and_size() {
        assert_eq!(File::new("a.dat", 10.0), File::new("a.dat", 10.0));
        assert_ne!(File::new("a.dat", 10.0), File::new("a.dat", 11.0));
        assert_ne!(File::new("a.dat", 10.0), File::new("b.dat", 10.0));
    }

    #[test]
    fn test_file_link_parsing_is_case_insensitive() {
        assert_eq!("INPUT".parse::<FileLink>().unwrap(), FileLink::Input);
        assert_eq!("Intermediate".parse::<FileLink>().unwrap(), FileLink::Intermediate);
        assert!(matches!("scratch".parse::<FileLink>(), Err(Error::UnknownFileLink(_))));
    }
}
