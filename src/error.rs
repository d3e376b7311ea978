use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse simulation configuration JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Malformed workflow description at line {line}: {reason}")]
    WorkflowParseError { line: usize, reason: String },

    #[error("Unknown task transformation '{0}'")]
    UnknownTransformation(String),

    #[error("Unknown file link '{0}', expected input, output or intermediate")]
    UnknownFileLink(String),

    #[error("Task '{0}' is not part of the workflow")]
    UnknownTask(String),

    #[error("Task '{0}' is declared more than once")]
    DuplicateTask(String),

    #[error("File '{0}' is not part of the workflow")]
    UnknownFile(String),

    #[error("Invalid simulation configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Illegal status transition of task '{task}' from {from} to {to}")]
    IllegalTransition { task: String, from: String, to: String },

    #[error("Simulation deadlocked at time {time}, pending tasks: {pending:?}")]
    Deadlock { time: i64, pending: Vec<String> },

    #[error("Simulation exceeded the tick limit of {0}")]
    TickLimitExceeded(i64),
}

/// Recoverable conditions of a single admission attempt. Both are raised before
/// any storage or memory was touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdmissionError {
    #[error("Required storage ({required}) is more than available space ({available}).")]
    InsufficientSpace { required: f64, available: f64 },

    #[error("[{resource}] Required memory ({required}) is more than available memory ({available}).")]
    InsufficientMemory { resource: String, required: i64, available: i64 },
}

impl AdmissionError {
    /// Amount the request exceeds the available budget.
    pub fn deficit(&self) -> f64 {
        match self {
            AdmissionError::InsufficientSpace { required, available } => required - available,
            AdmissionError::InsufficientMemory { required, available, .. } => (required - available) as f64,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
