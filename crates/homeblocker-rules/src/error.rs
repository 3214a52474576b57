use thiserror::Error;

/// Errors produced while parsing the crontab-like schedule grammar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("field must be either a wildcard *, a number, or an interval: {token:?}")]
    InvalidField { token: String },

    #[error("interval must be from-to: {token:?}")]
    InvalidInterval { token: String },

    #[error("interval {token:?} is empty: the upper bound is exclusive and must be greater than the lower one")]
    EmptyInterval { token: String },

    #[error("schedule lines must follow the crontab format; 6 fields separated with spaces, got {count}: {line:?}")]
    FieldCount { line: String, count: usize },

    #[error("schedule line must end with either \"on\" or \"off\": {line:?}")]
    InvalidToggle { line: String },

    #[error("invalid schedule line {number}")]
    Line {
        number: usize,
        #[source]
        source: Box<ScheduleError>,
    },
}

/// Errors produced while building the block registry.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid schedule in block {name:?}")]
    Schedule {
        name: String,
        #[source]
        source: ScheduleError,
    },
}
