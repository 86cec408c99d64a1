use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid {field} '{value}', expected one of: {allowed}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: String,
    },
    #[error("Invalid time format '{0}'. Use HH:MM AM/PM")]
    InvalidTime(String),
    #[error("invalid {field} '{value}', expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate { field: &'static str, value: String },
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
}

/// Which task mutation a scheduling check guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMutation {
    Create,
    Update,
    Delete,
}

impl TaskMutation {
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "modified",
            Self::Delete => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    #[error("{}", window_closed_message(.mutation, .cutoff_hour))]
    WindowClosed {
        mutation: TaskMutation,
        cutoff_hour: u32,
        current_time: String,
    },
    #[error(
        "Please schedule or complete tasks for {} first before planning further ahead",
        us_date(.minimum_date)
    )]
    DateLocked {
        minimum_date: NaiveDate,
        attempted_date: NaiveDate,
    },
}

fn window_closed_message(mutation: &TaskMutation, cutoff_hour: &u32) -> String {
    match mutation {
        TaskMutation::Create => format!(
            "Tasks can only be created before {cutoff_hour}:00. Scheduling closes for the day!"
        ),
        other => format!(
            "Tasks can only be {} before {cutoff_hour}:00",
            other.past_tense()
        ),
    }
}

fn us_date(date: &NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}
