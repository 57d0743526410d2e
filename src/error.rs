//! Error types shared across the crate.

use chrono::NaiveDate;

use crate::handlers::dialog::DialogMode;
use crate::models::agent::AgentId;
use crate::models::calendar_event::{EventId, EventKind};
use crate::models::session::Role;

/// Why a single backend record could not be turned into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("{record} record is missing required field '{field}'")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },
    #[error("field '{field}' holds an unparsable timestamp '{value}'")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("field '{field}' holds an invalid id '{value}'")]
    InvalidId { field: &'static str, value: String },
    #[error("unknown appointment status '{0}'")]
    UnknownStatus(String),
    #[error("record ends before it starts")]
    EndBeforeStart,
    #[error("duration of {0} minutes is out of range")]
    InvalidDuration(i64),
    #[error("record does not match the expected shape: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-2xx status; `message` is shown as is.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected response from server: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, BackendError::Rejected { status: 409, .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Agent {agent} already has an {kind} on {day}")]
    Conflict {
        agent: AgentId,
        day: NaiveDate,
        kind: EventKind,
    },
    #[error("The {role} role cannot {operation}")]
    Forbidden {
        role: Role,
        operation: &'static str,
    },
    #[error("Nothing is selected")]
    NoSelection,
    #[error("Close the open {0} dialog first")]
    DialogBusy(DialogMode),
    #[error("Only appointments can be reassigned")]
    NotAnAppointment,
    #[error("No calendar event with id {0}")]
    UnknownEvent(EventId),
    #[error("The session has no user id")]
    MissingUser,
    #[error("The selected range ends before it starts")]
    InvalidRange,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SchedulingError {
    /// Text shown to the person using the calendar.
    pub fn user_message(&self) -> String {
        match self {
            SchedulingError::Conflict { agent, day, .. } => {
                format!("Agent {} is already committed on {}", agent, day)
            }
            other => other.to_string(),
        }
    }

    /// Whether the backend, rather than the local check, refused the command.
    pub fn is_server_conflict(&self) -> bool {
        matches!(self, SchedulingError::Backend(err) if err.is_conflict())
    }
}
