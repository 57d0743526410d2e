use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::agent::{AgentId, WireId};
use crate::models::appointment::{AppointmentStatus, RawAppointment};
use crate::models::availability::RawAvailability;
use crate::models::timestamp::format_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Availability,
    Appointment,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Availability => f.pad("availability"),
            EventKind::Appointment => f.pad("appointment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        EventId(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventColor {
    Blue,
    Amber,
    Green,
    Red,
}

impl EventColor {
    pub fn for_status(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Pending => EventColor::Amber,
            AppointmentStatus::Confirmed => EventColor::Green,
            AppointmentStatus::Cancelled => EventColor::Red,
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            EventColor::Blue => "#2196f3",
            EventColor::Amber => "#ff9800",
            EventColor::Green => "#4caf50",
            EventColor::Red => "#f44336",
        }
    }
}

/// One entry of the displayed calendar, rebuilt from scratch on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub agent_id: Option<AgentId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: Option<AppointmentStatus>,
    pub title: String,
    pub color: EventColor,
}

/// A calendar event turned back into the backend record it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Availability(RawAvailability),
    Appointment(RawAppointment),
}

impl CalendarEvent {
    pub fn is_appointment(&self) -> bool {
        self.kind == EventKind::Appointment
    }

    /// Cancelled appointments stay visible but no longer hold the agent's day.
    pub fn is_active(&self) -> bool {
        self.status != Some(AppointmentStatus::Cancelled)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Availability ids are regenerated on the next normalization; the agent
    /// name is carried over through the title.
    pub fn to_raw(&self) -> RawRecord {
        match self.kind {
            EventKind::Availability => RawRecord::Availability(RawAvailability {
                id: None,
                agent_id: self.agent_id.map(WireId::from),
                agent_name: Some(self.title.clone()),
                start: Some(format_timestamp(&self.start)),
                end: Some(format_timestamp(&self.end)),
            }),
            EventKind::Appointment => RawRecord::Appointment(RawAppointment {
                id: Some(WireId::Text(self.id.0.clone())),
                agent_id: self.agent_id.map(WireId::from),
                title: Some(self.title.clone()),
                start: Some(format_timestamp(&self.start)),
                end: Some(format_timestamp(&self.end)),
                status: self.status.map(|status| status.as_wire().to_string()),
                ..Default::default()
            }),
        }
    }
}
