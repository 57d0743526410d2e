use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::models::agent::{AgentId, WireId};
use crate::models::session::DayPolicy;
use crate::models::timestamp::parse_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    /// Maps a wire status. A missing status is a fresh request, hence pending.
    pub fn from_wire(value: Option<&str>) -> Result<Self, RecordError> {
        let Some(value) = value else {
            return Ok(AppointmentStatus::Pending);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "attente" | "en_attente" => Ok(AppointmentStatus::Pending),
            "confirmed" | "valide" => Ok(AppointmentStatus::Confirmed),
            "cancelled" | "canceled" | "annule" => Ok(AppointmentStatus::Cancelled),
            _ => Err(RecordError::UnknownStatus(value.to_string())),
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// An agent's answer to an appointment awaiting validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Refuse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub id: String,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub agent_id: Option<AgentId>,
    pub agent_name: Option<String>,
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
}

/// Appointment record exactly as the backend sends it.
///
/// Required: `id`, `start`, and either `end` or `durationMinutes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppointment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WireId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<WireId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<WireId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl RawAppointment {
    pub fn adapt(&self, policy: &DayPolicy) -> Result<Appointment, RecordError> {
        let id = self.id.as_ref().ok_or(missing("id"))?.as_key();
        let start = parse_timestamp("start", self.start.as_deref().ok_or(missing("start"))?, policy)?;
        let end = match (self.end.as_deref(), self.duration_minutes) {
            (Some(end), _) => parse_timestamp("end", end, policy)?,
            (None, Some(minutes)) => Duration::try_minutes(minutes)
                .and_then(|duration| start.checked_add_signed(duration))
                .ok_or(RecordError::InvalidDuration(minutes))?,
            (None, None) => return Err(missing("end")),
        };
        if end < start {
            return Err(RecordError::EndBeforeStart);
        }
        let agent_id = self
            .agent_id
            .as_ref()
            .map(|id| id.to_agent_id("agentId"))
            .transpose()?;
        Ok(Appointment {
            id,
            client_id: self.client_id.as_ref().map(WireId::as_key),
            client_name: non_blank(self.client_name.as_deref()),
            agent_id,
            agent_name: non_blank(self.agent_name.as_deref()),
            title: non_blank(self.title.as_deref()),
            start,
            end,
            status: AppointmentStatus::from_wire(self.status.as_deref())?,
        })
    }

    pub fn key(&self) -> String {
        self.id
            .as_ref()
            .map(WireId::as_key)
            .unwrap_or_else(|| "<no id>".to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn missing(field: &'static str) -> RecordError {
    RecordError::MissingField {
        record: "appointment",
        field,
    }
}
