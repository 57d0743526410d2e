use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::models::agent::{AgentId, WireId};
use crate::models::session::DayPolicy;
use crate::models::timestamp::parse_timestamp;

/// A window an agent declared as free. Never edited once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySlot {
    pub id: Option<String>,
    pub agent_id: AgentId,
    pub agent_name: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Availability record exactly as the backend sends it.
///
/// Required: `agentId`, `start`, `end`. `id` and `agentName` are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAvailability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WireId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<WireId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl RawAvailability {
    pub fn adapt(&self, policy: &DayPolicy) -> Result<AvailabilitySlot, RecordError> {
        let agent_id = self
            .agent_id
            .as_ref()
            .ok_or(missing("agentId"))?
            .to_agent_id("agentId")?;
        let start = parse_timestamp("start", self.start.as_deref().ok_or(missing("start"))?, policy)?;
        let end = parse_timestamp("end", self.end.as_deref().ok_or(missing("end"))?, policy)?;
        if end < start {
            return Err(RecordError::EndBeforeStart);
        }
        Ok(AvailabilitySlot {
            id: self.id.as_ref().map(WireId::as_key),
            agent_id,
            agent_name: self
                .agent_name
                .as_ref()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            start,
            end,
        })
    }

    pub fn key(&self) -> String {
        self.id
            .as_ref()
            .map(WireId::as_key)
            .unwrap_or_else(|| "<no id>".to_string())
    }
}

fn missing(field: &'static str) -> RecordError {
    RecordError::MissingField {
        record: "availability",
        field,
    }
}
