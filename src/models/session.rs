use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::models::agent::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Agent,
    Client,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            // The backend still hands out EMPLOYEE for agents.
            "agent" | "employee" => Ok(Role::Agent),
            "client" => Ok(Role::Client),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Client => "client",
        };
        f.write_str(name)
    }
}

/// Decides which calendar day an instant belongs to.
///
/// Every "same day" question goes through the session's configured IANA
/// timezone instead of whatever timezone the host happens to run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPolicy {
    tz: Tz,
}

impl DayPolicy {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn day_of(&self, instant: &DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    pub fn same_day(&self, instant: &DateTime<Utc>, day: NaiveDate) -> bool {
        self.day_of(instant) == day
    }
}

impl Default for DayPolicy {
    fn default() -> Self {
        Self::utc()
    }
}

/// Who is looking at the calendar, for how long, and with which credential.
///
/// Built once per page view and lent to the coordinator; dropping it ends the
/// session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub role: Role,
    pub user_id: Option<AgentId>,
    pub display_name: Option<String>,
    pub token: String,
    pub day_policy: DayPolicy,
}

impl SessionContext {
    pub fn new(role: Role, token: impl Into<String>) -> Self {
        Self {
            role,
            user_id: None,
            display_name: None,
            token: token.into(),
            day_policy: DayPolicy::default(),
        }
    }

    pub fn with_user(mut self, user_id: AgentId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_day_policy(mut self, policy: DayPolicy) -> Self {
        self.day_policy = policy;
        self
    }

    /// Name shown on the signed-in agent's own availability.
    pub fn own_label(&self) -> String {
        match (&self.display_name, self.user_id) {
            (Some(name), _) if !name.trim().is_empty() => name.trim().to_string(),
            (_, Some(id)) => format!("Agent {}", id),
            _ => "Agent".to_string(),
        }
    }
}
