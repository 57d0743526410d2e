use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub i64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse::<i64>().map(AgentId)
    }
}

/// An id as the backend sends it: sometimes a number, sometimes a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    pub fn to_agent_id(&self, field: &'static str) -> Result<AgentId, RecordError> {
        match self {
            WireId::Number(n) => Ok(AgentId(*n)),
            WireId::Text(text) => text.parse::<AgentId>().map_err(|_| RecordError::InvalidId {
                field,
                value: text.clone(),
            }),
        }
    }

    pub fn as_key(&self) -> String {
        match self {
            WireId::Number(n) => n.to_string(),
            WireId::Text(text) => text.trim().to_string(),
        }
    }
}

impl From<AgentId> for WireId {
    fn from(id: AgentId) -> Self {
        WireId::Number(id.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub display_name: String,
    pub email: Option<String>,
}

/// Entry of the authorised-agent listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedAgent {
    pub id: WireId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AllowedAgent {
    pub fn adapt(self) -> Result<Agent, RecordError> {
        let id = self.id.to_agent_id("id")?;
        let display_name = match self.name.trim() {
            "" => format!("Agent #{}", id),
            name => name.to_string(),
        };
        Ok(Agent {
            id,
            display_name,
            email: self.email.filter(|email| !email.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartnerRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Entry of the looser "users by group" listing used as a fallback.
///
/// Field coalescing, in order: id from `id` then `value`; name from
/// `partner.name`, `partnerName`, `label`, `login`, else `Agent #{id}`; email
/// from `partner.email` then `email`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default)]
    pub value: Option<WireId>,
    #[serde(default)]
    pub partner: Option<PartnerRef>,
    #[serde(default)]
    pub partner_name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl GroupMember {
    pub fn adapt(self) -> Result<Agent, RecordError> {
        let raw_id = self.id.or(self.value).ok_or(RecordError::MissingField {
            record: "group member",
            field: "id",
        })?;
        let id = raw_id.to_agent_id("id")?;
        let partner = self.partner.unwrap_or_default();
        let display_name = [partner.name, self.partner_name, self.label, self.login]
            .into_iter()
            .flatten()
            .map(|name| name.trim().to_string())
            .find(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Agent #{}", id));
        let email = partner
            .email
            .into_iter()
            .chain(self.email)
            .find(|email| !email.trim().is_empty());
        Ok(Agent {
            id,
            display_name,
            email,
        })
    }
}

/// Id-indexed agent lookup, kept alongside the name-ordered list.
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    ordered: Vec<Agent>,
    index: HashMap<AgentId, usize>,
}

impl AgentDirectory {
    pub fn new(agents: Vec<Agent>) -> Self {
        let mut seen = HashSet::new();
        let mut agents: Vec<Agent> = agents
            .into_iter()
            .filter(|agent| seen.insert(agent.id))
            .collect();
        agents.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        let index = agents
            .iter()
            .enumerate()
            .map(|(pos, agent)| (agent.id, pos))
            .collect();
        Self {
            ordered: agents,
            index,
        }
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).and_then(|pos| self.ordered.get(*pos))
    }

    pub fn agents(&self) -> &[Agent] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
