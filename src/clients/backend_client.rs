use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BackendError, RecordError};
use crate::models::agent::{AgentId, AllowedAgent, GroupMember};
use crate::models::appointment::{Decision, RawAppointment};
use crate::models::availability::RawAvailability;
use crate::models::calendar_event::EventId;
use crate::models::timestamp::format_timestamp;

pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";
const FALLBACK_GROUP: &str = "employee";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlotRequest {
    pub agent_id: AgentId,
    pub start: String,
    pub end: String,
}

impl SlotRequest {
    pub fn new(agent_id: AgentId, start: &DateTime<Utc>, end: &DateTime<Utc>) -> Self {
        Self {
            agent_id,
            start: format_timestamp(start),
            end: format_timestamp(end),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReassignRequest {
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionRequest {
    pub decision: Decision,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub start: String,
    pub duration_minutes: i64,
}

/// Which appointment listing to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    Admin,
    Client,
    PendingValidation,
    Agent(AgentId),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Thin REST client for the scheduling backend. Every request carries the
/// session's bearer token; no retries, no client-side timeout.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl BackendClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn allowed_agents(&self) -> Result<Vec<AllowedAgent>, BackendError> {
        self.get_listing("/agents", &[("filter", "allowed")]).await
    }

    pub async fn group_members(&self) -> Result<Vec<GroupMember>, BackendError> {
        self.get_listing("/agents", &[("group", FALLBACK_GROUP)]).await
    }

    pub async fn availability(&self) -> Result<Vec<RawAvailability>, BackendError> {
        self.get_listing("/availability", &[]).await
    }

    pub async fn agent_availability(
        &self,
        agent_id: AgentId,
    ) -> Result<Vec<RawAvailability>, BackendError> {
        self.get_listing(&format!("/availability/agent/{}", agent_id), &[])
            .await
    }

    pub async fn appointments(
        &self,
        scope: AppointmentScope,
    ) -> Result<Vec<RawAppointment>, BackendError> {
        match scope {
            AppointmentScope::Admin => self.get_listing("/appointments", &[("scope", "admin")]).await,
            AppointmentScope::Client => {
                self.get_listing("/appointments", &[("scope", "client")]).await
            }
            AppointmentScope::PendingValidation => {
                self.get_listing("/appointments/pending-validation", &[]).await
            }
            AppointmentScope::Agent(agent_id) => {
                self.get_listing(&format!("/appointments/agent/{}", agent_id), &[])
                    .await
            }
        }
    }

    pub async fn assign(&self, body: &SlotRequest) -> Result<(), BackendError> {
        self.send(Method::POST, "/appointments/assign", Some(body))
            .await
    }

    pub async fn reassign(&self, appointment: &EventId, agent_id: AgentId) -> Result<(), BackendError> {
        let path = format!("/appointments/{}/reassign", appointment);
        self.send(Method::PUT, &path, Some(&ReassignRequest { agent_id }))
            .await
    }

    pub async fn confirm(&self, appointment: &EventId) -> Result<(), BackendError> {
        let path = format!("/appointments/{}/confirm", appointment);
        self.send::<()>(Method::POST, &path, None).await
    }

    pub async fn cancel(&self, appointment: &EventId) -> Result<(), BackendError> {
        let path = format!("/appointments/{}/cancel", appointment);
        self.send::<()>(Method::PUT, &path, None).await
    }

    pub async fn declare_availability(&self, body: &SlotRequest) -> Result<(), BackendError> {
        self.send(Method::POST, "/availability", Some(body)).await
    }

    pub async fn decide(&self, appointment: &EventId, decision: Decision) -> Result<(), BackendError> {
        let path = format!("/appointments/{}/decision", appointment);
        self.send(Method::PUT, &path, Some(&DecisionRequest { decision }))
            .await
    }

    pub async fn reserve(&self, body: &ReservationRequest) -> Result<(), BackendError> {
        self.send(Method::POST, "/appointments/reserve", Some(body))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn get_listing<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, BackendError> {
        debug!(path, "GET");
        let response = self.request(Method::GET, path).query(query).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(rejection(status.as_u16(), &text));
        }
        // Some endpoints answer an empty body instead of [].
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<serde_json::Value> = serde_json::from_str(&text)?;
        Ok(decode_listing(path, values))
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), BackendError> {
        debug!(%method, path, "command");
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(rejection(status.as_u16(), &text))
    }
}

/// Decodes every element on its own: a record of the wrong shape is logged and
/// dropped, the rest of the listing survives.
pub fn decode_listing<T: DeserializeOwned>(path: &str, values: Vec<serde_json::Value>) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(err) => {
                let reason = RecordError::Malformed(err.to_string());
                warn!(path, position, %reason, "Dropping malformed record");
                None
            }
        })
        .collect()
}

/// Builds the error for a non-2xx answer: the body's `message` when present,
/// else the raw body, else the status line.
pub fn rejection(status: u16, body: &str) -> BackendError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.message.trim().is_empty() => parsed.message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => format!("Request failed with status {}", status),
    };
    warn!(status, %message, "Backend rejected request");
    BackendError::Rejected { status, message }
}
