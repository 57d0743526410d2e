use async_trait::async_trait;

use crate::clients::backend_client::{
    AppointmentScope, BackendClient, ReservationRequest, SlotRequest,
};
use crate::error::BackendError;
use crate::models::agent::{AgentId, AllowedAgent, GroupMember};
use crate::models::appointment::{Decision, RawAppointment};
use crate::models::availability::RawAvailability;
use crate::models::calendar_event::EventId;

/// Everything the coordinator needs from the scheduling backend.
#[async_trait]
pub trait SchedulingBackend: Send + Sync {
    async fn allowed_agents(&self) -> Result<Vec<AllowedAgent>, BackendError>;

    /// Looser listing, only consulted when `allowed_agents` comes back empty.
    async fn group_members(&self) -> Result<Vec<GroupMember>, BackendError>;

    async fn availability(&self) -> Result<Vec<RawAvailability>, BackendError>;

    async fn agent_availability(&self, agent_id: AgentId)
        -> Result<Vec<RawAvailability>, BackendError>;

    async fn appointments(&self, scope: AppointmentScope)
        -> Result<Vec<RawAppointment>, BackendError>;

    async fn assign(&self, request: &SlotRequest) -> Result<(), BackendError>;

    async fn reassign(&self, appointment: &EventId, agent_id: AgentId) -> Result<(), BackendError>;

    async fn confirm(&self, appointment: &EventId) -> Result<(), BackendError>;

    async fn cancel(&self, appointment: &EventId) -> Result<(), BackendError>;

    async fn declare_availability(&self, request: &SlotRequest) -> Result<(), BackendError>;

    async fn decide(&self, appointment: &EventId, decision: Decision) -> Result<(), BackendError>;

    async fn reserve(&self, request: &ReservationRequest) -> Result<(), BackendError>;
}

pub struct BackendService {
    client: BackendClient,
}

impl BackendService {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SchedulingBackend for BackendService {
    async fn allowed_agents(&self) -> Result<Vec<AllowedAgent>, BackendError> {
        self.client.allowed_agents().await
    }

    async fn group_members(&self) -> Result<Vec<GroupMember>, BackendError> {
        self.client.group_members().await
    }

    async fn availability(&self) -> Result<Vec<RawAvailability>, BackendError> {
        self.client.availability().await
    }

    async fn agent_availability(
        &self,
        agent_id: AgentId,
    ) -> Result<Vec<RawAvailability>, BackendError> {
        self.client.agent_availability(agent_id).await
    }

    async fn appointments(
        &self,
        scope: AppointmentScope,
    ) -> Result<Vec<RawAppointment>, BackendError> {
        self.client.appointments(scope).await
    }

    async fn assign(&self, request: &SlotRequest) -> Result<(), BackendError> {
        self.client.assign(request).await
    }

    async fn reassign(&self, appointment: &EventId, agent_id: AgentId) -> Result<(), BackendError> {
        self.client.reassign(appointment, agent_id).await
    }

    async fn confirm(&self, appointment: &EventId) -> Result<(), BackendError> {
        self.client.confirm(appointment).await
    }

    async fn cancel(&self, appointment: &EventId) -> Result<(), BackendError> {
        self.client.cancel(appointment).await
    }

    async fn declare_availability(&self, request: &SlotRequest) -> Result<(), BackendError> {
        self.client.declare_availability(request).await
    }

    async fn decide(&self, appointment: &EventId, decision: Decision) -> Result<(), BackendError> {
        self.client.decide(appointment, decision).await
    }

    async fn reserve(&self, request: &ReservationRequest) -> Result<(), BackendError> {
        self.client.reserve(request).await
    }
}
