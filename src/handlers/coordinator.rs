use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::clients::backend_client::{AppointmentScope, ReservationRequest, SlotRequest};
use crate::error::{BackendError, SchedulingError};
use crate::handlers::dialog::{DialogMode, DialogState, SlotSelection};
use crate::models::agent::{Agent, AgentDirectory, AgentId};
use crate::models::appointment::{AppointmentStatus, Decision, RawAppointment};
use crate::models::availability::RawAvailability;
use crate::models::calendar_event::{CalendarEvent, EventId, EventKind};
use crate::models::session::{Role, SessionContext};
use crate::service::backend_service::SchedulingBackend;
use crate::service::conflict::{find_conflict, ConflictQuery};
use crate::service::normalizer::{flag_outside_availability, normalize};

pub const DEFAULT_BLOCKED_HORIZON_DAYS: u32 = 30;
pub const MAX_BLOCKED_HORIZON_DAYS: u32 = 3660;

/// What a successful assign or reassign did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentOutcome {
    pub mode: DialogMode,
    pub agent_id: AgentId,
    pub day: NaiveDate,
    /// False when the command went through but the follow-up reload failed.
    pub calendar_refreshed: bool,
}

/// Owns the calendar shown to one session and every command issued from it.
///
/// All commands are pessimistic: nothing local changes until the backend has
/// acknowledged, and an acknowledged command is followed by a full reload.
/// Client-side conflict checks only spare a round-trip; the backend still has
/// the last word.
pub struct Coordinator<'s> {
    session: &'s SessionContext,
    backend: Arc<dyn SchedulingBackend>,
    directory: AgentDirectory,
    events: Vec<CalendarEvent>,
    dialog: DialogState,
}

impl<'s> Coordinator<'s> {
    pub fn new(session: &'s SessionContext, backend: Arc<dyn SchedulingBackend>) -> Self {
        Self {
            session,
            backend,
            directory: AgentDirectory::default(),
            events: Vec::new(),
            dialog: DialogState::Closed,
        }
    }

    pub fn session(&self) -> &SessionContext {
        self.session
    }

    pub fn agents(&self) -> &[Agent] {
        self.directory.agents()
    }

    pub fn directory(&self) -> &AgentDirectory {
        &self.directory
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn dialog(&self) -> &DialogState {
        &self.dialog
    }

    pub fn event(&self, id: &EventId) -> Option<&CalendarEvent> {
        self.events.iter().find(|event| &event.id == id)
    }

    /// Events starting on `day`, in start order.
    pub fn events_on(&self, day: NaiveDate) -> Vec<&CalendarEvent> {
        let policy = &self.session.day_policy;
        let mut events: Vec<&CalendarEvent> = self
            .events
            .iter()
            .filter(|event| policy.same_day(&event.start, day))
            .collect();
        events.sort_by_key(|event| event.start);
        events
    }

    /// Agents first, then the calendar, so appointment labels can resolve.
    pub async fn initialize(&mut self) -> Result<(), SchedulingError> {
        self.load_agents().await?;
        self.load_calendar().await?;
        Ok(())
    }

    pub async fn load_agents(&mut self) -> Result<&[Agent], SchedulingError> {
        match self.session.role {
            Role::Admin => {
                let agents = match self.fetch_agent_directory().await {
                    Ok(agents) => agents,
                    Err(err) => {
                        error!(error = %err, "Failed to load agent directory");
                        self.directory = AgentDirectory::default();
                        return Err(err.into());
                    }
                };
                self.directory = AgentDirectory::new(agents);
                info!(count = self.directory.len(), "Agent directory loaded");
            }
            Role::Agent => {
                let user_id = self.session.user_id.ok_or(SchedulingError::MissingUser)?;
                self.directory = AgentDirectory::new(vec![Agent {
                    id: user_id,
                    display_name: self.session.own_label(),
                    email: None,
                }]);
            }
            Role::Client => {
                self.directory = AgentDirectory::default();
            }
        }
        Ok(self.directory.agents())
    }

    async fn fetch_agent_directory(&self) -> Result<Vec<Agent>, BackendError> {
        let allowed = self.backend.allowed_agents().await?;
        if !allowed.is_empty() {
            return Ok(keep_valid(allowed.into_iter().map(|entry| entry.adapt())));
        }
        info!("Allowed-agent listing is empty, falling back to group listing");
        let members = self.backend.group_members().await?;
        Ok(keep_valid(members.into_iter().map(|member| member.adapt())))
    }

    /// Rebuilds the whole event set. On failure the previous set is kept.
    pub async fn load_calendar(&mut self) -> Result<&[CalendarEvent], SchedulingError> {
        if self.session.role == Role::Admin && self.directory.is_empty() {
            warn!("Loading calendar before the agent directory; names will be placeholders");
        }
        let (availability, appointments) = match self.fetch_calendar().await {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, role = %self.session.role, "Failed to load calendar");
                return Err(err.into());
            }
        };
        self.events = normalize(
            &availability,
            &appointments,
            &self.directory,
            &self.session.day_policy,
        );
        if self.session.role == Role::Client {
            let flagged = flag_outside_availability(&mut self.events);
            if flagged > 0 {
                debug!(flagged, "Reservations outside any availability");
            }
        }
        debug!(count = self.events.len(), "Calendar rebuilt");
        Ok(&self.events)
    }

    async fn fetch_calendar(
        &self,
    ) -> Result<(Vec<RawAvailability>, Vec<RawAppointment>), SchedulingError> {
        match self.session.role {
            Role::Admin => {
                let availability = self.backend.availability().await?;
                let appointments = self.backend.appointments(AppointmentScope::Admin).await?;
                Ok((availability, appointments))
            }
            Role::Agent => {
                let user_id = self.session.user_id.ok_or(SchedulingError::MissingUser)?;
                let availability = self.own_availability(user_id).await?;
                let mut appointments = self
                    .backend
                    .appointments(AppointmentScope::PendingValidation)
                    .await?;
                let own = self.backend.appointments(AppointmentScope::Agent(user_id)).await?;
                appointments.extend(own.into_iter().filter(|raw| {
                    AppointmentStatus::from_wire(raw.status.as_deref()).ok()
                        == Some(AppointmentStatus::Confirmed)
                }));
                Ok((availability, appointments))
            }
            Role::Client => {
                let availability = self.backend.availability().await?;
                let appointments = self.backend.appointments(AppointmentScope::Client).await?;
                Ok((availability, appointments))
            }
        }
    }

    async fn own_availability(&self, user_id: AgentId) -> Result<Vec<RawAvailability>, BackendError> {
        match self.backend.agent_availability(user_id).await {
            Ok(slots) => Ok(slots),
            Err(err) => {
                warn!(error = %err, "Per-agent availability failed, filtering the full listing");
                let all = self.backend.availability().await?;
                Ok(all
                    .into_iter()
                    .filter(|raw| {
                        raw.agent_id
                            .as_ref()
                            .and_then(|id| id.to_agent_id("agentId").ok())
                            == Some(user_id)
                    })
                    .collect())
            }
        }
    }

    pub fn select_slot(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        self.require(Role::Admin, "assign agents")?;
        self.require_closed()?;
        if end <= start {
            return Err(SchedulingError::InvalidRange);
        }
        debug!(%start, %end, "Opening assign dialog");
        self.dialog = DialogState::Assign(SlotSelection { start, end });
        Ok(())
    }

    /// Opens the reassign dialog for an appointment. Returns `false`, leaving
    /// everything untouched, when the event is an availability.
    pub fn select_appointment(&mut self, id: &EventId) -> Result<bool, SchedulingError> {
        self.require(Role::Admin, "reassign appointments")?;
        let event = self
            .event(id)
            .cloned()
            .ok_or_else(|| SchedulingError::UnknownEvent(id.clone()))?;
        if event.kind != EventKind::Appointment {
            return Ok(false);
        }
        self.require_closed()?;
        debug!(event = %event.id, "Opening reassign dialog");
        self.dialog = DialogState::Reassign(event);
        Ok(true)
    }

    /// Closes any open dialog without sending anything. Returns whether one was open.
    pub fn cancel_dialog(&mut self) -> bool {
        let was_open = self.dialog.is_open();
        self.dialog = DialogState::Closed;
        was_open
    }

    pub async fn confirm_assignment(
        &mut self,
        agent_id: AgentId,
    ) -> Result<AssignmentOutcome, SchedulingError> {
        self.require(Role::Admin, "assign agents")?;
        let policy = self.session.day_policy;
        let (Some(mode), Some(reference)) = (self.dialog.mode(), self.dialog.reference_start())
        else {
            return Err(SchedulingError::NoSelection);
        };
        let day = policy.day_of(&reference);
        let query = match &self.dialog {
            DialogState::Reassign(event) => ConflictQuery {
                kind: EventKind::Appointment,
                agent_id,
                day,
                exclude: Some(&event.id),
            },
            _ => ConflictQuery {
                kind: EventKind::Availability,
                agent_id,
                day,
                exclude: None,
            },
        };
        if let Some(existing) = find_conflict(&self.events, &query, &policy) {
            warn!(agent = %agent_id, %day, existing = %existing.id, "Assignment blocked by local conflict");
            return Err(SchedulingError::Conflict {
                agent: agent_id,
                day,
                kind: query.kind,
            });
        }

        let dispatched = match &self.dialog {
            DialogState::Assign(slot) => {
                self.backend
                    .assign(&SlotRequest::new(agent_id, &slot.start, &slot.end))
                    .await
            }
            DialogState::Reassign(event) => self.backend.reassign(&event.id, agent_id).await,
            DialogState::Closed => return Err(SchedulingError::NoSelection),
        };
        if let Err(err) = dispatched {
            error!(error = %err, %mode, agent = %agent_id, "Assignment rejected");
            return Err(err.into());
        }

        info!(%mode, agent = %agent_id, %day, "Assignment accepted");
        self.dialog = DialogState::Closed;
        let calendar_refreshed = self.refresh_after_command().await;
        Ok(AssignmentOutcome {
            mode,
            agent_id,
            day,
            calendar_refreshed,
        })
    }

    pub async fn confirm_appointment(&mut self, id: &EventId) -> Result<bool, SchedulingError> {
        self.require(Role::Admin, "confirm appointments")?;
        self.appointment(id)?;
        self.backend.confirm(id).await.inspect_err(log_rejection)?;
        info!(appointment = %id, "Appointment confirmed");
        Ok(self.refresh_after_command().await)
    }

    pub async fn cancel_appointment(&mut self, id: &EventId) -> Result<bool, SchedulingError> {
        self.require(Role::Admin, "cancel appointments")?;
        self.appointment(id)?;
        self.backend.cancel(id).await.inspect_err(log_rejection)?;
        info!(appointment = %id, "Appointment cancelled");
        Ok(self.refresh_after_command().await)
    }

    /// Publishes a window of the signed-in agent's own availability.
    pub async fn declare_availability(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, SchedulingError> {
        self.require(Role::Agent, "declare availability")?;
        let agent_id = self.session.user_id.ok_or(SchedulingError::MissingUser)?;
        if end <= start {
            return Err(SchedulingError::InvalidRange);
        }
        let policy = self.session.day_policy;
        let day = policy.day_of(&start);
        let query = ConflictQuery {
            kind: EventKind::Availability,
            agent_id,
            day,
            exclude: None,
        };
        if find_conflict(&self.events, &query, &policy).is_some() {
            warn!(agent = %agent_id, %day, "Availability already declared that day");
            return Err(SchedulingError::Conflict {
                agent: agent_id,
                day,
                kind: EventKind::Availability,
            });
        }
        self.backend
            .declare_availability(&SlotRequest::new(agent_id, &start, &end))
            .await
            .inspect_err(log_rejection)?;
        info!(agent = %agent_id, %day, "Availability declared");
        Ok(self.refresh_after_command().await)
    }

    pub async fn decide(&mut self, id: &EventId, decision: Decision) -> Result<bool, SchedulingError> {
        self.require(Role::Agent, "validate appointments")?;
        self.appointment(id)?;
        self.backend.decide(id, decision).await.inspect_err(log_rejection)?;
        info!(appointment = %id, ?decision, "Decision recorded");
        Ok(self.refresh_after_command().await)
    }

    /// Books the given availability slot for the signed-in client.
    pub async fn reserve(&mut self, slot_id: &EventId) -> Result<bool, SchedulingError> {
        self.require(Role::Client, "reserve slots")?;
        let slot = self
            .event(slot_id)
            .filter(|event| event.kind == EventKind::Availability)
            .ok_or_else(|| SchedulingError::UnknownEvent(slot_id.clone()))?;
        let request = ReservationRequest {
            start: crate::models::timestamp::format_timestamp(&slot.start),
            duration_minutes: slot.duration_minutes(),
        };
        self.backend.reserve(&request).await.inspect_err(log_rejection)?;
        info!(slot = %slot_id, "Reservation requested");
        Ok(self.refresh_after_command().await)
    }

    /// Days in `[from, from + horizon_days)` on which nobody is available.
    /// The range stops early at the last representable date.
    pub fn blocked_days(&self, from: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
        let policy = &self.session.day_policy;
        (0..u64::from(horizon_days))
            .map_while(|offset| from.checked_add_days(Days::new(offset)))
            .filter(|day| {
                !self.events.iter().any(|event| {
                    event.kind == EventKind::Availability && policy.same_day(&event.start, *day)
                })
            })
            .collect()
    }

    async fn refresh_after_command(&mut self) -> bool {
        match self.load_calendar().await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "Command succeeded but the calendar could not be reloaded");
                false
            }
        }
    }

    fn appointment(&self, id: &EventId) -> Result<&CalendarEvent, SchedulingError> {
        let event = self
            .event(id)
            .ok_or_else(|| SchedulingError::UnknownEvent(id.clone()))?;
        if event.kind != EventKind::Appointment {
            return Err(SchedulingError::NotAnAppointment);
        }
        Ok(event)
    }

    fn require(&self, role: Role, operation: &'static str) -> Result<(), SchedulingError> {
        if self.session.role != role {
            return Err(SchedulingError::Forbidden {
                role: self.session.role,
                operation,
            });
        }
        Ok(())
    }

    fn require_closed(&self) -> Result<(), SchedulingError> {
        match self.dialog.mode() {
            Some(mode) => Err(SchedulingError::DialogBusy(mode)),
            None => Ok(()),
        }
    }
}

fn keep_valid(
    entries: impl Iterator<Item = Result<Agent, crate::error::RecordError>>,
) -> Vec<Agent> {
    entries
        .filter_map(|entry| match entry {
            Ok(agent) => Some(agent),
            Err(reason) => {
                warn!(%reason, "Dropping malformed agent entry");
                None
            }
        })
        .collect()
}

fn log_rejection(err: &BackendError) {
    error!(error = %err, "Backend refused command");
}
