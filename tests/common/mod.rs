#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use prestationCalendar::clients::backend_client::{AppointmentScope, ReservationRequest, SlotRequest};
use prestationCalendar::error::BackendError;
use prestationCalendar::models::agent::{AgentId, AllowedAgent, GroupMember, WireId};
use prestationCalendar::models::appointment::{AppointmentStatus, Decision, RawAppointment};
use prestationCalendar::models::availability::RawAvailability;
use prestationCalendar::models::calendar_event::EventId;
use prestationCalendar::service::backend_service::SchedulingBackend;

/// In-memory backend that applies commands to its own records, so a reload
/// after a command shows the new state.
#[derive(Default)]
pub struct FakeState {
    pub allowed: Vec<AllowedAgent>,
    pub group: Vec<GroupMember>,
    pub availability: Vec<RawAvailability>,
    pub appointments: Vec<RawAppointment>,
    pub pending: Vec<RawAppointment>,
    pub client_appointments: Vec<RawAppointment>,
    pub agent_availability_fails: bool,
    pub fail_loads: bool,
    pub reject_commands: Option<(u16, String)>,
    pub calls: Vec<String>,
    pub next_id: i64,
}

#[derive(Default)]
pub struct FakeBackend {
    pub state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|call| call.starts_with(prefix)).count()
    }

    pub fn commands(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| !call.starts_with("get:"))
            .count()
    }

    pub fn reject_next_commands(&self, status: u16, message: &str) {
        self.state.lock().unwrap().reject_commands = Some((status, message.to_string()));
    }

    pub fn fail_loads(&self, fail: bool) {
        self.state.lock().unwrap().fail_loads = fail;
    }

    fn load<T: Clone>(&self, call: &str, pick: impl Fn(&FakeState) -> Vec<T>) -> Result<Vec<T>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get:{}", call));
        if state.fail_loads {
            return Err(BackendError::Rejected {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(pick(&*state))
    }

    fn command(&self, call: String, apply: impl FnOnce(&mut FakeState)) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if let Some((status, message)) = state.reject_commands.clone() {
            return Err(BackendError::Rejected { status, message });
        }
        apply(&mut *state);
        Ok(())
    }
}

fn set_status(records: &mut [RawAppointment], id: &EventId, status: AppointmentStatus) {
    for record in records.iter_mut() {
        if record.id.as_ref().map(WireId::as_key).as_deref() == Some(id.as_str()) {
            record.status = Some(status.as_wire().to_string());
        }
    }
}

#[async_trait]
impl SchedulingBackend for FakeBackend {
    async fn allowed_agents(&self) -> Result<Vec<AllowedAgent>, BackendError> {
        self.load("allowed_agents", |s| s.allowed.clone())
    }

    async fn group_members(&self) -> Result<Vec<GroupMember>, BackendError> {
        self.load("group_members", |s| s.group.clone())
    }

    async fn availability(&self) -> Result<Vec<RawAvailability>, BackendError> {
        self.load("availability", |s| s.availability.clone())
    }

    async fn agent_availability(&self, agent_id: AgentId) -> Result<Vec<RawAvailability>, BackendError> {
        let fails = self.state.lock().unwrap().agent_availability_fails;
        if fails {
            self.state.lock().unwrap().calls.push("get:agent_availability".to_string());
            return Err(BackendError::Rejected {
                status: 404,
                message: "Not Found".to_string(),
            });
        }
        self.load("agent_availability", |s| {
            s.availability
                .iter()
                .filter(|raw| raw.agent_id == Some(WireId::Number(agent_id.0)))
                .cloned()
                .collect()
        })
    }

    async fn appointments(&self, scope: AppointmentScope) -> Result<Vec<RawAppointment>, BackendError> {
        match scope {
            AppointmentScope::Admin => self.load("appointments:admin", |s| s.appointments.clone()),
            AppointmentScope::Client => {
                self.load("appointments:client", |s| s.client_appointments.clone())
            }
            AppointmentScope::PendingValidation => {
                self.load("appointments:pending", |s| s.pending.clone())
            }
            AppointmentScope::Agent(agent_id) => self.load("appointments:agent", |s| {
                s.appointments
                    .iter()
                    .filter(|raw| raw.agent_id == Some(WireId::Number(agent_id.0)))
                    .cloned()
                    .collect()
            }),
        }
    }

    async fn assign(&self, request: &SlotRequest) -> Result<(), BackendError> {
        let request = request.clone();
        self.command(format!("assign:{}", request.agent_id), move |s| {
            s.next_id += 1;
            let id = 1000 + s.next_id;
            s.availability.push(RawAvailability {
                id: Some(WireId::Number(id)),
                agent_id: Some(WireId::Number(request.agent_id.0)),
                agent_name: None,
                start: Some(request.start),
                end: Some(request.end),
            });
        })
    }

    async fn reassign(&self, appointment: &EventId, agent_id: AgentId) -> Result<(), BackendError> {
        let target = appointment.clone();
        self.command(format!("reassign:{}:{}", appointment, agent_id), move |s| {
            for record in s.appointments.iter_mut() {
                if record.id.as_ref().map(WireId::as_key).as_deref() == Some(target.as_str()) {
                    record.agent_id = Some(WireId::Number(agent_id.0));
                }
            }
        })
    }

    async fn confirm(&self, appointment: &EventId) -> Result<(), BackendError> {
        let target = appointment.clone();
        self.command(format!("confirm:{}", appointment), move |s| {
            set_status(&mut s.appointments, &target, AppointmentStatus::Confirmed)
        })
    }

    async fn cancel(&self, appointment: &EventId) -> Result<(), BackendError> {
        let target = appointment.clone();
        self.command(format!("cancel:{}", appointment), move |s| {
            set_status(&mut s.appointments, &target, AppointmentStatus::Cancelled)
        })
    }

    async fn declare_availability(&self, request: &SlotRequest) -> Result<(), BackendError> {
        let request = request.clone();
        self.command(format!("declare:{}", request.agent_id), move |s| {
            s.next_id += 1;
            let id = 2000 + s.next_id;
            s.availability.push(RawAvailability {
                id: Some(WireId::Number(id)),
                agent_id: Some(WireId::Number(request.agent_id.0)),
                agent_name: None,
                start: Some(request.start),
                end: Some(request.end),
            });
        })
    }

    async fn decide(&self, appointment: &EventId, decision: Decision) -> Result<(), BackendError> {
        let target = appointment.clone();
        self.command(format!("decide:{}:{:?}", appointment, decision), move |s| {
            let status = match decision {
                Decision::Accept => AppointmentStatus::Confirmed,
                Decision::Refuse => AppointmentStatus::Cancelled,
            };
            set_status(&mut s.pending, &target, status);
        })
    }

    async fn reserve(&self, request: &ReservationRequest) -> Result<(), BackendError> {
        let request = request.clone();
        self.command(format!("reserve:{}", request.start), move |s| {
            s.next_id += 1;
            let id = 3000 + s.next_id;
            s.client_appointments.push(RawAppointment {
                id: Some(WireId::Number(id)),
                start: Some(request.start),
                duration_minutes: Some(request.duration_minutes),
                status: Some("pending".to_string()),
                ..Default::default()
            });
        })
    }
}

pub fn allowed(id: i64, name: &str) -> AllowedAgent {
    AllowedAgent {
        id: WireId::Number(id),
        name: name.to_string(),
        email: None,
    }
}

pub fn slot(id: i64, agent: i64, start: &str, end: &str) -> RawAvailability {
    RawAvailability {
        id: Some(WireId::Number(id)),
        agent_id: Some(WireId::Number(agent)),
        agent_name: None,
        start: Some(start.to_string()),
        end: Some(end.to_string()),
    }
}

pub fn appointment(id: i64, agent: Option<i64>, start: &str, minutes: i64, status: &str) -> RawAppointment {
    RawAppointment {
        id: Some(WireId::Number(id)),
        agent_id: agent.map(WireId::Number),
        client_name: Some("Client".to_string()),
        start: Some(start.to_string()),
        duration_minutes: Some(minutes),
        status: Some(status.to_string()),
        ..Default::default()
    }
}
