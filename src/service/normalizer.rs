use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::RecordError;
use crate::models::agent::{AgentDirectory, AgentId};
use crate::models::appointment::{Appointment, AppointmentStatus, RawAppointment};
use crate::models::availability::{AvailabilitySlot, RawAvailability};
use crate::models::calendar_event::{CalendarEvent, EventColor, EventId, EventKind};
use crate::models::session::DayPolicy;

pub const UNASSIGNED_LABEL: &str = "unassigned";
pub const OUTSIDE_AVAILABILITY_LABEL: &str = "Outside availability";
const DEFAULT_CLIENT_LABEL: &str = "Client";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRejection {
    pub kind: EventKind,
    pub record_id: String,
    pub reason: RecordError,
}

/// Merges availability and appointment records into one calendar, dropping
/// (and logging) every record that fails the wire contract.
pub fn normalize(
    raw_availabilities: &[RawAvailability],
    raw_appointments: &[RawAppointment],
    directory: &AgentDirectory,
    policy: &DayPolicy,
) -> Vec<CalendarEvent> {
    let (events, rejected) =
        normalize_report(raw_availabilities, raw_appointments, directory, policy);
    for rejection in &rejected {
        warn!(
            kind = %rejection.kind,
            record = %rejection.record_id,
            reason = %rejection.reason,
            "Dropping malformed calendar record"
        );
    }
    events
}

/// Same as [`normalize`] but hands the rejections back instead of logging them.
pub fn normalize_report(
    raw_availabilities: &[RawAvailability],
    raw_appointments: &[RawAppointment],
    directory: &AgentDirectory,
    policy: &DayPolicy,
) -> (Vec<CalendarEvent>, Vec<RecordRejection>) {
    let mut events = Vec::with_capacity(raw_availabilities.len() + raw_appointments.len());
    let mut rejected = Vec::new();

    for raw in raw_availabilities {
        match raw.adapt(policy) {
            Ok(slot) => events.push(availability_event(&slot, directory)),
            Err(reason) => rejected.push(RecordRejection {
                kind: EventKind::Availability,
                record_id: raw.key(),
                reason,
            }),
        }
    }

    for raw in raw_appointments {
        match raw.adapt(policy) {
            Ok(appointment) => events.push(appointment_event(&appointment, directory)),
            Err(reason) => rejected.push(RecordRejection {
                kind: EventKind::Appointment,
                record_id: raw.key(),
                reason,
            }),
        }
    }

    (events, rejected)
}

pub fn availability_event(slot: &AvailabilitySlot, directory: &AgentDirectory) -> CalendarEvent {
    let title = directory
        .get(slot.agent_id)
        .map(|agent| agent.display_name.clone())
        .or_else(|| slot.agent_name.clone())
        .unwrap_or_else(|| placeholder(slot.agent_id));
    let id = match &slot.id {
        Some(id) => format!("availability-{}", id),
        None => format!("availability-{}", Uuid::new_v4()),
    };
    CalendarEvent {
        id: EventId(id),
        kind: EventKind::Availability,
        agent_id: Some(slot.agent_id),
        start: slot.start,
        end: slot.end,
        status: None,
        title,
        color: EventColor::Blue,
    }
}

pub fn appointment_event(appointment: &Appointment, directory: &AgentDirectory) -> CalendarEvent {
    let title = appointment.title.clone().unwrap_or_else(|| {
        let agent = agent_label(appointment, directory);
        let client = appointment
            .client_name
            .as_deref()
            .unwrap_or(DEFAULT_CLIENT_LABEL);
        format!("Appointment: {} / {}", client, agent)
    });
    CalendarEvent {
        id: EventId(appointment.id.clone()),
        kind: EventKind::Appointment,
        agent_id: appointment.agent_id,
        start: appointment.start,
        end: appointment.end,
        status: Some(appointment.status),
        title,
        color: EventColor::for_status(appointment.status),
    }
}

/// Marks pending appointments whose window matches no availability slot
/// exactly: red, with the title prefixed. Returns how many were marked.
pub fn flag_outside_availability(events: &mut [CalendarEvent]) -> usize {
    let windows: HashSet<(DateTime<Utc>, DateTime<Utc>)> = events
        .iter()
        .filter(|event| event.kind == EventKind::Availability)
        .map(|event| (event.start, event.end))
        .collect();
    let mut flagged = 0;
    for event in events
        .iter_mut()
        .filter(|event| event.status == Some(AppointmentStatus::Pending))
    {
        if !windows.contains(&(event.start, event.end)) {
            event.color = EventColor::Red;
            event.title = format!("{}: {}", OUTSIDE_AVAILABILITY_LABEL, event.title);
            flagged += 1;
        }
    }
    flagged
}

fn agent_label(appointment: &Appointment, directory: &AgentDirectory) -> String {
    let Some(agent_id) = appointment.agent_id else {
        return UNASSIGNED_LABEL.to_string();
    };
    directory
        .get(agent_id)
        .map(|agent| agent.display_name.clone())
        .or_else(|| appointment.agent_name.clone())
        .unwrap_or_else(|| placeholder(agent_id))
}

fn placeholder(agent_id: AgentId) -> String {
    format!("Agent {}", agent_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::{Agent, WireId};
    use crate::models::appointment::AppointmentStatus;

    fn directory() -> AgentDirectory {
        AgentDirectory::new(vec![Agent {
            id: AgentId(7),
            display_name: "Sofia".to_string(),
            email: None,
        }])
    }

    fn slot(agent: i64, id: Option<i64>, name: Option<&str>) -> RawAvailability {
        RawAvailability {
            id: id.map(WireId::Number),
            agent_id: Some(WireId::Number(agent)),
            agent_name: name.map(str::to_string),
            start: Some("2024-06-10T09:00".into()),
            end: Some("2024-06-10T10:00".into()),
        }
    }

    #[test]
    fn availability_titles_resolve_in_order() {
        let events = normalize(
            &[slot(7, Some(1), Some("ignored")), slot(8, Some(2), Some("Karim")), slot(9, None, None)],
            &[],
            &directory(),
            &DayPolicy::utc(),
        );
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Sofia", "Karim", "Agent 9"]);
        assert_eq!(events[0].id, EventId::from("availability-1"));
        assert!(events[2].id.as_str().starts_with("availability-"));
        assert!(events.iter().all(|e| e.color == EventColor::Blue));
    }

    #[test]
    fn appointments_get_status_colors_and_unassigned_label() {
        let raw = |id: i64, agent: Option<i64>, status: &str| RawAppointment {
            id: Some(WireId::Number(id)),
            agent_id: agent.map(WireId::Number),
            client_name: Some("Mme Durand".into()),
            start: Some("2024-06-10T09:00".into()),
            duration_minutes: Some(30),
            status: Some(status.into()),
            ..Default::default()
        };
        let events = normalize(
            &[],
            &[raw(1, None, "pending"), raw(2, Some(7), "confirmed"), raw(3, Some(4), "cancelled")],
            &directory(),
            &DayPolicy::utc(),
        );
        assert_eq!(events[0].title, "Appointment: Mme Durand / unassigned");
        assert_eq!(events[0].color, EventColor::Amber);
        assert_eq!(events[1].title, "Appointment: Mme Durand / Sofia");
        assert_eq!(events[1].color, EventColor::Green);
        assert_eq!(events[2].title, "Appointment: Mme Durand / Agent 4");
        assert_eq!(events[2].color, EventColor::Red);
        assert_eq!(events[2].status, Some(AppointmentStatus::Cancelled));
        assert_eq!(events[1].duration_minutes(), 30);
    }

    #[test]
    fn malformed_records_are_rejected_individually() {
        let mut broken = slot(7, Some(3), None);
        broken.start = Some("2024-13-45T99:00".into());
        let (events, rejected) = normalize_report(
            &[slot(7, Some(1), None), broken],
            &[RawAppointment::default()],
            &directory(),
            &DayPolicy::utc(),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].record_id, "3");
        assert!(matches!(rejected[0].reason, RecordError::InvalidTimestamp { field: "start", .. }));
        assert_eq!(rejected[1].kind, EventKind::Appointment);
    }

    #[test]
    fn huge_duration_only_drops_its_own_record() {
        let ok = RawAppointment {
            id: Some(WireId::Number(1)),
            start: Some("2024-06-10T09:00".into()),
            duration_minutes: Some(30),
            ..Default::default()
        };
        let huge = RawAppointment {
            id: Some(WireId::Number(2)),
            duration_minutes: Some(i64::MAX / 2),
            ..ok.clone()
        };
        let (events, rejected) =
            normalize_report(&[], &[ok, huge], &directory(), &DayPolicy::utc());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, EventId::from("1"));
        assert_eq!(rejected[0].record_id, "2");
        assert_eq!(rejected[0].reason, RecordError::InvalidDuration(i64::MAX / 2));
    }

    #[test]
    fn pending_appointment_off_every_slot_is_flagged() {
        let booked = |id: i64, start: &str, status: &str| RawAppointment {
            id: Some(WireId::Number(id)),
            start: Some(start.into()),
            duration_minutes: Some(60),
            status: Some(status.into()),
            ..Default::default()
        };
        let mut events = normalize(
            &[slot(7, Some(1), None)],
            &[
                booked(10, "2024-06-10T09:00", "pending"),
                booked(11, "2024-06-10T15:00", "pending"),
                booked(12, "2024-06-10T15:00", "valide"),
            ],
            &directory(),
            &DayPolicy::utc(),
        );
        assert_eq!(flag_outside_availability(&mut events), 1);
        assert_eq!(events[1].color, EventColor::Amber);
        assert_eq!(events[2].color, EventColor::Red);
        assert!(events[2].title.starts_with("Outside availability: "));
        assert_eq!(events[3].color, EventColor::Green);
    }
}
