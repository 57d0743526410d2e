use chrono::NaiveDate;

use crate::models::agent::AgentId;
use crate::models::calendar_event::{CalendarEvent, EventId, EventKind};
use crate::models::session::DayPolicy;

/// "Does this agent already hold an event of this kind on this day?"
#[derive(Debug, Clone, Copy)]
pub struct ConflictQuery<'a> {
    pub kind: EventKind,
    pub agent_id: AgentId,
    pub day: NaiveDate,
    pub exclude: Option<&'a EventId>,
}

/// True iff some event matches kind, agent and calendar day, other than the
/// excluded one. Cancelled appointments never hold a day.
pub fn has_conflict(events: &[CalendarEvent], query: &ConflictQuery<'_>, policy: &DayPolicy) -> bool {
    find_conflict(events, query, policy).is_some()
}

pub fn find_conflict<'e>(
    events: &'e [CalendarEvent],
    query: &ConflictQuery<'_>,
    policy: &DayPolicy,
) -> Option<&'e CalendarEvent> {
    events.iter().find(|event| {
        event.kind == query.kind
            && event.agent_id == Some(query.agent_id)
            && query.exclude != Some(&event.id)
            && (event.kind == EventKind::Availability || event.is_active())
            && policy.same_day(&event.start, query.day)
    })
}
