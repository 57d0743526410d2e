use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::calendar_event::CalendarEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Assign,
    Reassign,
}

impl fmt::Display for DialogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogMode::Assign => f.write_str("assign"),
            DialogMode::Reassign => f.write_str("reassign"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSelection {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Assignment dialog lifecycle.
///
/// `Closed -> Assign | Reassign -> Closed`. Switching between the two open
/// modes always goes through `Closed`, either by confirming or by cancelling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    Assign(SlotSelection),
    Reassign(CalendarEvent),
}

impl DialogState {
    pub fn mode(&self) -> Option<DialogMode> {
        match self {
            DialogState::Closed => None,
            DialogState::Assign(_) => Some(DialogMode::Assign),
            DialogState::Reassign(_) => Some(DialogMode::Reassign),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, DialogState::Closed)
    }

    /// Start of the slot or appointment the dialog is about.
    pub fn reference_start(&self) -> Option<DateTime<Utc>> {
        match self {
            DialogState::Closed => None,
            DialogState::Assign(slot) => Some(slot.start),
            DialogState::Reassign(event) => Some(event.start),
        }
    }
}
