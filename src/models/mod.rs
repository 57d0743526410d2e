pub mod agent;
pub mod appointment;
pub mod availability;
pub mod calendar_event;
pub mod session;
pub mod timestamp;
