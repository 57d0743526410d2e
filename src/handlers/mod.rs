pub mod coordinator;
pub mod dialog;
