pub mod backend_service;
pub mod conflict;
pub mod normalizer;
