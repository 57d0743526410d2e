use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::clients::backend_client::BackendClient;
use crate::config::{AppConfig, ConfigError};
use crate::models::session::SessionContext;
use crate::service::backend_service::{BackendService, SchedulingBackend};

/// Installs the global subscriber; logs go to stderr so stdout stays for
/// command output. Safe to call more than once.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Builds the session and the REST backend it talks to.
pub fn connect(config: &AppConfig) -> Result<(SessionContext, Arc<dyn SchedulingBackend>), ConfigError> {
    let session = config.session()?;
    let client = BackendClient::new(&config.base_url(), &session.token);
    tracing::info!(base_url = client.base_url(), role = %session.role, "Session opened");
    let backend: Arc<dyn SchedulingBackend> = Arc::new(BackendService::new(client));
    Ok((session, backend))
}
