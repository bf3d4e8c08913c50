use crate::accounts::CredentialStore;
use crate::setup::ConfigService;
use std::sync::Arc;

/// Application state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigService>,
    pub credentials: Arc<CredentialStore>,
}
