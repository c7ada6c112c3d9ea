//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::crm::CrmClient;

/// State shared across all request handlers.
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// CRM API client, shared by every bridged call
    pub crm: Arc<CrmClient>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let crm = Arc::new(CrmClient::new(
            config.crm_base_url.clone(),
            config.crm_api_token.clone(),
        ));
        Self { config, crm }
    }
}
