//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use kc_admin_api::{AdminState, TracingEventLogger};
use kc_auth::ProviderRegistry;
use kc_storage_memory::InMemoryStorage;

use crate::config::ServerConfig;

/// Admin API state as hosted by this server.
pub type ServerAdminState = AdminState<InMemoryStorage, TracingEventLogger>;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,

    /// Realm and flow storage.
    pub storage: Arc<InMemoryStorage>,

    /// Authenticator provider metadata.
    pub providers: Arc<ProviderRegistry>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: ServerConfig, storage: Arc<InMemoryStorage>) -> Self {
        Self {
            config,
            storage,
            providers: Arc::new(ProviderRegistry::with_builtin()),
        }
    }

    /// Gets the state for the admin endpoints.
    pub fn admin_state(&self) -> ServerAdminState {
        AdminState::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.providers),
            Arc::new(TracingEventLogger::new()),
        )
    }

    /// Returns the server configuration.
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }
}
