//! Admin API state management.

use std::sync::Arc;

use kc_auth::ProviderRegistry;
use kc_core::Event;
use kc_model::Realm;
use kc_storage::{AuthFlowProvider, RealmProvider};

use crate::error::{AdminError, AdminResult};
use crate::events::{self, AdminEventLogger};

/// Admin API application state.
///
/// `S` stores realms and their flows; `L` receives admin events.
pub struct AdminState<S, L>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    /// Realm and flow storage.
    pub storage: Arc<S>,
    /// Authenticator provider metadata.
    pub providers: Arc<ProviderRegistry>,
    /// Admin event sink.
    pub events: Arc<L>,
}

// Manual Clone implementation that doesn't require T: Clone for Arc<T>
impl<S, L> Clone for AdminState<S, L>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            providers: Arc::clone(&self.providers),
            events: Arc::clone(&self.events),
        }
    }
}

impl<S, L> AdminState<S, L>
where
    S: RealmProvider + AuthFlowProvider,
    L: AdminEventLogger,
{
    /// Creates a new admin state.
    pub const fn new(storage: Arc<S>, providers: Arc<ProviderRegistry>, events: Arc<L>) -> Self {
        Self {
            storage,
            providers,
            events,
        }
    }

    /// Looks up a realm by name.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if no realm has that name.
    pub async fn realm(&self, name: &str) -> AdminResult<Realm> {
        RealmProvider::get_by_name(self.storage.as_ref(), name)
            .await?
            .ok_or_else(|| AdminError::not_found("Realm", name))
    }

    /// Records an admin event. Logging failures never fail the request.
    pub async fn emit(&self, event: Event) {
        events::emit(self.events.as_ref(), event).await;
    }
}
