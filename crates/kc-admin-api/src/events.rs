//! Admin event logging for the Admin API.
//!
//! Every successful mutation of a realm, flow, execution or authenticator
//! config is recorded as an [`Event`] carrying the acting admin and the
//! realm-relative resource path (see [`crate::paths`]).

use async_trait::async_trait;
use kc_core::event::{Event, EventBuilder, EventType};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AdminAuth;

// ============================================================================
// Event Logger Trait
// ============================================================================

/// Trait for logging admin events.
#[async_trait]
pub trait AdminEventLogger: Send + Sync {
    /// Logs an admin event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be logged.
    async fn log(&self, event: Event) -> Result<(), EventLogError>;
}

/// Errors that can occur during event logging.
#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// In-Memory Logger
// ============================================================================

/// Event logger that keeps every event in memory.
#[derive(Debug, Default)]
pub struct InMemoryEventLogger {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventLogger {
    /// Creates a new in-memory logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all logged events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Returns the most recent event.
    #[must_use]
    pub fn last(&self) -> Option<Event> {
        self.events.read().last().cloned()
    }

    /// Returns the logged events of one type.
    #[must_use]
    pub fn events_of(&self, event_type: EventType) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Clears all logged events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl AdminEventLogger for InMemoryEventLogger {
    async fn log(&self, event: Event) -> Result<(), EventLogError> {
        self.events.write().push(event);
        Ok(())
    }
}

// ============================================================================
// Tracing Logger
// ============================================================================

/// Event logger that writes to the tracing framework at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLogger;

impl TracingEventLogger {
    /// Creates a new tracing logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AdminEventLogger for TracingEventLogger {
    async fn log(&self, event: Event) -> Result<(), EventLogError> {
        let representation = event
            .representation
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            operation_type = ?event.operation_type(),
            resource_type = ?event.resource_type(),
            resource_path = ?event.resource_path,
            outcome = ?event.outcome,
            realm_id = ?event.realm_id,
            user_id = ?event.user_id,
            representation = ?representation,
            error = ?event.error,
            "admin_event"
        );
        Ok(())
    }
}

/// Logs an event, reporting failures without propagating them.
pub async fn emit<L: AdminEventLogger + ?Sized>(logger: &L, event: Event) {
    let event_type = event.event_type;
    if let Err(e) = logger.log(event).await {
        tracing::warn!(error = %e, ?event_type, "failed to log admin event");
    }
}

// ============================================================================
// Admin Event Builder
// ============================================================================

/// Builds admin events with the acting admin attached.
pub struct AdminEventBuilder {
    builder: EventBuilder,
}

impl AdminEventBuilder {
    /// Creates a new admin event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            builder: Event::builder(event_type),
        }
    }

    /// Sets the admin context from authentication.
    #[must_use]
    pub fn with_auth(mut self, auth: &AdminAuth) -> Self {
        self.builder = self
            .builder
            .user(auth.user_id)
            .detail("admin_username", auth.username.clone())
            .detail("admin_realm", auth.realm.clone());
        self
    }

    /// Sets the realm context.
    #[must_use]
    pub fn realm(mut self, realm_id: Uuid) -> Self {
        self.builder = self.builder.realm(realm_id);
        self
    }

    /// Sets the realm-relative resource path.
    #[must_use]
    pub fn resource_path(mut self, path: impl Into<String>) -> Self {
        self.builder = self.builder.resource_path(path);
        self
    }

    /// Attaches the representation the operation submitted or produced.
    ///
    /// Values that fail to serialize are left out.
    #[must_use]
    pub fn representation(mut self, representation: &impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(representation) {
            self.builder = self.builder.representation(value);
        }
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.detail(key, value);
        self
    }

    /// Builds a success event.
    #[must_use]
    pub fn success(self) -> Event {
        self.builder.success().build()
    }
}
