//! Audit event model.
//!
//! Administrative operations are logged as events. Each event records:
//! - Timestamp (ISO 8601)
//! - Event type, and from it the operation and resource type
//! - Realm, acting admin and source IP (when available)
//! - Resource path relative to the realm (e.g. `authentication/flows/{id}`)
//! - Outcome (success/failure)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Realm events
    /// Realm created.
    RealmCreated,
    /// Realm updated.
    RealmUpdated,
    /// Realm deleted.
    RealmDeleted,

    // Flow events
    /// Top-level authentication flow created.
    AuthFlowCreated,
    /// Authentication flow updated.
    AuthFlowUpdated,
    /// Authentication flow deleted.
    AuthFlowDeleted,
    /// Authentication flow copied under a new alias.
    AuthFlowCopied,

    // Execution events
    /// Authenticator execution added to a flow.
    AuthExecutionCreated,
    /// Nested flow execution added to a flow.
    AuthExecutionFlowCreated,
    /// Execution requirement updated.
    AuthExecutionUpdated,
    /// Execution removed.
    AuthExecutionDeleted,
    /// Execution priority raised or lowered.
    AuthExecutionMoved,

    // Authenticator config events
    /// Authenticator config created.
    AuthenticatorConfigCreated,
    /// Authenticator config updated.
    AuthenticatorConfigUpdated,
    /// Authenticator config deleted.
    AuthenticatorConfigDeleted,
}

/// Kind of change an admin event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Resource created.
    Create,
    /// Resource updated.
    Update,
    /// Resource deleted.
    Delete,
    /// Non-CRUD action (copy, priority change).
    Action,
}

/// Kind of resource an admin event touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    /// A realm.
    Realm,
    /// An authentication flow.
    AuthFlow,
    /// An authenticator execution.
    AuthExecution,
    /// An execution that wraps a nested flow.
    AuthExecutionFlow,
    /// An authenticator configuration.
    AuthenticatorConfig,
}

impl EventType {
    /// Returns the operation this event type records.
    #[must_use]
    pub const fn operation_type(self) -> OperationType {
        match self {
            Self::RealmCreated
            | Self::AuthFlowCreated
            | Self::AuthExecutionCreated
            | Self::AuthExecutionFlowCreated
            | Self::AuthenticatorConfigCreated => OperationType::Create,
            Self::RealmUpdated
            | Self::AuthFlowUpdated
            | Self::AuthExecutionUpdated
            | Self::AuthenticatorConfigUpdated => OperationType::Update,
            Self::RealmDeleted
            | Self::AuthFlowDeleted
            | Self::AuthExecutionDeleted
            | Self::AuthenticatorConfigDeleted => OperationType::Delete,
            Self::AuthFlowCopied | Self::AuthExecutionMoved => OperationType::Action,
        }
    }

    /// Returns the resource type this event type touches.
    #[must_use]
    pub const fn resource_type(self) -> ResourceType {
        match self {
            Self::RealmCreated | Self::RealmUpdated | Self::RealmDeleted => ResourceType::Realm,
            Self::AuthFlowCreated
            | Self::AuthFlowUpdated
            | Self::AuthFlowDeleted
            | Self::AuthFlowCopied => ResourceType::AuthFlow,
            Self::AuthExecutionCreated
            | Self::AuthExecutionUpdated
            | Self::AuthExecutionDeleted
            | Self::AuthExecutionMoved => ResourceType::AuthExecution,
            Self::AuthExecutionFlowCreated => ResourceType::AuthExecutionFlow,
            Self::AuthenticatorConfigCreated
            | Self::AuthenticatorConfigUpdated
            | Self::AuthenticatorConfigDeleted => ResourceType::AuthenticatorConfig,
        }
    }
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event (ISO 8601).
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Realm ID where the event occurred.
    pub realm_id: Option<Uuid>,

    /// Acting user ID.
    pub user_id: Option<Uuid>,

    /// Source IP address.
    pub ip_address: Option<String>,

    /// Resource path relative to the realm admin root.
    pub resource_path: Option<String>,

    /// JSON representation submitted with the operation, if any.
    pub representation: Option<serde_json::Value>,

    /// Error message (for failure events).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// Returns the operation type of this event.
    #[must_use]
    pub const fn operation_type(&self) -> OperationType {
        self.event_type.operation_type()
    }

    /// Returns the resource type of this event.
    #[must_use]
    pub const fn resource_type(&self) -> ResourceType {
        self.event_type.resource_type()
    }

    /// Looks up a detail value by key.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    realm_id: Option<Uuid>,
    user_id: Option<Uuid>,
    ip_address: Option<String>,
    resource_path: Option<String>,
    representation: Option<serde_json::Value>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            realm_id: None,
            user_id: None,
            ip_address: None,
            resource_path: None,
            representation: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to success.
    #[must_use]
    pub const fn success(mut self) -> Self {
        self.outcome = EventOutcome::Success;
        self
    }

    /// Sets the outcome to failure with an error message.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the realm ID.
    #[must_use]
    pub const fn realm(mut self, realm_id: Uuid) -> Self {
        self.realm_id = Some(realm_id);
        self
    }

    /// Sets the acting user ID.
    #[must_use]
    pub const fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the IP address.
    #[must_use]
    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Sets the resource path.
    #[must_use]
    pub fn resource_path(mut self, path: impl Into<String>) -> Self {
        self.resource_path = Some(path.into());
        self
    }

    /// Attaches the submitted representation.
    #[must_use]
    pub fn representation(mut self, representation: serde_json::Value) -> Self {
        self.representation = Some(representation);
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            realm_id: self.realm_id,
            user_id: self.user_id,
            ip_address: self.ip_address,
            resource_path: self.resource_path,
            representation: self.representation,
            error: self.error,
            details: self.details,
        }
    }
}
