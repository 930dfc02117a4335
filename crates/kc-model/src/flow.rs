//! Authentication flow domain model.
//!
//! An authentication flow is an ordered list of executions. Each execution
//! either runs an authenticator or descends into a nested flow, and carries
//! a requirement level that decides how its outcome affects the parent.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a wire string does not name a known model value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseModelError {
    /// What was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Requirement level of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Requirement {
    /// Must succeed for the parent flow to succeed.
    Required,
    /// One alternative succeeding is enough.
    Alternative,
    /// Nested flow evaluated only when its conditions match.
    Conditional,
    /// Not evaluated.
    Disabled,
}

impl Requirement {
    /// Returns the wire name (`"REQUIRED"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::Alternative => "ALTERNATIVE",
            Self::Conditional => "CONDITIONAL",
            Self::Disabled => "DISABLED",
        }
    }

    /// Checks whether this execution participates in flow processing.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Requirement {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "REQUIRED" => Ok(Self::Required),
            "ALTERNATIVE" => Ok(Self::Alternative),
            "CONDITIONAL" => Ok(Self::Conditional),
            "DISABLED" => Ok(Self::Disabled),
            _ => Err(ParseModelError {
                kind: "requirement",
                value: s.to_string(),
            }),
        }
    }
}

/// Flow type (the flow's provider id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowType {
    /// Generic flow of authenticators and nested flows.
    #[default]
    BasicFlow,
    /// Flow rendered as a single form; its executions are form actions.
    FormFlow,
    /// Flow of client authenticators.
    ClientFlow,
}

impl FlowType {
    /// Returns the provider id (`"basic-flow"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BasicFlow => "basic-flow",
            Self::FormFlow => "form-flow",
            Self::ClientFlow => "client-flow",
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowType {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic-flow" => Ok(Self::BasicFlow),
            "form-flow" => Ok(Self::FormFlow),
            "client-flow" => Ok(Self::ClientFlow),
            _ => Err(ParseModelError {
                kind: "flow type",
                value: s.to_string(),
            }),
        }
    }
}

/// An authentication flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationFlow {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this flow belongs to.
    pub realm_id: Uuid,
    /// Alias (unique within the realm).
    pub alias: String,
    /// Human-readable description.
    pub description: Option<String>,

    // === Shape ===
    /// Flow type.
    pub provider_id: FlowType,
    /// Whether this flow can be bound directly (not nested).
    pub top_level: bool,
    /// Whether this flow ships with the realm and is protected.
    pub built_in: bool,

    // === Timestamps ===
    /// When the flow was created.
    pub created_at: DateTime<Utc>,
    /// When the flow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl AuthenticationFlow {
    /// Creates a new top-level flow.
    #[must_use]
    pub fn new_top_level(realm_id: Uuid, alias: impl Into<String>, provider_id: FlowType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            realm_id,
            alias: alias.into(),
            description: None,
            provider_id,
            top_level: true,
            built_in: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a new nested flow.
    #[must_use]
    pub fn new_nested(realm_id: Uuid, alias: impl Into<String>, provider_id: FlowType) -> Self {
        Self {
            top_level: false,
            ..Self::new_top_level(realm_id, alias, provider_id)
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Marks the flow as built-in.
    #[must_use]
    pub const fn as_built_in(mut self) -> Self {
        self.built_in = true;
        self
    }

    /// Checks if this is a form flow.
    #[must_use]
    pub fn is_form_flow(&self) -> bool {
        self.provider_id == FlowType::FormFlow
    }
}

/// A step within a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationExecution {
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this execution belongs to.
    pub realm_id: Uuid,
    /// Flow this execution is a step of.
    pub parent_flow: Uuid,
    /// Provider id of the authenticator (or form, for nested form flows).
    pub authenticator: Option<String>,
    /// Nested flow run by this execution.
    pub flow_id: Option<Uuid>,
    /// Whether this execution runs a nested flow.
    pub authenticator_flow: bool,
    /// Requirement level.
    pub requirement: Requirement,
    /// Ordering within the parent; lower runs first.
    pub priority: i32,
    /// Authenticator config attached to this execution.
    pub authenticator_config: Option<Uuid>,
}

impl AuthenticationExecution {
    /// Creates an execution that runs an authenticator.
    #[must_use]
    pub fn authenticator(
        realm_id: Uuid,
        parent_flow: Uuid,
        authenticator: impl Into<String>,
        requirement: Requirement,
        priority: i32,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            realm_id,
            parent_flow,
            authenticator: Some(authenticator.into()),
            flow_id: None,
            authenticator_flow: false,
            requirement,
            priority,
            authenticator_config: None,
        }
    }

    /// Creates an execution that runs a nested flow.
    #[must_use]
    pub fn sub_flow(
        realm_id: Uuid,
        parent_flow: Uuid,
        flow_id: Uuid,
        requirement: Requirement,
        priority: i32,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            realm_id,
            parent_flow,
            authenticator: None,
            flow_id: Some(flow_id),
            authenticator_flow: true,
            requirement,
            priority,
            authenticator_config: None,
        }
    }

    /// Sets the authenticator provider id (used by nested form flows).
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: impl Into<String>) -> Self {
        self.authenticator = Some(authenticator.into());
        self
    }
}

/// Configuration attached to an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorConfig {
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this config belongs to.
    pub realm_id: Uuid,
    /// Alias.
    pub alias: String,
    /// Key-value settings.
    pub config: HashMap<String, String>,
}

impl AuthenticatorConfig {
    /// Creates a new config.
    #[must_use]
    pub fn new(realm_id: Uuid, alias: impl Into<String>, config: HashMap<String, String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            realm_id,
            alias: alias.into(),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_parsing() {
        assert_eq!("REQUIRED".parse::<Requirement>(), Ok(Requirement::Required));
        assert_eq!(
            "conditional".parse::<Requirement>(),
            Ok(Requirement::Conditional)
        );
        assert!("OPTIONAL".parse::<Requirement>().is_err());
        assert!(!Requirement::Disabled.is_enabled());
        assert_eq!(Requirement::Alternative.to_string(), "ALTERNATIVE");
    }

    #[test]
    fn flow_type_parsing() {
        assert_eq!("form-flow".parse::<FlowType>(), Ok(FlowType::FormFlow));
        let err = "weird-flow".parse::<FlowType>().unwrap_err();
        assert!(err.to_string().contains("weird-flow"));
        assert_eq!(FlowType::ClientFlow.as_str(), "client-flow");
    }

    #[test]
    fn nested_flow_creation() {
        let realm_id = Uuid::now_v7();
        let flow = AuthenticationFlow::new_nested(realm_id, "forms", FlowType::BasicFlow)
            .with_description("Username, password, otp");

        assert!(!flow.top_level);
        assert!(!flow.built_in);
        assert_eq!(flow.description.as_deref(), Some("Username, password, otp"));
    }

    #[test]
    fn execution_constructors() {
        let realm_id = Uuid::now_v7();
        let parent = Uuid::now_v7();
        let nested = Uuid::now_v7();

        let step =
            AuthenticationExecution::authenticator(realm_id, parent, "auth-cookie", Requirement::Alternative, 10);
        assert!(!step.authenticator_flow);
        assert!(step.flow_id.is_none());

        let sub = AuthenticationExecution::sub_flow(realm_id, parent, nested, Requirement::Disabled, 0)
            .with_authenticator("registration-page-form");
        assert!(sub.authenticator_flow);
        assert_eq!(sub.flow_id, Some(nested));
        assert_eq!(sub.authenticator.as_deref(), Some("registration-page-form"));
    }
}
