//! Authentication management DTOs for the Admin API.
//!
//! Field names follow the Keycloak admin REST representations, including
//! the historical `autheticatorFlow` spelling that clients still read.

use std::collections::HashMap;

use kc_auth::ProviderDescriptor;
use kc_model::{AuthenticationExecution, AuthenticationFlow, AuthenticatorConfig};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Flows
// ============================================================================

/// Flow representation with its direct executions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationFlowRepresentation {
    /// Flow ID.
    pub id: Uuid,
    /// Unique alias within the realm.
    pub alias: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Flow type (`basic-flow`, `form-flow`, `client-flow`).
    pub provider_id: String,
    /// Whether the flow can be bound to a realm entry point.
    pub top_level: bool,
    /// Whether the flow is protected from modification.
    pub built_in: bool,
    /// Direct executions in priority order.
    #[serde(default)]
    pub authentication_executions: Vec<AuthenticationExecutionExportRepresentation>,
}

impl AuthenticationFlowRepresentation {
    /// Builds the representation from a flow and its exported executions.
    #[must_use]
    pub fn new(
        flow: &AuthenticationFlow,
        authentication_executions: Vec<AuthenticationExecutionExportRepresentation>,
    ) -> Self {
        Self {
            id: flow.id,
            alias: flow.alias.clone(),
            description: flow.description.clone(),
            provider_id: flow.provider_id.to_string(),
            top_level: flow.top_level,
            built_in: flow.built_in,
            authentication_executions,
        }
    }
}

/// Execution as embedded in a flow representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationExecutionExportRepresentation {
    /// Alias of the attached authenticator config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_config: Option<String>,
    /// Authenticator provider id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator: Option<String>,
    /// Whether this execution runs a nested flow.
    pub authenticator_flow: bool,
    /// Legacy spelling of `authenticatorFlow`.
    #[serde(default)]
    pub autheticator_flow: bool,
    /// Requirement level.
    pub requirement: String,
    /// Ordering within the parent flow.
    pub priority: i32,
    /// Alias of the nested flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_alias: Option<String>,
    /// Whether the user may set up the checked credential.
    pub user_setup_allowed: bool,
}

impl AuthenticationExecutionExportRepresentation {
    /// Builds the export form of an execution.
    #[must_use]
    pub fn new(
        execution: &AuthenticationExecution,
        flow_alias: Option<String>,
        config_alias: Option<String>,
        user_setup_allowed: bool,
    ) -> Self {
        Self {
            authenticator_config: config_alias,
            authenticator: execution.authenticator.clone(),
            authenticator_flow: execution.authenticator_flow,
            autheticator_flow: execution.authenticator_flow,
            requirement: execution.requirement.to_string(),
            priority: execution.priority,
            flow_alias,
            user_setup_allowed,
        }
    }
}

/// Body of `POST /flows` and `PUT /flows/{id}`.
///
/// Every field is optional so the handler can answer a missing alias with
/// the status the admin API promises instead of a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowRequest {
    /// Alias.
    pub alias: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Flow type; defaults to `basic-flow`.
    pub provider_id: Option<String>,
    /// Whether the flow is top-level; defaults to `true`.
    pub top_level: Option<bool>,
}

/// Body of `POST /flows/{flowAlias}/copy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CopyFlowRequest {
    /// Alias of the copy.
    pub new_name: Option<String>,
}

// ============================================================================
// Executions
// ============================================================================

/// Flattened execution entry returned by `GET /flows/{flowAlias}/executions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationExecutionInfoRepresentation {
    /// Execution ID.
    pub id: Uuid,
    /// Requirement level.
    pub requirement: String,
    /// Provider display name, or the nested flow's alias.
    pub display_name: String,
    /// Alias of the attached config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Provider help text, or the nested flow's description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Requirement levels this execution may take.
    pub requirement_choices: Vec<String>,
    /// Whether a config may be attached.
    pub configurable: bool,
    /// Whether this execution runs a nested flow.
    pub authentication_flow: bool,
    /// Authenticator provider id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// ID of the attached config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_config: Option<Uuid>,
    /// ID of the nested flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<Uuid>,
    /// Nesting depth below the listed flow, starting at 0.
    pub level: u32,
    /// Position among its siblings, starting at 0.
    pub index: u32,
    /// Ordering within the parent flow.
    pub priority: i32,
}

/// Body of `PUT /flows/{flowAlias}/executions`.
///
/// Clients usually send back an entry of the executions listing; fields
/// the server does not update are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExecutionRequest {
    /// Execution ID.
    pub id: Uuid,
    /// New requirement level.
    #[serde(default)]
    pub requirement: Option<String>,
    /// New priority.
    #[serde(default)]
    pub priority: Option<i32>,
    /// New alias of the nested flow.
    #[serde(default)]
    pub display_name: Option<String>,
    /// New description of the nested flow.
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `POST /flows/{flowAlias}/executions/execution`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddExecutionRequest {
    /// Provider id of the authenticator to add.
    pub provider: Option<String>,
}

/// Body of `POST /flows/{flowAlias}/executions/flow`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddExecutionFlowRequest {
    /// Alias of the new nested flow.
    pub alias: Option<String>,
    /// Flow type; defaults to `basic-flow`.
    #[serde(rename = "type")]
    pub flow_type: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Provider id recorded on the wrapping execution (the form of a form flow).
    pub provider: Option<String>,
}

/// Single execution returned by `GET /executions/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationExecutionRepresentation {
    /// Execution ID.
    pub id: Uuid,
    /// Authenticator provider id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator: Option<String>,
    /// ID of the attached config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_config: Option<Uuid>,
    /// Whether this execution runs a nested flow.
    pub authenticator_flow: bool,
    /// Requirement level.
    pub requirement: String,
    /// Ordering within the parent flow.
    pub priority: i32,
    /// ID of the nested flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<Uuid>,
    /// ID of the parent flow.
    pub parent_flow: Uuid,
}

impl From<AuthenticationExecution> for AuthenticationExecutionRepresentation {
    fn from(execution: AuthenticationExecution) -> Self {
        Self {
            id: execution.id,
            authenticator: execution.authenticator,
            authenticator_config: execution.authenticator_config,
            authenticator_flow: execution.authenticator_flow,
            requirement: execution.requirement.to_string(),
            priority: execution.priority,
            flow_id: execution.flow_id,
            parent_flow: execution.parent_flow,
        }
    }
}

// ============================================================================
// Authenticator configs
// ============================================================================

/// Authenticator config representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorConfigRepresentation {
    /// Config ID.
    pub id: Uuid,
    /// Alias.
    pub alias: String,
    /// Key-value settings.
    pub config: HashMap<String, String>,
}

impl From<AuthenticatorConfig> for AuthenticatorConfigRepresentation {
    fn from(config: AuthenticatorConfig) -> Self {
        Self {
            id: config.id,
            alias: config.alias,
            config: config.config,
        }
    }
}

/// Body of config create and update requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRequest {
    /// Alias.
    pub alias: Option<String>,
    /// Key-value settings.
    pub config: HashMap<String, String>,
}

// ============================================================================
// Providers
// ============================================================================

/// Entry of the provider listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRepresentation {
    /// Provider id.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Help text.
    pub description: String,
}

impl From<ProviderDescriptor> for ProviderRepresentation {
    fn from(descriptor: ProviderDescriptor) -> Self {
        Self {
            id: descriptor.id.to_string(),
            display_name: descriptor.display_name.to_string(),
            description: descriptor.description.to_string(),
        }
    }
}
