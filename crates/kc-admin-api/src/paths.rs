//! Admin resource paths.
//!
//! Every admin event records the path of the resource it touched, relative
//! to the realm's admin root (`/admin/realms/{realm}`). These builders
//! produce exactly those paths, so handlers and tests agree on them.
//! Path segments are percent-encoded; a flow alias such as
//! `Copy of browser` becomes `Copy%20of%20browser`.
//!
//! The role, role-mapping and group builders name resources this server
//! does not host. They exist so events forwarded to or merged with a full
//! admin event stream use the same path layout.

use std::fmt::Display;

use uuid::Uuid;

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Joins the realm admin root with a realm-relative path.
#[must_use]
pub fn admin_location(realm: &str, path: impl Display) -> String {
    format!("/admin/realms/{}/{path}", segment(realm))
}

// === Authentication management ===

/// `authentication/flows`
#[must_use]
pub fn auth_flows() -> String {
    "authentication/flows".to_string()
}

/// `authentication/flows/{id}`
#[must_use]
pub fn auth_flow(id: Uuid) -> String {
    format!("authentication/flows/{id}")
}

/// `authentication/flows/{alias}/copy`
#[must_use]
pub fn auth_copy_flow(alias: &str) -> String {
    format!("authentication/flows/{}/copy", segment(alias))
}

/// `authentication/flows/{alias}/executions`
#[must_use]
pub fn auth_flow_executions(alias: &str) -> String {
    format!("authentication/flows/{}/executions", segment(alias))
}

/// `authentication/flows/{alias}/executions/execution`
#[must_use]
pub fn auth_add_execution(alias: &str) -> String {
    format!("{}/execution", auth_flow_executions(alias))
}

/// `authentication/flows/{alias}/executions/flow`
#[must_use]
pub fn auth_add_execution_flow(alias: &str) -> String {
    format!("{}/flow", auth_flow_executions(alias))
}

/// `authentication/executions/{id}`
#[must_use]
pub fn auth_execution(id: Uuid) -> String {
    format!("authentication/executions/{id}")
}

/// `authentication/executions/{id}/raise-priority`
#[must_use]
pub fn auth_raise_execution(id: Uuid) -> String {
    format!("{}/raise-priority", auth_execution(id))
}

/// `authentication/executions/{id}/lower-priority`
#[must_use]
pub fn auth_lower_execution(id: Uuid) -> String {
    format!("{}/lower-priority", auth_execution(id))
}

/// `authentication/executions/{id}/config`
#[must_use]
pub fn auth_execution_config(id: Uuid) -> String {
    format!("{}/config", auth_execution(id))
}

/// `authentication/config/{id}`
#[must_use]
pub fn auth_config(id: Uuid) -> String {
    format!("authentication/config/{id}")
}

// === Resources hosted elsewhere (audit paths only) ===

/// `roles/{role-name}`
#[must_use]
pub fn role(name: &str) -> String {
    format!("roles/{}", segment(name))
}

/// `users/{id}/role-mappings/realm`
#[must_use]
pub fn user_realm_role_mapping(user_id: Uuid) -> String {
    format!("users/{user_id}/role-mappings/realm")
}

/// `groups/{id}/children`
#[must_use]
pub fn group_children(group_id: Uuid) -> String {
    format!("groups/{group_id}/children")
}
