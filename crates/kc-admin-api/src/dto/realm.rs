//! Realm DTOs for the Admin API.

use std::collections::HashMap;

use kc_model::{AuthenticationFlow, FlowBinding, Realm};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create a new realm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRealmRequest {
    /// Realm name (unique identifier).
    pub realm: String,
    /// Display name for UI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the realm is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl CreateRealmRequest {
    /// Converts this request to a domain `Realm` model without flow bindings.
    #[must_use]
    pub fn into_realm(self) -> Realm {
        let mut realm = Realm::new(self.realm);
        realm.display_name = self.display_name;
        realm.enabled = self.enabled;
        realm
    }
}

/// Request to update a realm.
///
/// Flow bindings name top-level flows by alias.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRealmRequest {
    /// Display name for UI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the realm is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Browser login flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_flow: Option<String>,
    /// Self-registration flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_flow: Option<String>,
    /// Direct grant flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_grant_flow: Option<String>,
    /// Reset credentials flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_credentials_flow: Option<String>,
    /// Client authentication flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_authentication_flow: Option<String>,
    /// Docker authentication flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_authentication_flow: Option<String>,
    /// First broker login flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_broker_login_flow: Option<String>,
}

impl UpdateRealmRequest {
    /// Returns the bindings this request changes, with the requested alias.
    #[must_use]
    pub fn bindings(&self) -> Vec<(FlowBinding, &str)> {
        FlowBinding::ALL
            .into_iter()
            .filter_map(|binding| self.binding(binding).map(|alias| (binding, alias)))
            .collect()
    }

    fn binding(&self, binding: FlowBinding) -> Option<&str> {
        let alias = match binding {
            FlowBinding::BrowserFlow => &self.browser_flow,
            FlowBinding::RegistrationFlow => &self.registration_flow,
            FlowBinding::DirectGrantFlow => &self.direct_grant_flow,
            FlowBinding::ResetCredentialsFlow => &self.reset_credentials_flow,
            FlowBinding::ClientAuthenticationFlow => &self.client_authentication_flow,
            FlowBinding::DockerAuthenticationFlow => &self.docker_authentication_flow,
            FlowBinding::FirstBrokerLoginFlow => &self.first_broker_login_flow,
        };
        alias.as_deref()
    }

    /// Applies the plain attributes of this update. Bindings are resolved
    /// by the caller.
    pub fn apply_to(&self, realm: &mut Realm) {
        if let Some(ref v) = self.display_name {
            realm.display_name = Some(v.clone());
        }
        if let Some(v) = self.enabled {
            realm.enabled = v;
        }
    }
}

/// Full realm representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmRepresentation {
    /// Realm ID.
    pub id: Uuid,
    /// Realm name.
    pub realm: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the realm is enabled.
    pub enabled: bool,
    /// Creation time in milliseconds since the epoch.
    pub created_timestamp: i64,
    /// Browser login flow alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_flow: Option<String>,
    /// Self-registration flow alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_flow: Option<String>,
    /// Direct grant flow alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_grant_flow: Option<String>,
    /// Reset credentials flow alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_credentials_flow: Option<String>,
    /// Client authentication flow alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_authentication_flow: Option<String>,
    /// Docker authentication flow alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_authentication_flow: Option<String>,
    /// First broker login flow alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_broker_login_flow: Option<String>,
}

impl RealmRepresentation {
    /// Builds the representation, resolving bound flow ids to aliases.
    #[must_use]
    pub fn new(realm: &Realm, flows: &[AuthenticationFlow]) -> Self {
        let aliases: HashMap<Uuid, &str> = flows.iter().map(|f| (f.id, f.alias.as_str())).collect();
        let alias_of = |binding| {
            realm
                .binding(binding)
                .and_then(|id| aliases.get(&id))
                .map(|alias| (*alias).to_string())
        };

        Self {
            id: realm.id,
            realm: realm.name.clone(),
            display_name: realm.display_name.clone(),
            enabled: realm.enabled,
            created_timestamp: realm.created_at.timestamp_millis(),
            browser_flow: alias_of(FlowBinding::BrowserFlow),
            registration_flow: alias_of(FlowBinding::RegistrationFlow),
            direct_grant_flow: alias_of(FlowBinding::DirectGrantFlow),
            reset_credentials_flow: alias_of(FlowBinding::ResetCredentialsFlow),
            client_authentication_flow: alias_of(FlowBinding::ClientAuthenticationFlow),
            docker_authentication_flow: alias_of(FlowBinding::DockerAuthenticationFlow),
            first_broker_login_flow: alias_of(FlowBinding::FirstBrokerLoginFlow),
        }
    }
}

/// Summary realm representation for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmSummary {
    /// Realm ID.
    pub id: Uuid,
    /// Realm name.
    pub realm: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the realm is enabled.
    pub enabled: bool,
}

impl From<Realm> for RealmSummary {
    fn from(realm: Realm) -> Self {
        Self {
            id: realm.id,
            realm: realm.name,
            display_name: realm.display_name,
            enabled: realm.enabled,
        }
    }
}
