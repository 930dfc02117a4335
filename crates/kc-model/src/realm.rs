//! Realm domain model.
//!
//! A realm is the top-level container for authentication flows.
//! Each realm is isolated and binds its own flows to the login,
//! registration, credential reset and client authentication entry points.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entry points a realm binds an authentication flow to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowBinding {
    /// Browser login.
    BrowserFlow,
    /// Self-registration.
    RegistrationFlow,
    /// Direct grant (resource owner password credentials).
    DirectGrantFlow,
    /// Credential reset.
    ResetCredentialsFlow,
    /// Client authentication.
    ClientAuthenticationFlow,
    /// Docker registry authentication.
    DockerAuthenticationFlow,
    /// First login through an identity provider.
    FirstBrokerLoginFlow,
}

impl FlowBinding {
    /// All bindings, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::BrowserFlow,
        Self::RegistrationFlow,
        Self::DirectGrantFlow,
        Self::ResetCredentialsFlow,
        Self::ClientAuthenticationFlow,
        Self::DockerAuthenticationFlow,
        Self::FirstBrokerLoginFlow,
    ];
}

/// A realm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Realm {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Unique realm name.
    pub name: String,
    /// Display name for UI.
    pub display_name: Option<String>,
    /// Whether the realm is enabled.
    pub enabled: bool,

    // === Timestamps ===
    /// When the realm was created.
    pub created_at: DateTime<Utc>,
    /// When the realm was last updated.
    pub updated_at: DateTime<Utc>,

    // === Authentication Flows ===
    /// Browser authentication flow ID.
    pub browser_flow: Option<Uuid>,
    /// Registration flow ID.
    pub registration_flow: Option<Uuid>,
    /// Direct grant (Resource Owner Password) flow ID.
    pub direct_grant_flow: Option<Uuid>,
    /// Reset credentials flow ID.
    pub reset_credentials_flow: Option<Uuid>,
    /// Client authentication flow ID.
    pub client_authentication_flow: Option<Uuid>,
    /// Docker authentication flow ID.
    pub docker_authentication_flow: Option<Uuid>,
    /// First broker login flow ID.
    pub first_broker_login_flow: Option<Uuid>,

    // === Custom Attributes ===
    /// Custom realm attributes.
    pub attributes: HashMap<String, String>,
}

impl Realm {
    /// Creates a new realm with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            display_name: None,
            enabled: true,
            created_at: now,
            updated_at: now,
            browser_flow: None,
            registration_flow: None,
            direct_grant_flow: None,
            reset_credentials_flow: None,
            client_authentication_flow: None,
            docker_authentication_flow: None,
            first_broker_login_flow: None,
            attributes: HashMap::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Checks if the realm is the master realm.
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.name == "master"
    }

    /// Returns the flow bound to an entry point.
    #[must_use]
    pub const fn binding(&self, binding: FlowBinding) -> Option<Uuid> {
        match binding {
            FlowBinding::BrowserFlow => self.browser_flow,
            FlowBinding::RegistrationFlow => self.registration_flow,
            FlowBinding::DirectGrantFlow => self.direct_grant_flow,
            FlowBinding::ResetCredentialsFlow => self.reset_credentials_flow,
            FlowBinding::ClientAuthenticationFlow => self.client_authentication_flow,
            FlowBinding::DockerAuthenticationFlow => self.docker_authentication_flow,
            FlowBinding::FirstBrokerLoginFlow => self.first_broker_login_flow,
        }
    }

    /// Binds a flow to an entry point.
    pub fn set_binding(&mut self, binding: FlowBinding, flow_id: Option<Uuid>) {
        let slot = match binding {
            FlowBinding::BrowserFlow => &mut self.browser_flow,
            FlowBinding::RegistrationFlow => &mut self.registration_flow,
            FlowBinding::DirectGrantFlow => &mut self.direct_grant_flow,
            FlowBinding::ResetCredentialsFlow => &mut self.reset_credentials_flow,
            FlowBinding::ClientAuthenticationFlow => &mut self.client_authentication_flow,
            FlowBinding::DockerAuthenticationFlow => &mut self.docker_authentication_flow,
            FlowBinding::FirstBrokerLoginFlow => &mut self.first_broker_login_flow,
        };
        *slot = flow_id;
    }

    /// Checks whether any entry point is bound to the given flow.
    #[must_use]
    pub fn binds_flow(&self, flow_id: Uuid) -> bool {
        FlowBinding::ALL
            .iter()
            .any(|b| self.binding(*b) == Some(flow_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_realm_has_defaults() {
        let realm = Realm::new("test");

        assert_eq!(realm.name, "test");
        assert!(realm.enabled);
        assert!(realm.browser_flow.is_none());
    }

    #[test]
    fn master_realm_detected() {
        assert!(Realm::new("master").is_master());
        assert!(!Realm::new("other").is_master());
    }

    #[test]
    fn bindings_round_trip() {
        let mut realm = Realm::new("myrealm").with_display_name("My Realm");
        let flow_id = Uuid::now_v7();

        assert!(!realm.binds_flow(flow_id));
        realm.set_binding(FlowBinding::DirectGrantFlow, Some(flow_id));
        assert_eq!(realm.direct_grant_flow, Some(flow_id));
        assert!(realm.binds_flow(flow_id));

        realm.set_binding(FlowBinding::DirectGrantFlow, None);
        assert!(!realm.binds_flow(flow_id));
        assert_eq!(realm.display_name, Some("My Realm".to_string()));
    }
}
