//! Built-in authentication flows every realm starts with.
//!
//! [`add_default_flows`] creates each default flow that the realm does not
//! have yet (matched by alias) and binds it to its entry point.

use std::collections::HashMap;

use kc_model::{
    AuthenticationExecution, AuthenticationFlow, AuthenticatorConfig, FlowBinding, FlowType,
    Realm, Requirement,
};
use kc_storage::AuthFlowProvider;
use uuid::Uuid;

use crate::error::AuthResult;

/// Alias of the browser login flow.
pub const BROWSER_FLOW: &str = "browser";
/// Alias of the direct grant flow.
pub const DIRECT_GRANT_FLOW: &str = "direct grant";
/// Alias of the registration flow.
pub const REGISTRATION_FLOW: &str = "registration";
/// Alias of the nested registration form flow.
pub const REGISTRATION_FORM_FLOW: &str = "registration form";
/// Alias of the credential reset flow.
pub const RESET_CREDENTIALS_FLOW: &str = "reset credentials";
/// Alias of the client authentication flow.
pub const CLIENT_AUTHENTICATION_FLOW: &str = "clients";
/// Alias of the docker authentication flow.
pub const DOCKER_AUTH_FLOW: &str = "docker auth";
/// Alias of the first broker login flow.
pub const FIRST_BROKER_LOGIN_FLOW: &str = "first broker login";

/// Creates the built-in flows of a realm and returns the realm with its
/// flow bindings set. Flows whose alias already exists are left alone.
///
/// The caller persists the returned realm.
///
/// ## Errors
///
/// Returns `AuthError::Storage` if a flow, execution or config cannot be stored.
pub async fn add_default_flows<S>(storage: &S, mut realm: Realm) -> AuthResult<Realm>
where
    S: AuthFlowProvider + ?Sized,
{
    let seeder = Seeder {
        storage,
        realm_id: realm.id,
    };

    let defaults: [(FlowBinding, &str); 7] = [
        (FlowBinding::BrowserFlow, BROWSER_FLOW),
        (FlowBinding::DirectGrantFlow, DIRECT_GRANT_FLOW),
        (FlowBinding::RegistrationFlow, REGISTRATION_FLOW),
        (FlowBinding::ResetCredentialsFlow, RESET_CREDENTIALS_FLOW),
        (FlowBinding::ClientAuthenticationFlow, CLIENT_AUTHENTICATION_FLOW),
        (FlowBinding::DockerAuthenticationFlow, DOCKER_AUTH_FLOW),
        (FlowBinding::FirstBrokerLoginFlow, FIRST_BROKER_LOGIN_FLOW),
    ];

    for (binding, alias) in defaults {
        let flow_id = match storage.get_flow_by_alias(realm.id, alias).await? {
            Some(existing) => existing.id,
            None => {
                let id = match binding {
                    FlowBinding::BrowserFlow => seeder.browser().await?,
                    FlowBinding::DirectGrantFlow => seeder.direct_grant().await?,
                    FlowBinding::RegistrationFlow => seeder.registration().await?,
                    FlowBinding::ResetCredentialsFlow => seeder.reset_credentials().await?,
                    FlowBinding::ClientAuthenticationFlow => seeder.clients().await?,
                    FlowBinding::DockerAuthenticationFlow => seeder.docker().await?,
                    FlowBinding::FirstBrokerLoginFlow => seeder.first_broker_login().await?,
                };
                tracing::debug!(realm = %realm.name, flow = alias, "default flow created");
                id
            }
        };
        if realm.binding(binding).is_none() {
            realm.set_binding(binding, Some(flow_id));
        }
    }

    Ok(realm)
}

struct Seeder<'a, S: ?Sized> {
    storage: &'a S,
    realm_id: Uuid,
}

impl<S> Seeder<'_, S>
where
    S: AuthFlowProvider + ?Sized,
{
    async fn top(&self, alias: &str, description: &str, flow_type: FlowType) -> AuthResult<Uuid> {
        let flow = AuthenticationFlow::new_top_level(self.realm_id, alias, flow_type)
            .with_description(description)
            .as_built_in();
        self.storage.create_flow(&flow).await?;
        Ok(flow.id)
    }

    async fn nested(
        &self,
        parent: Uuid,
        alias: &str,
        description: &str,
        requirement: Requirement,
        priority: i32,
    ) -> AuthResult<Uuid> {
        let flow = AuthenticationFlow::new_nested(self.realm_id, alias, FlowType::BasicFlow)
            .with_description(description)
            .as_built_in();
        self.storage.create_flow(&flow).await?;
        let execution =
            AuthenticationExecution::sub_flow(self.realm_id, parent, flow.id, requirement, priority);
        self.storage.create_execution(&execution).await?;
        Ok(flow.id)
    }

    async fn step(
        &self,
        parent: Uuid,
        provider: &str,
        requirement: Requirement,
        priority: i32,
    ) -> AuthResult<AuthenticationExecution> {
        let execution =
            AuthenticationExecution::authenticator(self.realm_id, parent, provider, requirement, priority);
        self.storage.create_execution(&execution).await?;
        Ok(execution)
    }

    async fn configured_step(
        &self,
        parent: Uuid,
        provider: &str,
        requirement: Requirement,
        priority: i32,
        config_alias: &str,
        settings: &[(&str, &str)],
    ) -> AuthResult<()> {
        let settings: HashMap<String, String> = settings
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let config = AuthenticatorConfig::new(self.realm_id, config_alias, settings);
        self.storage.create_config(&config).await?;

        let mut execution = self.step(parent, provider, requirement, priority).await?;
        execution.authenticator_config = Some(config.id);
        self.storage.update_execution(&execution).await?;
        Ok(())
    }

    async fn conditional_otp(
        &self,
        parent: Uuid,
        alias: &str,
        description: &str,
        priority: i32,
        otp: &str,
    ) -> AuthResult<()> {
        let flow = self
            .nested(parent, alias, description, Requirement::Conditional, priority)
            .await?;
        self.step(flow, "conditional-user-configured", Requirement::Required, 10)
            .await?;
        self.step(flow, otp, Requirement::Required, 20).await?;
        Ok(())
    }

    async fn browser(&self) -> AuthResult<Uuid> {
        let browser = self
            .top(BROWSER_FLOW, "browser based authentication", FlowType::BasicFlow)
            .await?;
        self.step(browser, "auth-cookie", Requirement::Alternative, 10).await?;
        self.step(browser, "auth-spnego", Requirement::Disabled, 20).await?;
        self.step(browser, "identity-provider-redirector", Requirement::Alternative, 25)
            .await?;

        let forms = self
            .nested(
                browser,
                "forms",
                "Username, password, otp and other auth forms.",
                Requirement::Alternative,
                30,
            )
            .await?;
        self.step(forms, "auth-username-password-form", Requirement::Required, 10)
            .await?;
        self.conditional_otp(
            forms,
            "Browser - Conditional OTP",
            "Flow to determine if the OTP is required for the authentication",
            20,
            "auth-otp-form",
        )
        .await?;
        Ok(browser)
    }

    async fn direct_grant(&self) -> AuthResult<Uuid> {
        let flow = self
            .top(
                DIRECT_GRANT_FLOW,
                "OpenID Connect Resource Owner Grant",
                FlowType::BasicFlow,
            )
            .await?;
        self.step(flow, "direct-grant-validate-username", Requirement::Required, 10)
            .await?;
        self.step(flow, "direct-grant-validate-password", Requirement::Required, 20)
            .await?;
        self.conditional_otp(
            flow,
            "Direct Grant - Conditional OTP",
            "Flow to determine if the OTP is required for the authentication",
            30,
            "direct-grant-validate-otp",
        )
        .await?;
        Ok(flow)
    }

    async fn registration(&self) -> AuthResult<Uuid> {
        let flow = self
            .top(REGISTRATION_FLOW, "registration flow", FlowType::BasicFlow)
            .await?;

        let form = AuthenticationFlow::new_nested(self.realm_id, REGISTRATION_FORM_FLOW, FlowType::FormFlow)
            .with_description("registration form")
            .as_built_in();
        self.storage.create_flow(&form).await?;
        let execution =
            AuthenticationExecution::sub_flow(self.realm_id, flow, form.id, Requirement::Required, 10)
                .with_authenticator("registration-page-form");
        self.storage.create_execution(&execution).await?;

        self.step(form.id, "registration-user-creation", Requirement::Required, 20)
            .await?;
        self.step(form.id, "registration-password-action", Requirement::Required, 50)
            .await?;
        self.step(form.id, "registration-recaptcha-action", Requirement::Disabled, 60)
            .await?;
        Ok(flow)
    }

    async fn reset_credentials(&self) -> AuthResult<Uuid> {
        let flow = self
            .top(
                RESET_CREDENTIALS_FLOW,
                "Reset credentials for a user if they forgot their password or something",
                FlowType::BasicFlow,
            )
            .await?;
        self.step(flow, "reset-credentials-choose-user", Requirement::Required, 10)
            .await?;
        self.step(flow, "reset-credential-email", Requirement::Required, 20)
            .await?;
        self.step(flow, "reset-password", Requirement::Required, 30).await?;
        self.conditional_otp(
            flow,
            "Reset - Conditional OTP",
            "Flow to determine if the OTP should be reset or not. Set to REQUIRED to force.",
            40,
            "reset-otp",
        )
        .await?;
        Ok(flow)
    }

    async fn clients(&self) -> AuthResult<Uuid> {
        let flow = self
            .top(
                CLIENT_AUTHENTICATION_FLOW,
                "Base authentication for clients",
                FlowType::ClientFlow,
            )
            .await?;
        for (provider, priority) in [
            ("client-secret", 10),
            ("client-jwt", 20),
            ("client-secret-jwt", 30),
            ("client-x509", 40),
        ] {
            self.step(flow, provider, Requirement::Alternative, priority)
                .await?;
        }
        Ok(flow)
    }

    async fn docker(&self) -> AuthResult<Uuid> {
        let flow = self
            .top(
                DOCKER_AUTH_FLOW,
                "Used by Docker clients to authenticate against the IDP",
                FlowType::BasicFlow,
            )
            .await?;
        self.step(flow, "docker-http-basic-authenticator", Requirement::Required, 10)
            .await?;
        Ok(flow)
    }

    async fn first_broker_login(&self) -> AuthResult<Uuid> {
        let flow = self
            .top(
                FIRST_BROKER_LOGIN_FLOW,
                "Actions taken after first broker login with identity provider account, which is not yet linked to any Keycloak account",
                FlowType::BasicFlow,
            )
            .await?;
        self.configured_step(
            flow,
            "idp-review-profile",
            Requirement::Required,
            10,
            "review profile config",
            &[("update.profile.on.first.login", "missing")],
        )
        .await?;

        let linking = self
            .nested(
                flow,
                "User creation or linking",
                "Flow for the existing/non-existing user alternatives",
                Requirement::Required,
                20,
            )
            .await?;
        self.configured_step(
            linking,
            "idp-create-user-if-unique",
            Requirement::Alternative,
            10,
            "create unique user config",
            &[("require.password.update.after.registration", "false")],
        )
        .await?;

        let existing = self
            .nested(
                linking,
                "Handle Existing Account",
                "Handle what to do if there is existing account with same email/username like authenticated identity provider",
                Requirement::Alternative,
                20,
            )
            .await?;
        self.step(existing, "idp-confirm-link", Requirement::Required, 10)
            .await?;

        let verification = self
            .nested(
                existing,
                "Account verification options",
                "Method with which to verity the existing account",
                Requirement::Required,
                20,
            )
            .await?;
        self.step(verification, "idp-email-verification", Requirement::Alternative, 10)
            .await?;

        let reauth = self
            .nested(
                verification,
                "Verify Existing Account by Re-authentication",
                "Reauthentication of existing account",
                Requirement::Alternative,
                20,
            )
            .await?;
        self.step(reauth, "idp-username-password-form", Requirement::Required, 10)
            .await?;
        self.conditional_otp(
            reauth,
            "First broker login - Conditional OTP",
            "Flow to determine if the OTP is required for the authentication",
            20,
            "auth-otp-form",
        )
        .await?;
        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_storage_memory::InMemoryStorage;

    #[tokio::test]
    async fn seeds_and_binds_all_flows() {
        let storage = InMemoryStorage::new();
        let realm = add_default_flows(&storage, Realm::new("demo")).await.unwrap();

        for binding in FlowBinding::ALL {
            let flow_id = realm.binding(binding).unwrap();
            let flow = storage.get_flow(realm.id, flow_id).await.unwrap().unwrap();
            assert!(flow.top_level);
            assert!(flow.built_in);
        }

        let top: Vec<String> = storage
            .list_top_level_flows(realm.id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.alias)
            .collect();
        assert_eq!(
            top,
            vec![
                "browser",
                "clients",
                "direct grant",
                "docker auth",
                "first broker login",
                "registration",
                "reset credentials"
            ]
        );
    }

    #[tokio::test]
    async fn browser_flow_shape() {
        let storage = InMemoryStorage::new();
        let realm = add_default_flows(&storage, Realm::new("demo")).await.unwrap();
        let browser = realm.browser_flow.unwrap();

        let steps = storage.list_executions(realm.id, browser).await.unwrap();
        let summary: Vec<(Option<&str>, Requirement, i32)> = steps
            .iter()
            .map(|e| (e.authenticator.as_deref(), e.requirement, e.priority))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some("auth-cookie"), Requirement::Alternative, 10),
                (Some("auth-spnego"), Requirement::Disabled, 20),
                (Some("identity-provider-redirector"), Requirement::Alternative, 25),
                (None, Requirement::Alternative, 30),
            ]
        );

        let forms = storage
            .get_flow_by_alias(realm.id, "forms")
            .await
            .unwrap()
            .unwrap();
        assert!(!forms.top_level);
        assert!(forms.built_in);
        assert_eq!(steps[3].flow_id, Some(forms.id));
    }

    #[tokio::test]
    async fn registration_form_is_a_form_flow() {
        let storage = InMemoryStorage::new();
        let realm = add_default_flows(&storage, Realm::new("demo")).await.unwrap();

        let form = storage
            .get_flow_by_alias(realm.id, REGISTRATION_FORM_FLOW)
            .await
            .unwrap()
            .unwrap();
        assert!(form.is_form_flow());

        let parent = storage
            .list_executions(realm.id, realm.registration_flow.unwrap())
            .await
            .unwrap();
        assert_eq!(parent[0].authenticator.as_deref(), Some("registration-page-form"));
        assert!(parent[0].authenticator_flow);
    }

    #[tokio::test]
    async fn first_broker_login_has_configs() {
        let storage = InMemoryStorage::new();
        let realm = add_default_flows(&storage, Realm::new("demo")).await.unwrap();

        let configs = storage.list_configs(realm.id).await.unwrap();
        let aliases: Vec<&str> = configs.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(aliases, vec!["create unique user config", "review profile config"]);
    }

    #[tokio::test]
    async fn seeding_twice_is_a_no_op() {
        let storage = InMemoryStorage::new();
        let realm = add_default_flows(&storage, Realm::new("demo")).await.unwrap();
        let before = storage.list_flows(realm.id).await.unwrap().len();

        let again = add_default_flows(&storage, realm.clone()).await.unwrap();

        assert_eq!(storage.list_flows(realm.id).await.unwrap().len(), before);
        assert_eq!(again.browser_flow, realm.browser_flow);
    }
}
