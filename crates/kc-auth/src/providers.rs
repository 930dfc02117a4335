//! Provider descriptors for the admin API.
//!
//! Descriptors carry the static metadata the admin API needs about each
//! authenticator provider: which kind of flow it may be added to, which
//! requirement levels it supports and whether it takes a config.

use dashmap::DashMap;
use kc_model::{FlowType, Requirement};
use serde::Serialize;

/// Requirement choices of a regular authenticator.
pub const AUTHENTICATOR_CHOICES: &[Requirement] = &[
    Requirement::Required,
    Requirement::Alternative,
    Requirement::Disabled,
];

/// Requirement choices of providers that must run when enabled.
pub const REQUIRED_OR_DISABLED: &[Requirement] = &[Requirement::Required, Requirement::Disabled];

const REQUIRED_ONLY: &[Requirement] = &[Requirement::Required];

const CLIENT_CHOICES: &[Requirement] = &[Requirement::Alternative, Requirement::Disabled];

/// Requirement choices of a nested basic flow.
pub const BASIC_FLOW_CHOICES: &[Requirement] = &[
    Requirement::Required,
    Requirement::Alternative,
    Requirement::Disabled,
    Requirement::Conditional,
];

/// Returns the requirement choices of an execution running a nested flow.
#[must_use]
pub const fn flow_requirement_choices(flow_type: FlowType) -> &'static [Requirement] {
    match flow_type {
        FlowType::BasicFlow => BASIC_FLOW_CHOICES,
        FlowType::FormFlow => REQUIRED_OR_DISABLED,
        FlowType::ClientFlow => AUTHENTICATOR_CHOICES,
    }
}

/// Kind of provider, deciding which flows it may be added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Step of a basic flow.
    Authenticator,
    /// Renders the page of a form flow.
    FormAuthenticator,
    /// Step of a form flow.
    FormAction,
    /// Step of a client flow.
    ClientAuthenticator,
}

impl ProviderKind {
    /// Returns the provider kind whose members may be added to a flow of this type.
    #[must_use]
    pub const fn for_flow(flow_type: FlowType) -> Self {
        match flow_type {
            FlowType::BasicFlow => Self::Authenticator,
            FlowType::FormFlow => Self::FormAction,
            FlowType::ClientFlow => Self::ClientAuthenticator,
        }
    }
}

/// Static metadata about an authenticator provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// Provider id.
    pub id: &'static str,
    /// Human-readable name.
    pub display_name: &'static str,
    /// Help text.
    pub description: &'static str,
    /// Provider kind.
    pub kind: ProviderKind,
    /// Requirement levels an execution of this provider may take.
    pub requirement_choices: &'static [Requirement],
    /// Whether executions of this provider accept an authenticator config.
    pub configurable: bool,
    /// Whether the user can set up the credential this provider checks.
    pub user_setup_allowed: bool,
    /// Whether this provider is a condition evaluator.
    pub conditional: bool,
}

impl ProviderDescriptor {
    /// Creates a descriptor with the default choices for its kind.
    #[must_use]
    pub const fn new(id: &'static str, display_name: &'static str, kind: ProviderKind) -> Self {
        let requirement_choices = match kind {
            ProviderKind::Authenticator => AUTHENTICATOR_CHOICES,
            ProviderKind::FormAuthenticator | ProviderKind::FormAction => REQUIRED_OR_DISABLED,
            ProviderKind::ClientAuthenticator => CLIENT_CHOICES,
        };
        Self {
            id,
            display_name,
            description: "",
            kind,
            requirement_choices,
            configurable: false,
            user_setup_allowed: false,
            conditional: false,
        }
    }

    /// Sets the help text.
    #[must_use]
    pub const fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the requirement choices.
    #[must_use]
    pub const fn choices(mut self, choices: &'static [Requirement]) -> Self {
        self.requirement_choices = choices;
        self
    }

    /// Marks the provider as configurable.
    #[must_use]
    pub const fn configurable(mut self) -> Self {
        self.configurable = true;
        self
    }

    /// Marks the provider as allowing user setup.
    #[must_use]
    pub const fn user_setup_allowed(mut self) -> Self {
        self.user_setup_allowed = true;
        self
    }

    /// Marks the provider as a condition evaluator.
    #[must_use]
    pub const fn conditional(mut self) -> Self {
        self.conditional = true;
        self.requirement_choices = REQUIRED_OR_DISABLED;
        self
    }

    /// Checks whether a requirement level is allowed for this provider.
    #[must_use]
    pub fn allows(&self, requirement: Requirement) -> bool {
        self.requirement_choices.contains(&requirement)
    }
}

/// Registry of provider descriptors.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: DashMap<&'static str, ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in provider.
    #[must_use]
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        for descriptor in builtin_descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    /// Registers a descriptor, replacing any previous one with the same id.
    pub fn register(&self, descriptor: ProviderDescriptor) {
        self.providers.insert(descriptor.id, descriptor);
    }

    /// Gets a descriptor by provider id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ProviderDescriptor> {
        self.providers.get(id).map(|entry| entry.value().clone())
    }

    /// Checks if a provider is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// Lists the descriptors of one kind, sorted by id.
    #[must_use]
    pub fn list(&self, kind: ProviderKind) -> Vec<ProviderDescriptor> {
        let mut descriptors: Vec<ProviderDescriptor> = self
            .providers
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.value().clone())
            .collect();
        descriptors.sort_by(|a, b| a.id.cmp(b.id));
        descriptors
    }
}

fn builtin_descriptors() -> Vec<ProviderDescriptor> {
    use ProviderKind::{Authenticator, ClientAuthenticator, FormAction, FormAuthenticator};

    vec![
        // Browser
        ProviderDescriptor::new("auth-cookie", "Cookie", Authenticator)
            .description("Validates the SSO cookie set by the auth server."),
        ProviderDescriptor::new("auth-spnego", "Kerberos", Authenticator)
            .description("Initiates the SPNEGO protocol.")
            .choices(&[Requirement::Disabled, Requirement::Alternative, Requirement::Required]),
        ProviderDescriptor::new(
            "identity-provider-redirector",
            "Identity Provider Redirector",
            Authenticator,
        )
        .description("Redirects to default Identity Provider or Identity Provider specified with kc_idp_hint query parameter")
        .configurable(),
        ProviderDescriptor::new("auth-username-password-form", "Username Password Form", Authenticator)
            .description("Validates a username and password from login form.")
            .choices(REQUIRED_ONLY),
        ProviderDescriptor::new("auth-otp-form", "OTP Form", Authenticator)
            .description("Validates a OTP on a separate OTP form.")
            .user_setup_allowed(),
        ProviderDescriptor::new("conditional-user-configured", "Condition - user configured", Authenticator)
            .description("Executes the current flow only if authenticators are configured")
            .conditional(),
        // Direct grant
        ProviderDescriptor::new("direct-grant-validate-username", "Username Validation", Authenticator)
            .description("Validates the username supplied as a 'username' form parameter in direct grant request")
            .choices(REQUIRED_ONLY),
        ProviderDescriptor::new("direct-grant-validate-password", "Password", Authenticator)
            .description("Validates the password supplied as a 'password' form parameter in direct grant request")
            .choices(REQUIRED_OR_DISABLED),
        ProviderDescriptor::new("direct-grant-validate-otp", "OTP", Authenticator)
            .description("Validates the one time password supplied as a 'totp' form parameter in direct grant request"),
        // Reset credentials
        ProviderDescriptor::new("reset-credentials-choose-user", "Choose User", Authenticator)
            .description("Choose a user to reset credentials for")
            .choices(REQUIRED_ONLY),
        ProviderDescriptor::new("reset-credential-email", "Send Reset Email", Authenticator)
            .description("Send email to user and wait for response.")
            .choices(REQUIRED_OR_DISABLED),
        ProviderDescriptor::new("reset-password", "Reset Password", Authenticator)
            .description("Sets the Update Password required action if execution is REQUIRED.")
            .choices(REQUIRED_OR_DISABLED),
        ProviderDescriptor::new("reset-otp", "Reset OTP", Authenticator)
            .description("Removes existing OTP configurations (if chosen) and sets the 'Configure OTP' required action.")
            .choices(REQUIRED_OR_DISABLED)
            .configurable(),
        // Docker
        ProviderDescriptor::new("docker-http-basic-authenticator", "Docker Authenticator", Authenticator)
            .description("Uses HTTP Basic authentication to validate docker users, returning a docker error token on auth failure")
            .choices(REQUIRED_ONLY),
        // First broker login
        ProviderDescriptor::new("idp-review-profile", "Review Profile", Authenticator)
            .description("User reviews and updates profile data retrieved from Identity Provider in the displayed form")
            .configurable(),
        ProviderDescriptor::new("idp-create-user-if-unique", "Create User If Unique", Authenticator)
            .description("Detect if there is existing account with same email or username as the identity provider account. If not, create new user")
            .configurable(),
        ProviderDescriptor::new("idp-confirm-link", "Confirm link existing account", Authenticator)
            .description("Show the form where user confirms if he wants to link identity provider with existing account or rather edit user profile data retrieved from identity provider to avoid conflict"),
        ProviderDescriptor::new("idp-email-verification", "Verify existing account by Email", Authenticator)
            .description("Email verification of existing user, who wants to link his user account with identity provider"),
        ProviderDescriptor::new(
            "idp-username-password-form",
            "Username Password Form for identity provider reauthentication",
            Authenticator,
        )
        .description("Validates a password from login form. Username may be already known from identity provider authentication")
        .choices(REQUIRED_ONLY),
        // Access control
        ProviderDescriptor::new("allow-access-authenticator", "Allow access", Authenticator)
            .description("Authenticator will always successfully authenticate. Useful for example in the conditional flows to be used after satisfying the previous conditions")
            .choices(REQUIRED_OR_DISABLED),
        ProviderDescriptor::new("deny-access-authenticator", "Deny access", Authenticator)
            .description("Access will be always denied. Useful for example in the conditional flows to be used after satisfying the previous conditions")
            .choices(REQUIRED_OR_DISABLED)
            .configurable(),
        // Registration
        ProviderDescriptor::new("registration-page-form", "Registration Page", FormAuthenticator)
            .description("This is the controller for the registration page"),
        ProviderDescriptor::new("registration-user-creation", "Registration User Profile Creation", FormAction)
            .description("This action must always be first! Validates the username and user profile of the user in validation phase.  In success phase, this will create the user in the database including his user profile."),
        ProviderDescriptor::new("registration-password-action", "Password Validation", FormAction)
            .description("Validates that password matches password confirmation field.  It also will store password in user's credential store."),
        ProviderDescriptor::new("registration-recaptcha-action", "reCAPTCHA", FormAction)
            .description("Adds Google reCAPTCHA button.  reCAPTCHAs verify that the entity that is registering is a human.  This can only be used on the internet and must be configured after you add it.")
            .configurable(),
        // Clients
        ProviderDescriptor::new("client-secret", "Client Id and Secret", ClientAuthenticator)
            .description("Validates client based on 'client_id' and 'client_secret' sent either in request parameters or in 'Authorization: Basic' header"),
        ProviderDescriptor::new("client-jwt", "Signed Jwt", ClientAuthenticator)
            .description("Validates client based on signed JWT issued by client and signed with the Client private key"),
        ProviderDescriptor::new("client-secret-jwt", "Signed Jwt with Client Secret", ClientAuthenticator)
            .description("Validates client based on signed JWT issued by client and signed with the Client Secret"),
        ProviderDescriptor::new("client-x509", "X509 Certificate", ClientAuthenticator)
            .description("Validates client based on a X509 Certificate"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_lists_by_kind() {
        let registry = ProviderRegistry::with_builtin();

        let clients = registry.list(ProviderKind::ClientAuthenticator);
        let ids: Vec<&str> = clients.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["client-jwt", "client-secret", "client-secret-jwt", "client-x509"]);

        let forms = registry.list(ProviderKind::FormAuthenticator);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].id, "registration-page-form");
    }

    #[test]
    fn authenticator_listing_is_sorted() {
        let registry = ProviderRegistry::with_builtin();
        let ids: Vec<&str> = registry
            .list(ProviderKind::Authenticator)
            .iter()
            .map(|d| d.id)
            .collect();

        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert!(ids.contains(&"auth-otp-form"));
    }

    #[test]
    fn conditional_providers_are_required_or_disabled() {
        let registry = ProviderRegistry::with_builtin();
        let condition = registry.get("conditional-user-configured").unwrap();

        assert!(condition.conditional);
        assert!(condition.allows(Requirement::Required));
        assert!(!condition.allows(Requirement::Alternative));
    }

    #[test]
    fn flow_choices_depend_on_type() {
        assert!(flow_requirement_choices(FlowType::BasicFlow).contains(&Requirement::Conditional));
        assert_eq!(flow_requirement_choices(FlowType::FormFlow), REQUIRED_OR_DISABLED);
        assert_eq!(ProviderKind::for_flow(FlowType::FormFlow), ProviderKind::FormAction);
    }

    #[test]
    fn custom_registration_replaces() {
        let registry = ProviderRegistry::new();
        registry.register(ProviderDescriptor::new("custom", "Custom", ProviderKind::Authenticator));
        registry.register(
            ProviderDescriptor::new("custom", "Custom v2", ProviderKind::Authenticator).configurable(),
        );

        let descriptor = registry.get("custom").unwrap();
        assert_eq!(descriptor.display_name, "Custom v2");
        assert!(descriptor.configurable);
        assert!(!registry.contains("other"));
    }
}
