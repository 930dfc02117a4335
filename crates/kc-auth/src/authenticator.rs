//! Authenticator trait and registry.
//!
//! Authenticators are pluggable components that perform specific
//! authentication steps (cookie check, username/password form, OTP, etc.).
//! Conditional authenticators additionally decide whether the conditional
//! sub-flow they sit in should run at all.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::builtin::{AllowAccessAuthenticator, DenyAccessAuthenticator, UserConfiguredCondition};
use crate::error::AuthResult;

/// Result of an authenticator execution.
#[derive(Debug, Clone)]
pub enum AuthenticatorResult {
    /// Authentication succeeded for this step.
    Success,
    /// Authentication failed.
    Failed {
        /// Error message.
        message: String,
    },
    /// User needs to provide additional input.
    Challenge {
        /// Challenge type.
        challenge_type: String,
        /// Additional data for the challenge.
        data: Option<serde_json::Value>,
    },
    /// Skip this authenticator (not applicable).
    Skip,
    /// Flow should be restarted.
    FlowReset,
}

impl AuthenticatorResult {
    /// Creates a success result.
    #[must_use]
    pub const fn success() -> Self {
        Self::Success
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates a challenge result.
    #[must_use]
    pub fn challenge(challenge_type: impl Into<String>) -> Self {
        Self::Challenge {
            challenge_type: challenge_type.into(),
            data: None,
        }
    }

    /// Creates a challenge result with data.
    #[must_use]
    pub fn challenge_with_data(challenge_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Challenge {
            challenge_type: challenge_type.into(),
            data: Some(data),
        }
    }

    /// Creates a skip result.
    #[must_use]
    pub const fn skip() -> Self {
        Self::Skip
    }

    /// Creates a flow reset result.
    #[must_use]
    pub const fn flow_reset() -> Self {
        Self::FlowReset
    }

    /// Checks if this is a success result.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Checks if this is a failed result.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Checks if this is a challenge result.
    #[must_use]
    pub const fn is_challenge(&self) -> bool {
        matches!(self, Self::Challenge { .. })
    }
}

/// Processing status of a single execution within an authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Completed successfully.
    Success,
    /// Failed.
    Failed,
    /// Waiting for the user to answer a challenge.
    Challenged,
    /// Tried as an alternative without success.
    Attempted,
    /// Not applicable or conditionally disabled.
    Skipped,
    /// Condition evaluated to true.
    EvaluatedTrue,
    /// Condition evaluated to false.
    EvaluatedFalse,
}

impl ExecutionStatus {
    /// Checks whether the execution needs no further processing.
    #[must_use]
    pub const fn is_processed(self) -> bool {
        matches!(self, Self::Success | Self::Attempted | Self::Skipped)
    }
}

/// Authentication context passed to authenticators.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Realm ID.
    pub realm_id: Uuid,
    /// Client ID (if the login was started by a client).
    pub client_id: Option<Uuid>,
    /// User ID (if known).
    pub user_id: Option<Uuid>,
    /// Session ID.
    pub session_id: Uuid,
    /// Current execution ID.
    pub execution_id: Option<Uuid>,
    /// Form data from the request.
    pub form_data: HashMap<String, String>,
    /// Session notes.
    pub notes: HashMap<String, String>,
    /// Status of every execution processed so far.
    pub execution_status: HashMap<Uuid, ExecutionStatus>,
}

impl AuthContext {
    /// Creates a new authentication context.
    #[must_use]
    pub fn new(realm_id: Uuid, session_id: Uuid) -> Self {
        Self {
            realm_id,
            client_id: None,
            user_id: None,
            session_id,
            execution_id: None,
            form_data: HashMap::new(),
            notes: HashMap::new(),
            execution_status: HashMap::new(),
        }
    }

    /// Sets the client ID.
    #[must_use]
    pub const fn with_client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Sets the user ID.
    #[must_use]
    pub const fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Adds a form value.
    #[must_use]
    pub fn with_form_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_data.insert(key.into(), value.into());
        self
    }

    /// Gets a form value.
    #[must_use]
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form_data.get(key).map(String::as_str)
    }

    /// Gets a note value.
    #[must_use]
    pub fn note(&self, key: &str) -> Option<&str> {
        self.notes.get(key).map(String::as_str)
    }

    /// Sets a note value.
    pub fn set_note(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.notes.insert(key.into(), value.into());
    }

    /// Gets the recorded status of an execution.
    #[must_use]
    pub fn status(&self, execution_id: Uuid) -> Option<ExecutionStatus> {
        self.execution_status.get(&execution_id).copied()
    }

    /// Records the status of an execution.
    pub fn set_status(&mut self, execution_id: Uuid, status: ExecutionStatus) {
        self.execution_status.insert(execution_id, status);
    }

    /// Forgets every recorded execution status.
    pub fn clear_status(&mut self) {
        self.execution_status.clear();
    }
}

/// Authenticator trait.
///
/// Authenticators are executed during authentication flows to verify
/// user identity using various methods.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the authenticator ID.
    fn id(&self) -> &'static str;

    /// Returns the display name.
    fn display_name(&self) -> &'static str;

    /// Checks if this authenticator requires a user to be set.
    fn requires_user(&self) -> bool {
        true
    }

    /// Checks if this authenticator is a condition evaluator.
    fn is_conditional(&self) -> bool {
        false
    }

    /// Evaluates the condition guarding a conditional sub-flow.
    ///
    /// Only called when [`Authenticator::is_conditional`] returns `true`.
    async fn matches_condition(&self, _context: &AuthContext) -> AuthResult<bool> {
        Ok(false)
    }

    /// Authenticates the user.
    ///
    /// Called when the authenticator is first executed.
    async fn authenticate(&self, context: &mut AuthContext) -> AuthResult<AuthenticatorResult>;

    /// Handles a challenge response.
    ///
    /// Called when the user responds to a challenge.
    async fn action(&self, context: &mut AuthContext) -> AuthResult<AuthenticatorResult> {
        self.authenticate(context).await
    }
}

/// Runtime authenticators keyed by provider id.
#[derive(Default)]
pub struct AuthenticatorRegistry {
    authenticators: DashMap<&'static str, Arc<dyn Authenticator>>,
}

impl AuthenticatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in runtime authenticators.
    #[must_use]
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(AllowAccessAuthenticator);
        registry.register(DenyAccessAuthenticator);
        registry.register(UserConfiguredCondition);
        registry
    }

    /// Registers an authenticator, replacing any previous one with the same id.
    pub fn register(&self, authenticator: impl Authenticator + 'static) {
        let authenticator: Arc<dyn Authenticator> = Arc::new(authenticator);
        self.authenticators.insert(authenticator.id(), authenticator);
    }

    /// Gets an authenticator by provider id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Authenticator>> {
        self.authenticators.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Checks if an authenticator is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.authenticators.contains_key(id)
    }

    /// Returns the number of registered authenticators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.authenticators.len()
    }

    /// Checks if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }
}

impl std::fmt::Debug for AuthenticatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&'static str> = self.authenticators.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        f.debug_struct("AuthenticatorRegistry")
            .field("authenticators", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticator_result_success() {
        let result = AuthenticatorResult::success();
        assert!(result.is_success());
        assert!(!result.is_failed());
    }

    #[test]
    fn authenticator_result_failed() {
        let result = AuthenticatorResult::failed("bad password");
        assert!(result.is_failed());
        assert!(!result.is_success());
    }

    #[test]
    fn authenticator_result_challenge() {
        let result = AuthenticatorResult::challenge("otp");
        assert!(result.is_challenge());
    }

    #[test]
    fn auth_context_notes() {
        let mut context = AuthContext::new(Uuid::now_v7(), Uuid::now_v7());

        context.set_note("key", "value");
        assert_eq!(context.note("key"), Some("value"));
        assert_eq!(context.note("missing"), None);
    }

    #[test]
    fn auth_context_status() {
        let exec = Uuid::now_v7();
        let mut context = AuthContext::new(Uuid::now_v7(), Uuid::now_v7())
            .with_form_value("username", "alice");

        assert_eq!(context.form_value("username"), Some("alice"));
        assert_eq!(context.status(exec), None);

        context.set_status(exec, ExecutionStatus::Attempted);
        assert!(context.status(exec).is_some_and(ExecutionStatus::is_processed));

        context.clear_status();
        assert_eq!(context.status(exec), None);
    }

    #[test]
    fn builtin_registry() {
        let registry = AuthenticatorRegistry::with_builtin();

        assert_eq!(registry.len(), 3);
        assert!(registry.contains("allow-access-authenticator"));
        assert!(registry.contains("deny-access-authenticator"));
        assert!(registry
            .get("conditional-user-configured")
            .is_some_and(|a| a.is_conditional()));
        assert!(registry.get("auth-magic").is_none());
    }
}
