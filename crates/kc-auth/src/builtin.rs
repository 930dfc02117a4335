//! Built-in runtime authenticators.

use async_trait::async_trait;

use crate::authenticator::{AuthContext, Authenticator, AuthenticatorResult};
use crate::error::AuthResult;

/// Always grants access.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAccessAuthenticator;

#[async_trait]
impl Authenticator for AllowAccessAuthenticator {
    fn id(&self) -> &'static str {
        "allow-access-authenticator"
    }

    fn display_name(&self) -> &'static str {
        "Allow access"
    }

    fn requires_user(&self) -> bool {
        false
    }

    async fn authenticate(&self, _context: &mut AuthContext) -> AuthResult<AuthenticatorResult> {
        Ok(AuthenticatorResult::success())
    }
}

/// Always denies access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAccessAuthenticator;

#[async_trait]
impl Authenticator for DenyAccessAuthenticator {
    fn id(&self) -> &'static str {
        "deny-access-authenticator"
    }

    fn display_name(&self) -> &'static str {
        "Deny access"
    }

    fn requires_user(&self) -> bool {
        false
    }

    async fn authenticate(&self, _context: &mut AuthContext) -> AuthResult<AuthenticatorResult> {
        Ok(AuthenticatorResult::failed("access denied"))
    }
}

/// Condition matching once a user has been identified in the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserConfiguredCondition;

#[async_trait]
impl Authenticator for UserConfiguredCondition {
    fn id(&self) -> &'static str {
        "conditional-user-configured"
    }

    fn display_name(&self) -> &'static str {
        "Condition - user configured"
    }

    fn requires_user(&self) -> bool {
        false
    }

    fn is_conditional(&self) -> bool {
        true
    }

    async fn matches_condition(&self, context: &AuthContext) -> AuthResult<bool> {
        Ok(context.user_id.is_some())
    }

    // Conditions are never run as steps.
    async fn authenticate(&self, _context: &mut AuthContext) -> AuthResult<AuthenticatorResult> {
        Ok(AuthenticatorResult::success())
    }
}
