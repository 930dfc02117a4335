//! Authentication and authorization for the Admin API.
//!
//! Provides:
//! - Bearer token authentication middleware
//! - The [`AdminAuth`] extractor handlers use to identify the caller
//! - Realm permissions with implication (`manage-realm` implies `view-realm`)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AdminError;

// ============================================================================
// Permission Types
// ============================================================================

/// Admin API permissions following Keycloak's permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// View realm settings and authentication flows.
    ViewRealm,
    /// Manage realm settings and authentication flows.
    ManageRealm,
    /// Full admin access (superuser).
    RealmAdmin,
}

impl Permission {
    /// Returns all permissions implied by this permission.
    #[must_use]
    pub const fn implies(&self) -> &'static [Self] {
        match self {
            Self::RealmAdmin => &[Self::ViewRealm, Self::ManageRealm],
            Self::ManageRealm => &[Self::ViewRealm],
            Self::ViewRealm => &[],
        }
    }

    /// Maps a Keycloak role name to a permission.
    #[must_use]
    pub fn from_role_name(role: &str) -> Option<Self> {
        match role {
            "realm-admin" | "admin" => Some(Self::RealmAdmin),
            "view-realm" => Some(Self::ViewRealm),
            "manage-realm" => Some(Self::ManageRealm),
            _ => None,
        }
    }

    /// Returns the role name for this permission.
    #[must_use]
    pub const fn role_name(&self) -> &'static str {
        match self {
            Self::RealmAdmin => "realm-admin",
            Self::ViewRealm => "view-realm",
            Self::ManageRealm => "manage-realm",
        }
    }
}

// ============================================================================
// Authentication Context
// ============================================================================

/// Authenticated admin user context.
///
/// Extracted from the Bearer token and made available to handlers.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// User ID from the token.
    pub user_id: Uuid,
    /// Username.
    pub username: String,
    /// Realm the user belongs to.
    pub realm: String,
    /// Realm being accessed (from URL path).
    pub target_realm: Option<String>,
    /// Permissions granted to this user.
    pub permissions: Vec<Permission>,
}

impl AdminAuth {
    /// Creates a context for a `master` realm administrator.
    #[must_use]
    pub fn realm_admin(username: impl Into<String>) -> Self {
        Self {
            user_id: Uuid::now_v7(),
            username: username.into(),
            realm: "master".to_string(),
            target_realm: None,
            permissions: vec![Permission::RealmAdmin],
        }
    }

    /// Checks if the user has a specific permission.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions
            .iter()
            .any(|p| *p == permission || p.implies().contains(&permission))
    }

    /// Ensures the user has a specific permission, returning an error if not.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` if the user lacks the permission.
    pub fn require_permission(&self, permission: Permission) -> Result<(), AdminError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AdminError::Forbidden(format!(
                "Missing required permission: {}",
                permission.role_name()
            )))
        }
    }
}

// ============================================================================
// Token Validator Trait
// ============================================================================

/// Trait for validating admin access tokens.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validates a bearer token and extracts the admin auth context.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or the user lacks admin
    /// access.
    async fn validate(&self, token: &str, target_realm: Option<&str>) -> Result<AdminAuth, AdminError>;
}

/// Token validator backed by a fixed table of opaque tokens.
#[derive(Debug, Clone, Default)]
pub struct SimpleTokenValidator {
    valid_tokens: HashMap<String, AdminAuth>,
}

impl SimpleTokenValidator {
    /// Creates a validator that accepts no tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a token for the given admin.
    pub fn add_token(&mut self, token: impl Into<String>, auth: AdminAuth) {
        self.valid_tokens.insert(token.into(), auth);
    }

    /// Builder form of [`Self::add_token`].
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, auth: AdminAuth) -> Self {
        self.add_token(token, auth);
        self
    }
}

#[async_trait]
impl TokenValidator for SimpleTokenValidator {
    async fn validate(&self, token: &str, target_realm: Option<&str>) -> Result<AdminAuth, AdminError> {
        self.valid_tokens
            .get(token)
            .cloned()
            .map(|mut auth| {
                auth.target_realm = target_realm.map(String::from);
                auth
            })
            .ok_or(AdminError::Unauthorized)
    }
}

// ============================================================================
// Axum Middleware
// ============================================================================

/// Shared state for authentication middleware.
pub struct AuthState<V: TokenValidator> {
    /// Token validator implementation.
    pub validator: Arc<V>,
}

impl<V: TokenValidator> Clone for AuthState<V> {
    fn clone(&self) -> Self {
        Self {
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<V: TokenValidator> AuthState<V> {
    /// Creates a new auth state with the given validator.
    pub fn new(validator: V) -> Self {
        Self {
            validator: Arc::new(validator),
        }
    }
}

/// Authentication middleware that validates bearer tokens.
///
/// Extracts the `Authorization: Bearer <token>` header, validates it,
/// and injects `AdminAuth` into the request extensions.
pub async fn auth_middleware<V: TokenValidator + 'static>(
    State(state): State<AuthState<V>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(&request) else {
        tracing::debug!(path = %request.uri().path(), "admin request without bearer token");
        return (
            StatusCode::UNAUTHORIZED,
            [("WWW-Authenticate", "Bearer")],
            "Missing or invalid Authorization header",
        )
            .into_response();
    };

    let target_realm = extract_target_realm(request.uri().path());

    match state.validator.validate(&token, target_realm.as_deref()).await {
        Ok(auth) => {
            request.extensions_mut().insert(auth);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "admin token rejected");
            e.into_response()
        }
    }
}

fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

/// Extracts the target realm from `/admin/realms/{realm}/...`.
fn extract_target_realm(path: &str) -> Option<String> {
    let parts: Vec<_> = path.split('/').collect();
    if parts.len() >= 4 && parts[1] == "admin" && parts[2] == "realms" && !parts[3].is_empty() {
        Some(parts[3].to_string())
    } else {
        None
    }
}

// ============================================================================
// Extractor Implementation
// ============================================================================

/// Axum extractor for `AdminAuth`.
///
/// Only succeeds behind [`auth_middleware`].
impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminAuth>()
            .cloned()
            .ok_or(AdminError::Unauthorized)
    }
}
