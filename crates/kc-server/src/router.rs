//! Router configuration.
//!
//! This module creates the main Axum router that combines all endpoints.

use axum::{Router, http::StatusCode, middleware, response::Json, routing::get};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use kc_admin_api::{AdminAuth, AuthState, SimpleTokenValidator, admin_router, auth_middleware};

use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    // Create health check routes
    let health = Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check));

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(health).route("/", get(root));

    // Add Admin API routes if enabled
    if state.config.admin_api_enabled {
        app = app.merge(create_admin_router(&state));
    }

    app.layer(TraceLayer::new_for_http()).layer(cors)
}

/// Creates the Admin API router behind bearer token authentication.
fn create_admin_router(state: &AppState) -> Router {
    let admin = AdminAuth::realm_admin(&state.config.admin_username);
    let validator = SimpleTokenValidator::new().with_token(&state.config.admin_token, admin);

    admin_router()
        .with_state(state.admin_state())
        .layer(middleware::from_fn_with_state(
            AuthState::new(validator),
            auth_middleware::<SimpleTokenValidator>,
        ))
}

/// Root endpoint handler.
async fn root() -> Json<ServerInfo> {
    Json(ServerInfo {
        name: "Keycloak Rust".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// Server information response.
#[derive(Serialize)]
pub struct ServerInfo {
    name: String,
    version: String,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    })
}

/// Kubernetes liveness probe.
async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe.
async fn readiness_check() -> StatusCode {
    StatusCode::OK
}
