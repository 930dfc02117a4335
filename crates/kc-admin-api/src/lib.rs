//! # kc-admin-api
//!
//! Admin REST API for Keycloak Rust.
//!
//! This crate provides the administrative endpoints for managing realms
//! and their authentication flows: the flows themselves, the executions
//! inside them and the authenticator configs attached to executions.
//!
//! ## Modules
//!
//! - [`auth`] - Bearer token middleware and admin permissions
//! - [`authentication`] - Authentication flow management handlers
//! - [`dto`] - Data Transfer Objects for API requests/responses
//! - [`error`] - Error types and HTTP error responses
//! - [`events`] - Admin event logging
//! - [`paths`] - Resource paths recorded in admin events
//! - [`router`] - Realm handlers and router assembly
//! - [`state`] - Application state management
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use kc_admin_api::{admin_router, auth_middleware, AdminState, AuthState};
//!
//! let state = AdminState::new(storage, Arc::new(ProviderRegistry::with_builtin()), events);
//! let app = admin_router()
//!     .with_state(state)
//!     .layer(axum::middleware::from_fn_with_state(AuthState::new(validator), auth_middleware));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! ## API Endpoints
//!
//! ### Realms
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/admin/realms` | List all realms |
//! | POST | `/admin/realms` | Create a realm with its built-in flows |
//! | GET | `/admin/realms/{realm}` | Get realm by name |
//! | PUT | `/admin/realms/{realm}` | Update a realm and its flow bindings |
//! | DELETE | `/admin/realms/{realm}` | Delete a realm |
//!
//! ### Authentication
//!
//! All paths are relative to `/admin/realms/{realm}/authentication`.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/flows` | List top-level flows |
//! | POST | `/flows` | Create a top-level flow |
//! | GET | `/flows/{id}` | Get a flow |
//! | PUT | `/flows/{id}` | Update a flow |
//! | DELETE | `/flows/{id}` | Delete a flow and its nested flows |
//! | POST | `/flows/{flowAlias}/copy` | Deep-copy a flow |
//! | GET | `/flows/{flowAlias}/executions` | List executions depth-first |
//! | PUT | `/flows/{flowAlias}/executions` | Update an execution |
//! | POST | `/flows/{flowAlias}/executions/execution` | Add an authenticator execution |
//! | POST | `/flows/{flowAlias}/executions/flow` | Add a nested flow |
//! | GET | `/executions/{id}` | Get an execution |
//! | DELETE | `/executions/{id}` | Remove an execution |
//! | POST | `/executions/{id}/raise-priority` | Move an execution up |
//! | POST | `/executions/{id}/lower-priority` | Move an execution down |
//! | POST | `/executions/{id}/config` | Attach an authenticator config |
//! | GET | `/config/{id}` | Get an authenticator config |
//! | PUT | `/config/{id}` | Update an authenticator config |
//! | DELETE | `/config/{id}` | Delete an authenticator config |
//! | GET | `/authenticator-providers` | List authenticators |
//! | GET | `/form-providers` | List form authenticators |
//! | GET | `/form-action-providers` | List form actions |
//! | GET | `/client-authenticator-providers` | List client authenticators |

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod auth;
pub mod authentication;
pub mod dto;
pub mod error;
pub mod events;
pub mod paths;
pub mod router;
pub mod state;

// Re-export commonly used types
pub use auth::{
    AdminAuth, AuthState, Permission, SimpleTokenValidator, TokenValidator, auth_middleware,
};
pub use authentication::authentication_router;
pub use dto::{
    AddExecutionFlowRequest, AddExecutionRequest, AuthenticationExecutionExportRepresentation,
    AuthenticationExecutionInfoRepresentation, AuthenticationExecutionRepresentation,
    AuthenticationFlowRepresentation, AuthenticatorConfigRepresentation, ConfigRequest,
    CopyFlowRequest, CreateRealmRequest, FlowRequest, ProviderRepresentation,
    RealmRepresentation, RealmSummary, UpdateExecutionRequest, UpdateRealmRequest,
};
pub use error::{AdminError, AdminResult, ErrorResponse};
pub use events::{
    AdminEventBuilder, AdminEventLogger, EventLogError, InMemoryEventLogger, TracingEventLogger,
};
pub use router::{admin_router, realm_router};
pub use state::AdminState;
