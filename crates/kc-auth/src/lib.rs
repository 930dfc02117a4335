//! # kc-auth
//!
//! Authentication engine for Keycloak Rust.
//!
//! This crate implements the authenticator SPI, the provider metadata the
//! admin API validates against, the built-in flows every realm starts
//! with, and the engine that runs a flow for a login session.
//!
//! ## Features
//!
//! - Pluggable authenticator architecture with conditional evaluators
//! - Provider descriptor registry (requirement choices, configurability)
//! - Default browser, direct grant, registration, reset credentials,
//!   client, docker and first broker login flows
//! - Flow engine honoring REQUIRED, ALTERNATIVE, CONDITIONAL and DISABLED
//!
//! ## Example
//!
//! ```ignore
//! use kc_auth::{AuthContext, AuthenticatorRegistry, FlowProcessor, FlowTree};
//!
//! let realm = kc_auth::add_default_flows(&storage, Realm::new("demo")).await?;
//! let tree = FlowTree::load(&storage, realm.id, realm.browser_flow.unwrap()).await?;
//!
//! let processor = FlowProcessor::new(Arc::new(AuthenticatorRegistry::with_builtin()));
//! let mut ctx = AuthContext::new(realm.id, session_id);
//! let outcome = processor.process(&tree, &mut ctx).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod authenticator;
pub mod builtin;
pub mod defaults;
pub mod error;
pub mod flow;
pub mod providers;

pub use authenticator::{
    AuthContext, Authenticator, AuthenticatorRegistry, AuthenticatorResult, ExecutionStatus,
};
pub use defaults::add_default_flows;
pub use error::{AuthError, AuthResult};
pub use flow::{FlowOutcome, FlowProcessor, FlowTree};
pub use providers::{flow_requirement_choices, ProviderDescriptor, ProviderKind, ProviderRegistry};
