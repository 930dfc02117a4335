//! # kc-core
//!
//! Core types shared by the authentication flow server crates.
//!
//! Currently this is the audit event model: every administrative change to
//! realms, authentication flows, executions and authenticator configs is
//! recorded as an [`event::Event`] carrying its operation, resource type and
//! realm-relative resource path.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod event;

pub use event::{Event, EventBuilder, EventOutcome, EventType, OperationType, ResourceType};
