//! # kc-storage
//!
//! Storage abstraction traits for the authentication flow server.
//!
//! This crate defines the storage provider interfaces that must be
//! implemented by concrete storage backends.
//!
//! ## Provider Traits
//!
//! - [`RealmProvider`] - CRUD operations for realms
//! - [`AuthFlowProvider`] - CRUD operations for flows, executions and
//!   authenticator configs

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod flow;
pub mod realm;

pub use error::{StorageError, StorageResult};
pub use flow::AuthFlowProvider;
pub use realm::RealmProvider;
