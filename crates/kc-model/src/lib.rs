//! # kc-model
//!
//! Domain models for realms and their authentication flows.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod flow;
pub mod realm;

pub use flow::{
    AuthenticationExecution, AuthenticationFlow, AuthenticatorConfig, FlowType, ParseModelError,
    Requirement,
};
pub use realm::{FlowBinding, Realm};
