//! Data Transfer Objects (DTOs) for the Admin API.
//!
//! These types define the request and response formats for the API.
//! They are separate from domain models to allow API evolution
//! without affecting internal structures.

pub mod flow;
pub mod realm;

pub use flow::{
    AddExecutionFlowRequest, AddExecutionRequest, AuthenticationExecutionExportRepresentation,
    AuthenticationExecutionInfoRepresentation, AuthenticationExecutionRepresentation,
    AuthenticationFlowRepresentation, AuthenticatorConfigRepresentation, ConfigRequest,
    CopyFlowRequest, FlowRequest, ProviderRepresentation, UpdateExecutionRequest,
};
pub use realm::{CreateRealmRequest, RealmRepresentation, RealmSummary, UpdateRealmRequest};
