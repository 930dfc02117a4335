//! End-to-end tests for the Keycloak Rust server.
//!
//! The tests live under `tests/` and run the server in-process on an
//! ephemeral port.
