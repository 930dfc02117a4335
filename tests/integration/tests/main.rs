//! End-to-End Integration Tests
//!
//! These tests drive the admin API of an in-process server over HTTP.

mod common;
mod flows;
mod realms;
