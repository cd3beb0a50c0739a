//! AWS-oriented adapters and handlers for the AMI baker custom resource.
//!
//! This crate owns runtime integration details (the Lambda entry point, the
//! EC2 gateway, and the HTTP callback) around the lifecycle state machine.
//! Domain contracts live in `ami_baker_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
