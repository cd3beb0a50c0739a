//! Domain primitives for the AMI baker custom resource.
//!
//! This crate owns the lifecycle event contract, request validation, the
//! identity tags used to find a baked image again, and the callback response
//! body. It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod contract;
pub mod identity;
pub mod response;
