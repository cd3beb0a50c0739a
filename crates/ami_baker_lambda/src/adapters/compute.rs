//! Compute provider gateway.
//!
//! The lifecycle state machine only sees this trait. Implementations report
//! failures as [`ProviderError`] and never retry on their own.

use std::fmt;

use ami_baker_core::identity::{Tag, TagFilter};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub image_id: String,
    pub tags: Vec<Tag>,
}

pub trait ComputeProvider {
    /// Creates an image of the instance and returns its id.
    fn create_image(
        &self,
        instance_id: &str,
        name: &str,
        no_reboot: bool,
    ) -> Result<String, ProviderError>;

    fn create_tags(&self, resource_ids: &[String], tags: &[Tag]) -> Result<(), ProviderError>;

    /// Lists images matching every filter, in provider order.
    fn find_images(&self, filters: &[TagFilter]) -> Result<Vec<Image>, ProviderError>;

    fn deregister_image(&self, image_id: &str) -> Result<(), ProviderError>;
}

/// Builds a provider bound to the region named by an event.
pub trait ComputeProviderFactory {
    type Provider: ComputeProvider;

    fn for_region(&self, region: &str) -> Self::Provider;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOperation {
    CreateImage,
    CreateTags,
    DescribeImages,
    DeregisterImage,
}

impl ProviderOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateImage => "createImage",
            Self::CreateTags => "createTags",
            Self::DescribeImages => "describeImages",
            Self::DeregisterImage => "deregisterImage",
        }
    }
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider failure classified by error code.
///
/// Every variant renders as `<operation> failed: ...` so the message can be
/// used as a callback reason as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("{operation} failed: resource not found: {message}")]
    NotFound {
        operation: ProviderOperation,
        message: String,
    },

    #[error("{operation} failed: request throttled: {message}")]
    Throttled {
        operation: ProviderOperation,
        message: String,
    },

    #[error("{operation} failed: not authorized: {message}")]
    Unauthorized {
        operation: ProviderOperation,
        message: String,
    },

    #[error("{operation} failed: {message}")]
    Sdk {
        operation: ProviderOperation,
        code: Option<String>,
        message: String,
    },
}

impl ProviderError {
    pub fn operation(&self) -> ProviderOperation {
        match self {
            Self::NotFound { operation, .. }
            | Self::Throttled { operation, .. }
            | Self::Unauthorized { operation, .. }
            | Self::Sdk { operation, .. } => *operation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

const NOT_FOUND_CODES: &[&str] = &[
    "InvalidAMIID.NotFound",
    "InvalidAMIID.Unavailable",
    "InvalidInstanceID.NotFound",
];

const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

const UNAUTHORIZED_CODES: &[&str] = &["AuthFailure", "UnauthorizedOperation"];

pub fn classify_provider_error(
    operation: ProviderOperation,
    code: Option<&str>,
    message: Option<&str>,
) -> ProviderError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => ProviderError::NotFound { operation, message },
        Some(c) if THROTTLING_CODES.contains(&c) => ProviderError::Throttled { operation, message },
        Some(c) if UNAUTHORIZED_CODES.contains(&c) => {
            ProviderError::Unauthorized { operation, message }
        }
        _ => ProviderError::Sdk {
            operation,
            code: code.map(str::to_string),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes() {
        for code in NOT_FOUND_CODES {
            let err = classify_provider_error(
                ProviderOperation::DeregisterImage,
                Some(code),
                Some("gone"),
            );
            assert!(err.is_not_found(), "Expected NotFound for code: {code}");
        }
    }

    #[test]
    fn throttling_and_auth_codes() {
        let throttled = classify_provider_error(
            ProviderOperation::CreateImage,
            Some("RequestLimitExceeded"),
            Some("slow down"),
        );
        assert!(matches!(throttled, ProviderError::Throttled { .. }));

        let unauthorized = classify_provider_error(
            ProviderOperation::CreateTags,
            Some("UnauthorizedOperation"),
            None,
        );
        assert!(matches!(unauthorized, ProviderError::Unauthorized { .. }));
        assert_eq!(
            unauthorized.to_string(),
            "createTags failed: not authorized: Unknown error"
        );
    }

    #[test]
    fn unknown_codes_keep_code_and_operation() {
        let err = classify_provider_error(
            ProviderOperation::DescribeImages,
            Some("SomeNewError"),
            Some("details"),
        );

        assert_eq!(err.operation(), ProviderOperation::DescribeImages);
        assert_eq!(
            err,
            ProviderError::Sdk {
                operation: ProviderOperation::DescribeImages,
                code: Some("SomeNewError".to_string()),
                message: "details".to_string(),
            }
        );
        assert_eq!(err.to_string(), "describeImages failed: details");
    }
}
