//! Error types for membership operations

use std::error::Error;
use std::fmt::{self, Debug};
use thiserror::Error as ThisError;

/// Membership-related errors
#[derive(Clone, Debug, ThisError)]
pub enum MembershipError {
    /// Required configuration missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external member source failed to answer
    #[error("Member provider error: {0}")]
    Provider(String),

    /// A required platform facility is unavailable
    #[error("Internal error: {0}")]
    Internal(String),

    /// Operation invoked in the wrong lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Marker trait for `MemberProvider` errors
pub trait MemberProviderError: Debug + Error + Send + Sync {
    /// Returns the kind of this error
    fn kind(&self) -> MemberProviderErrorKind;
}

/// The kind of member provider error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemberProviderErrorKind {
    /// The backing member source could not be reached
    Unavailable,

    /// Error with an external service the provider depends on
    External,

    /// Other/unknown error
    Other,
}

impl fmt::Display for MemberProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
