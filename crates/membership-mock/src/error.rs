//! Error types for the mock member provider implementation.

use flock_membership::{MemberProviderError, MemberProviderErrorKind};
use thiserror::Error;

/// Error type for the mock member provider implementation.
#[derive(Debug, Error)]
pub enum Error {
    /// Induced failure, scripted by a test.
    #[error("Member source unavailable: {0}")]
    Unavailable(String),
}

impl MemberProviderError for Error {
    fn kind(&self) -> MemberProviderErrorKind {
        match self {
            Self::Unavailable(_) => MemberProviderErrorKind::Unavailable,
        }
    }
}
