//! Pluggable member-source interface

use async_trait::async_trait;

use crate::error::MemberProviderError;
use crate::{Member, MembershipProperties};

/// Abstract interface for obtaining candidate cluster members from an
/// external source (DNS, a registry API, a static list, ...).
///
/// Implementations must be safe to call repeatedly: `init` may run more
/// than once across service restarts, and `get_members` is invoked on
/// every reconciliation cycle. A `get_members` failure is never fatal to
/// the caller; the cycle is skipped and the call retried on the normal
/// schedule.
#[async_trait]
pub trait MemberProvider
where
    Self: Send + Sync + 'static,
{
    /// The error type for this provider.
    type Error: MemberProviderError;

    /// Prepare the provider with the service configuration.
    async fn init(&self, properties: &MembershipProperties) -> Result<(), Self::Error>;

    /// Fetch the current candidate member list.
    async fn get_members(&self) -> Result<Vec<Member>, Self::Error>;
}
