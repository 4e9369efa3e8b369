//! In-memory member provider for tests and examples.
//!
//! Serves a scripted member list and can be switched into a failing mode
//! to exercise the service's skip-and-retry behavior.

mod error;

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
pub use error::Error;
use flock_membership::{Member, MemberId, MemberProvider, MembershipProperties};

/// A member provider backed by an in-memory list.
#[derive(Debug, Default)]
pub struct MockMemberProvider {
    members: RwLock<Vec<Member>>,
    failing: AtomicBool,
}

impl MockMemberProvider {
    /// Create a provider serving the given members
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members: RwLock::new(members),
            failing: AtomicBool::new(false),
        }
    }

    /// Replace the served member list
    pub fn set_members(&self, members: Vec<Member>) {
        *self.members.write().unwrap() = members;
    }

    /// Add a member to the served list
    pub fn add_member(&self, member: Member) {
        self.members.write().unwrap().push(member);
    }

    /// Remove a member from the served list by id
    pub fn remove_member(&self, id: &MemberId) {
        self.members.write().unwrap().retain(|member| member.id != *id);
    }

    /// Make every subsequent `get_members` call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MemberProvider for MockMemberProvider {
    type Error = Error;

    async fn init(&self, _properties: &MembershipProperties) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn get_members(&self) -> Result<Vec<Member>, Self::Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("induced failure".to_string()));
        }
        Ok(self.members.read().unwrap().clone())
    }
}
