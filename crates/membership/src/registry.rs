//! Bookkeeping for known peers with liveness timestamps

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::{Member, MemberId};

/// The authoritative set of known peers.
///
/// Tracks every non-local peer with the instant it was last observed.
/// The local member never enters the peer map; its id is kept only so
/// candidates describing the local node are excluded from reconciliation.
#[derive(Debug)]
pub struct MembershipRegistry {
    local_id: MemberId,
    members: HashMap<MemberId, Member>,
}

impl MembershipRegistry {
    /// Create a registry that excludes the given local identity
    pub fn new(local_id: MemberId) -> Self {
        Self {
            local_id,
            members: HashMap::new(),
        }
    }

    /// The local identity this registry excludes
    pub fn local_id(&self) -> MemberId {
        self.local_id
    }

    /// Record an observation of `candidate`.
    ///
    /// Returns true if the candidate was not previously known (newly
    /// seen); a known candidate only has its last-heard-from timestamp
    /// refreshed. Candidates carrying the local id are ignored.
    pub fn mark_alive(&mut self, mut candidate: Member) -> bool {
        if candidate.id == self.local_id {
            return false;
        }

        match self.members.get_mut(&candidate.id) {
            Some(existing) => {
                existing.last_heard = Instant::now();
                false
            }
            None => {
                candidate.local = false;
                candidate.last_heard = Instant::now();
                self.members.insert(candidate.id, candidate);
                true
            }
        }
    }

    /// Remove and return every peer not observed within `timeout`.
    ///
    /// A timeout of zero expires every peer that was not refreshed in the
    /// current reconciliation pass.
    pub fn expire(&mut self, timeout: Duration) -> Vec<Member> {
        let now = Instant::now();
        let expired_ids: Vec<MemberId> = self
            .members
            .iter()
            .filter(|(_, member)| now.duration_since(member.last_heard) > timeout)
            .map(|(id, _)| *id)
            .collect();

        expired_ids
            .iter()
            .filter_map(|id| self.members.remove(id))
            .collect()
    }

    /// Whether any peers are currently tracked
    pub fn has_members(&self) -> bool {
        !self.members.is_empty()
    }

    /// Snapshot of all tracked peers (excluding the local member)
    pub fn members(&self) -> Vec<Member> {
        self.members.values().cloned().collect()
    }

    /// Look up a peer by id
    pub fn get_member(&self, id: &MemberId) -> Option<Member> {
        self.members.get(id).cloned()
    }

    /// Names ("host:port") of all tracked peers
    pub fn members_by_name(&self) -> Vec<String> {
        self.members.values().map(Member::name).collect()
    }

    /// Look up a peer by its "host:port" name
    pub fn find_member_by_name(&self, name: &str) -> Option<Member> {
        self.members
            .values()
            .find(|member| member.name() == name)
            .cloned()
    }

    /// Forget all tracked peers; the local identity is preserved
    pub fn reset(&mut self) {
        self.members.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(seed: u8) -> Member {
        Member::new(format!("10.0.0.{seed}"), 4000, MemberId::from_seed(seed))
    }

    fn registry() -> MembershipRegistry {
        MembershipRegistry::new(MemberId::from_seed(0))
    }

    #[test]
    fn mark_alive_is_idempotent() {
        let mut registry = registry();
        assert!(registry.mark_alive(peer(1)));
        assert!(!registry.mark_alive(peer(1)));
        assert!(!registry.mark_alive(peer(1)));
        assert_eq!(registry.members().len(), 1);
    }

    #[test]
    fn mark_alive_ignores_the_local_member() {
        let mut registry = registry();
        assert!(!registry.mark_alive(peer(0)));
        assert!(!registry.has_members());
    }

    #[test]
    fn expire_removes_only_stale_peers() {
        let mut registry = registry();
        registry.mark_alive(peer(1));
        registry.mark_alive(peer(2));

        // Age peer 2 past the window
        if let Some(stale) = registry.members.get_mut(&MemberId::from_seed(2)) {
            stale.last_heard = Instant::now() - Duration::from_millis(500);
        }

        let expired = registry.expire(Duration::from_millis(100));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, MemberId::from_seed(2));
        assert_eq!(registry.members().len(), 1);
        assert!(registry.get_member(&MemberId::from_seed(1)).is_some());
        assert!(registry.get_member(&MemberId::from_seed(2)).is_none());
    }

    #[test]
    fn expired_peer_is_returned_exactly_once() {
        let mut registry = registry();
        registry.mark_alive(peer(1));
        if let Some(stale) = registry.members.get_mut(&MemberId::from_seed(1)) {
            stale.last_heard = Instant::now() - Duration::from_millis(500);
        }

        assert_eq!(registry.expire(Duration::from_millis(100)).len(), 1);
        assert!(registry.expire(Duration::from_millis(100)).is_empty());
        assert!(!registry.has_members());
    }

    #[test]
    fn refresh_wins_over_expiry() {
        let mut registry = registry();
        registry.mark_alive(peer(1));
        if let Some(stale) = registry.members.get_mut(&MemberId::from_seed(1)) {
            stale.last_heard = Instant::now() - Duration::from_millis(500);
        }

        // Re-observed in the same cycle: must survive
        registry.mark_alive(peer(1));
        assert!(registry.expire(Duration::from_millis(100)).is_empty());
        assert!(registry.has_members());
    }

    #[test]
    fn zero_timeout_expires_every_unrefreshed_peer() {
        let mut registry = registry();
        registry.mark_alive(peer(1));
        registry.mark_alive(peer(2));
        for member in registry.members.values_mut() {
            member.last_heard = Instant::now() - Duration::from_millis(1);
        }

        let expired = registry.expire(Duration::ZERO);
        assert_eq!(expired.len(), 2);
        assert!(!registry.has_members());
    }

    #[test]
    fn reset_forgets_peers_but_keeps_identity() {
        let mut registry = registry();
        registry.mark_alive(peer(1));
        registry.reset();
        assert!(!registry.has_members());
        assert_eq!(registry.local_id(), MemberId::from_seed(0));
        // Still usable after reset
        assert!(registry.mark_alive(peer(1)));
    }

    #[test]
    fn lookup_by_name() {
        let mut registry = registry();
        registry.mark_alive(peer(1));
        registry.mark_alive(peer(2));

        let mut names = registry.members_by_name();
        names.sort();
        assert_eq!(names, vec!["10.0.0.1:4000", "10.0.0.2:4000"]);

        let found = registry.find_member_by_name("10.0.0.2:4000");
        assert_eq!(found.map(|m| m.id), Some(MemberId::from_seed(2)));
        assert!(registry.find_member_by_name("10.0.0.9:4000").is_none());
    }
}
