//! Construction and upkeep of the local node's member descriptor

use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, info};

use crate::{Member, MemberId, MembershipError, MembershipProperties};

/// Owns the descriptor of the local node.
///
/// The descriptor is built lazily from configuration on first use. Its
/// unique id is derived from the local hostname (optionally salted) and
/// is never recomputed afterwards: endpoint reconfiguration updates the
/// descriptor in place, so peers keep recognising this node across
/// host/port changes.
#[derive(Debug, Default)]
pub struct LocalMemberManager {
    member: Option<Member>,
    payload: Bytes,
    domain: Bytes,
}

impl LocalMemberManager {
    /// Create a manager with no descriptor yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the descriptor from configuration, or update the endpoint
    /// fields of an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`MembershipError::Configuration`] when a required
    /// property is missing or malformed, and [`MembershipError::Internal`]
    /// when the local hostname cannot be determined.
    pub fn create_or_update(
        &mut self,
        properties: &MembershipProperties,
    ) -> Result<&Member, MembershipError> {
        let host = properties.tcp_listen_host()?.to_string();
        let port = properties.tcp_listen_port()?;
        let secure_port = properties.tcp_secure_port()?;
        let udp_port = properties.udp_listen_port()?;

        if self.member.is_some() {
            let member = self.member.as_mut().expect("checked above");
            debug!("updating local member endpoints to {host}:{port}");
            member.host = host;
            member.port = port;
            member.secure_port = secure_port;
            member.udp_port = udp_port;
            member.payload = self.payload.clone();
            member.domain = self.domain.clone();
            return Ok(member);
        }

        let hostname = hostname::get()
            .map_err(|e| MembershipError::Internal(format!("cannot determine local hostname: {e}")))?
            .into_string()
            .map_err(|_| {
                MembershipError::Internal("local hostname is not valid UTF-8".to_string())
            })?;

        let id = MemberId::from_hostname(&hostname, properties.local_member_id_salt());
        info!("local member id {id} derived from hostname {hostname}");

        let mut member = Member::new(host, port, id);
        member.secure_port = secure_port;
        member.udp_port = udp_port;
        member.payload = self.payload.clone();
        member.domain = self.domain.clone();
        member.local = true;

        Ok(self.member.insert(member))
    }

    /// Stamp the service-start time; called once per service start
    pub fn mark_service_start(&mut self) {
        if let Some(member) = self.member.as_mut() {
            member.service_start = Instant::now();
            member.alive_time = Duration::ZERO;
        }
    }

    /// Snapshot of the local descriptor, if built.
    ///
    /// With `refresh`, the alive-duration is recomputed from the
    /// service-start instant before returning; without it, the last
    /// computed value is kept.
    pub fn member(&mut self, refresh: bool) -> Option<Member> {
        if refresh {
            if let Some(member) = self.member.as_mut() {
                member.refresh_alive_time();
            }
        }
        self.member.clone()
    }

    /// The local member id, if the descriptor has been built
    pub fn id(&self) -> Option<MemberId> {
        self.member.as_ref().map(|member| member.id)
    }

    /// Set the opaque payload, propagating onto the live descriptor
    /// immediately if it exists
    pub fn set_payload(&mut self, payload: Bytes) {
        if let Some(member) = self.member.as_mut() {
            member.payload = payload.clone();
        }
        self.payload = payload;
    }

    /// Set the opaque domain tag, propagating onto the live descriptor
    /// immediately if it exists
    pub fn set_domain(&mut self, domain: Bytes) {
        if let Some(member) = self.member.as_mut() {
            member.domain = domain.clone();
        }
        self.domain = domain;
    }
}
