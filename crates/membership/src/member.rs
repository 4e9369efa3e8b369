//! Member descriptor and identity types

use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fixed-length identity token distinguishing members independent of
/// network address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId([u8; 16]);

impl MemberId {
    /// Derive an id from a hostname, optionally mixed with a configured
    /// per-instance salt. Deterministic: the same hostname (and salt)
    /// always yields the same id, so peers recognise a restarted node.
    pub fn from_hostname(hostname: &str, salt: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(hostname.as_bytes());
        if let Some(salt) = salt {
            hasher.update(salt.as_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Self(bytes)
    }

    /// Create an id from raw bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of this id
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Create a deterministic id from a seed (useful for testing)
    pub const fn from_seed(seed: u8) -> Self {
        Self([seed; 16])
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberId({})", hex::encode(self.0))
    }
}

/// A node participating in the cluster, either the configured local
/// identity or a peer observed through the member provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Member {
    /// Network host the member listens on
    pub host: String,

    /// Base (TCP) listen port
    pub port: u16,

    /// Secure (TLS) listen port
    pub secure_port: u16,

    /// Auxiliary (UDP) listen port
    pub udp_port: u16,

    /// Unique identifier, stable for the lifetime of the node
    pub id: MemberId,

    /// Opaque payload bytes attached by the owning node
    pub payload: Bytes,

    /// Opaque domain tag bytes
    pub domain: Bytes,

    /// When the member's service started
    #[serde(skip, default = "Instant::now")]
    pub service_start: Instant,

    /// Last computed alive-duration (see [`Member::refresh_alive_time`])
    pub alive_time: Duration,

    /// When this member was last observed
    #[serde(skip, default = "Instant::now")]
    pub last_heard: Instant,

    /// Whether this member describes the local node
    pub local: bool,
}

impl Member {
    /// Create a member with the given endpoint and identity. Secure and
    /// UDP ports default to 0, payload and domain to empty.
    pub fn new(host: impl Into<String>, port: u16, id: MemberId) -> Self {
        let now = Instant::now();
        Self {
            host: host.into(),
            port,
            secure_port: 0,
            udp_port: 0,
            id,
            payload: Bytes::new(),
            domain: Bytes::new(),
            service_start: now,
            alive_time: Duration::ZERO,
            last_heard: now,
            local: false,
        }
    }

    /// The member's name, "host:port"
    pub fn name(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Recompute the alive-duration from the service-start instant
    pub fn refresh_alive_time(&mut self) {
        self.alive_time = self.service_start.elapsed();
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id)
    }
}
