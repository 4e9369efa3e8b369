//! String-keyed configuration surface for the membership service

use std::collections::HashMap;
use std::time::Duration;

use crate::MembershipError;

/// Listen host for the base (TCP) channel
pub const TCP_LISTEN_HOST: &str = "tcpListenHost";
/// Listen port for the base (TCP) channel
pub const TCP_LISTEN_PORT: &str = "tcpListenPort";
/// Listen port for the secure (TLS) channel
pub const TCP_SECURE_PORT: &str = "tcpSecurePort";
/// Listen port for the auxiliary (UDP) channel
pub const UDP_LISTEN_PORT: &str = "udpListenPort";
/// Reconciliation interval in milliseconds
pub const REFRESH_FREQUENCY: &str = "refreshFrequency";
/// Liveness timeout in milliseconds
pub const EXPIRATION_TIME: &str = "expirationTime";
/// Optional salt mixed into the hostname-derived local member id
pub const LOCAL_MEMBER_ID_SALT: &str = "localMemberIdSalt";

const DEFAULT_REFRESH_FREQUENCY_MS: u64 = 1000;
const DEFAULT_EXPIRATION_TIME_MS: u64 = 100;

/// Named string options recognised by the membership service.
///
/// Values are parsed on access; a missing required key or an unparsable
/// value surfaces as [`MembershipError::Configuration`].
#[derive(Clone, Debug)]
pub struct MembershipProperties {
    entries: HashMap<String, String>,
}

impl Default for MembershipProperties {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            REFRESH_FREQUENCY.to_string(),
            DEFAULT_REFRESH_FREQUENCY_MS.to_string(),
        );
        Self { entries }
    }
}

impl MembershipProperties {
    /// Create an empty property set with defaults applied
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Get a raw property value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Remove a property
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// The configured listen host
    pub fn tcp_listen_host(&self) -> Result<&str, MembershipError> {
        self.get(TCP_LISTEN_HOST).ok_or_else(|| {
            MembershipError::Configuration(format!("missing required property {TCP_LISTEN_HOST}"))
        })
    }

    /// The configured base listen port
    pub fn tcp_listen_port(&self) -> Result<u16, MembershipError> {
        self.required_port(TCP_LISTEN_PORT)
    }

    /// The configured secure listen port
    pub fn tcp_secure_port(&self) -> Result<u16, MembershipError> {
        self.required_port(TCP_SECURE_PORT)
    }

    /// The configured auxiliary (UDP) listen port
    pub fn udp_listen_port(&self) -> Result<u16, MembershipError> {
        self.required_port(UDP_LISTEN_PORT)
    }

    /// The reconciliation interval (default 1000ms)
    pub fn refresh_frequency(&self) -> Result<Duration, MembershipError> {
        self.millis_or(REFRESH_FREQUENCY, DEFAULT_REFRESH_FREQUENCY_MS)
    }

    /// The liveness timeout after which an unobserved peer is declared
    /// expired (default 100ms)
    pub fn expiration_time(&self) -> Result<Duration, MembershipError> {
        self.millis_or(EXPIRATION_TIME, DEFAULT_EXPIRATION_TIME_MS)
    }

    /// The optional per-instance salt for the local member id
    pub fn local_member_id_salt(&self) -> Option<&str> {
        self.get(LOCAL_MEMBER_ID_SALT)
    }

    fn required_port(&self, key: &str) -> Result<u16, MembershipError> {
        let value = self.get(key).ok_or_else(|| {
            MembershipError::Configuration(format!("missing required property {key}"))
        })?;
        value.parse::<u16>().map_err(|e| {
            MembershipError::Configuration(format!("unparsable port in {key}='{value}': {e}"))
        })
    }

    fn millis_or(&self, key: &str, default_ms: u64) -> Result<Duration, MembershipError> {
        match self.get(key) {
            None => Ok(Duration::from_millis(default_ms)),
            Some(value) => value.parse::<u64>().map(Duration::from_millis).map_err(|e| {
                MembershipError::Configuration(format!(
                    "unparsable milliseconds in {key}='{value}': {e}"
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let properties = MembershipProperties::new();
        assert_eq!(
            properties.refresh_frequency().unwrap(),
            Duration::from_millis(1000)
        );
        assert_eq!(
            properties.expiration_time().unwrap(),
            Duration::from_millis(100)
        );
        assert!(properties.local_member_id_salt().is_none());
    }

    #[test]
    fn missing_host_is_a_configuration_error() {
        let properties = MembershipProperties::new();
        assert!(matches!(
            properties.tcp_listen_host(),
            Err(MembershipError::Configuration(_))
        ));
    }

    #[test]
    fn unparsable_port_is_a_configuration_error() {
        let mut properties = MembershipProperties::new();
        properties.set(TCP_LISTEN_PORT, "not-a-port");
        assert!(matches!(
            properties.tcp_listen_port(),
            Err(MembershipError::Configuration(_))
        ));
    }

    #[test]
    fn set_overrides_defaults() {
        let mut properties = MembershipProperties::new();
        properties.set(REFRESH_FREQUENCY, "50");
        properties.set(EXPIRATION_TIME, "250");
        assert_eq!(
            properties.refresh_frequency().unwrap(),
            Duration::from_millis(50)
        );
        assert_eq!(
            properties.expiration_time().unwrap(),
            Duration::from_millis(250)
        );
    }
}
