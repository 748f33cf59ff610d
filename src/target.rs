//! Target parsing and resolution (§3).
//!
//! Parsing itself is pure; DNS resolution is performed lazily and only when
//! the host component doesn't parse as an IP literal, mirroring the teacher's
//! `util/dns.rs::ip_from_hostname` (ported from a blocking `spawn_blocking`
//! wrapper around `ToSocketAddrs` to `tokio::net::lookup_host`, which already
//! does the equivalent resolution natively on the async runtime).

use std::net::{IpAddr, SocketAddr};

use crate::error::SnmpError;
use crate::transport::split_host_port;

/// A resolved or resolvable poll target: host plus UDP port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: u16,
    /// Whether `port` came from the parsed text itself rather than a
    /// filled-in default. Lets [`Target::resolve_with_port`] tell a
    /// caller-supplied port apart from one an engine option should override.
    explicit_port: bool,
}

impl Target {
    /// Parse `"host"`, `"host:port"`, `"ipv4"`, or `"ipv4:port"`. Default
    /// port is 161 when absent.
    pub fn parse(text: &str) -> Result<Target, SnmpError> {
        let (host, port, explicit_port) = split_host_port(text, 161)?;
        if host.is_empty() {
            return Err(SnmpError::InvalidOid {
                reason: "empty target host".into(),
            });
        }
        Ok(Target { host, port, explicit_port })
    }

    pub fn with_port(text: &str, port: u16) -> Result<Target, SnmpError> {
        let (host, _, _) = split_host_port(text, port)?;
        Ok(Target { host, port, explicit_port: true })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to a concrete socket address, performing DNS resolution only
    /// if the host isn't already an IP literal.
    pub async fn resolve(&self) -> Result<SocketAddr, SnmpError> {
        self.resolve_with_port(self.port).await
    }

    /// Resolve to a concrete socket address, using `fallback_port` in place
    /// of this target's own port when the target text carried no explicit
    /// port (§6: an engine option's `port` only applies to bare-host
    /// targets — a target that already names a port is never overridden).
    pub async fn resolve_with_port(&self, fallback_port: u16) -> Result<SocketAddr, SnmpError> {
        let port = if self.explicit_port { self.port } else { fallback_port };
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, port));
        }
        let lookup_target = format!("{}:{}", self.host, port);
        let mut addrs = tokio::net::lookup_host(&lookup_target).await.map_err(|e| {
            tracing::debug!(host = %self.host, error = %e, "dns resolution failed");
            SnmpError::HostUnreachable { target: None }
        })?;
        addrs.next().ok_or(SnmpError::HostUnreachable { target: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_only() {
        let t = Target::parse("switch1.example.com").unwrap();
        assert_eq!(t.host(), "switch1.example.com");
        assert_eq!(t.port(), 161);
    }

    #[test]
    fn parses_host_and_port() {
        let t = Target::parse("127.0.0.1:1161").unwrap();
        assert_eq!(t.host(), "127.0.0.1");
        assert_eq!(t.port(), 1161);
    }

    #[tokio::test]
    async fn resolves_ip_literal_without_dns() {
        let t = Target::parse("127.0.0.1:1161").unwrap();
        let addr = t.resolve().await.unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:1161");
    }

    #[tokio::test]
    async fn fallback_port_applies_only_to_bare_host_targets() {
        let bare = Target::parse("127.0.0.1").unwrap();
        let addr = bare.resolve_with_port(1161).await.unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:1161");

        let explicit = Target::parse("127.0.0.1:1161").unwrap();
        let addr = explicit.resolve_with_port(9999).await.unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:1161");
    }
}
