//! UDP transport (§4.6): open/close endpoints, send/receive datagrams.
//!
//! Grounded on the teacher's `snmp/client.rs::send_receive`, replacing its
//! blocking `std::net::UdpSocket` + `set_read_timeout` pair with
//! `tokio::net::UdpSocket` + `tokio::time::timeout`, since everything above
//! this layer is async.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::SnmpError;

/// A single UDP endpoint. Created bound to an ephemeral local port unless a
/// caller asks for a specific one.
pub struct Transport {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl Transport {
    /// Bind a new endpoint on an ephemeral port.
    pub async fn bind_ephemeral() -> Result<Transport, SnmpError> {
        Self::bind("0.0.0.0:0").await
    }

    /// Bind a new endpoint to a specific local address.
    pub async fn bind(local: &str) -> Result<Transport, SnmpError> {
        let socket = UdpSocket::bind(local).await.map_err(|e| SnmpError::SendFailed {
            target: None,
            reason: format!("bind failed: {e}"),
        })?;
        let local_addr = socket.local_addr().map_err(|e| SnmpError::SendFailed {
            target: None,
            reason: format!("local_addr failed: {e}"),
        })?;
        Ok(Transport { socket, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send a datagram to `target`. `target.port()` must be nonzero and in
    /// range; `SocketAddr` already enforces the 0..=65535 range at parse time.
    pub async fn send_to(&self, target: SocketAddr, bytes: &[u8]) -> Result<(), SnmpError> {
        self.socket
            .send_to(bytes, target)
            .await
            .map(|_| ())
            .map_err(|e| classify_send_error(target, e))
    }

    /// Receive one datagram, bounded by `timeout`.
    pub async fn recv(&self, timeout: Duration) -> Result<(SocketAddr, Vec<u8>), SnmpError> {
        let mut buf = vec![0u8; 65_535];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Err(_) => Err(SnmpError::Timeout { target: None }),
            Ok(Err(e)) => Err(SnmpError::ReceiveFailed {
                target: None,
                reason: e.to_string(),
            }),
            Ok(Ok((len, from))) => {
                buf.truncate(len);
                Ok((from, buf))
            }
        }
    }
}

fn classify_send_error(target: SocketAddr, e: std::io::Error) -> SnmpError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::ConnectionRefused => SnmpError::ConnectionRefused {
            target: Some(target),
        },
        ErrorKind::NotFound | ErrorKind::AddrNotAvailable => SnmpError::HostUnreachable {
            target: Some(target),
        },
        _ => SnmpError::SendFailed {
            target: Some(target),
            reason: e.to_string(),
        },
    }
}

/// Parse a textual SNMP target into a `(host, port, explicit)` triple (§3).
/// Accepted surface forms: `"host"`, `"host:port"`, `"ipv4"`, `"ipv4:port"`.
/// `explicit` is `false` when `text` carried no port and `default_port` was
/// substituted, so callers can tell a caller-supplied port apart from a
/// filled-in default (see [`crate::target::Target::resolve_with_port`]). The
/// host half is not resolved here — see [`crate::target::Target::resolve`].
pub fn split_host_port(text: &str, default_port: u16) -> Result<(String, u16, bool), SnmpError> {
    if let Some((host, port)) = text.rsplit_once(':') {
        if !host.is_empty() {
            let port: u16 = port.parse().map_err(|_| SnmpError::SendFailed {
                target: None,
                reason: format!("invalid port in target {text:?}"),
            })?;
            return Ok((host.to_string(), port, true));
        }
    }
    Ok((text.to_string(), default_port, false))
}
