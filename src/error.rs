//! Error taxonomy for the SNMP manager.
//!
//! A single sum type covers protocol (PDU error-status), transport, codec,
//! semantic, and breaker/router error kinds. Each kind is classified as
//! recoverable (the request engine may retry it) or terminal.

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

/// Sub-reason attached to a [`SnmpError::Decode`] failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    InvalidLength,
    InvalidTag,
    TruncatedInput,
    InvalidOid,
    InvalidInteger,
    UnexpectedEof,
    IndefiniteLength,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecodeErrorKind::InvalidLength => "invalid_length",
            DecodeErrorKind::InvalidTag => "invalid_tag",
            DecodeErrorKind::TruncatedInput => "truncated_input",
            DecodeErrorKind::InvalidOid => "invalid_oid_encoding",
            DecodeErrorKind::InvalidInteger => "invalid_integer_encoding",
            DecodeErrorKind::UnexpectedEof => "unexpected_eof",
            DecodeErrorKind::IndefiniteLength => "indefinite_length",
        };
        f.write_str(s)
    }
}

/// All error kinds this crate can surface.
///
/// Grouped per spec §4.3: protocol, transport, codec, semantic, breaker/router.
#[derive(Debug, Error, Clone)]
pub enum SnmpError {
    // ---- Protocol errors (PDU error-status, v1 and v2c) ----
    #[error("snmp error-status tooBig (index {index})")]
    TooBig { index: u32 },
    #[error("snmp error-status noSuchName (index {index})")]
    NoSuchName { index: u32 },
    #[error("snmp error-status badValue (index {index})")]
    BadValue { index: u32 },
    #[error("snmp error-status readOnly (index {index})")]
    ReadOnly { index: u32 },
    #[error("snmp error-status genErr (index {index})")]
    GenErr { index: u32 },
    #[error("snmp error-status noAccess (index {index})")]
    NoAccess { index: u32 },
    #[error("snmp error-status wrongType (index {index})")]
    WrongType { index: u32 },
    #[error("snmp error-status wrongLength (index {index})")]
    WrongLength { index: u32 },
    #[error("snmp error-status wrongEncoding (index {index})")]
    WrongEncoding { index: u32 },
    #[error("snmp error-status wrongValue (index {index})")]
    WrongValue { index: u32 },
    #[error("snmp error-status noCreation (index {index})")]
    NoCreation { index: u32 },
    #[error("snmp error-status inconsistentValue (index {index})")]
    InconsistentValue { index: u32 },
    #[error("snmp error-status resourceUnavailable (index {index})")]
    ResourceUnavailable { index: u32 },
    #[error("snmp error-status commitFailed (index {index})")]
    CommitFailed { index: u32 },
    #[error("snmp error-status undoFailed (index {index})")]
    UndoFailed { index: u32 },
    #[error("snmp error-status authorizationError (index {index})")]
    AuthorizationError { index: u32 },
    #[error("snmp error-status notWritable (index {index})")]
    NotWritable { index: u32 },
    #[error("snmp error-status inconsistentName (index {index})")]
    InconsistentName { index: u32 },

    // ---- Transport errors ----
    #[error("timed out waiting for response from {target:?}")]
    Timeout { target: Option<SocketAddr> },
    #[error("host unreachable: {target:?}")]
    HostUnreachable { target: Option<SocketAddr> },
    #[error("network unreachable: {target:?}")]
    NetworkUnreachable { target: Option<SocketAddr> },
    #[error("connection refused by {target:?}")]
    ConnectionRefused { target: Option<SocketAddr> },
    #[error("failed to send datagram to {target:?}: {reason}")]
    SendFailed {
        target: Option<SocketAddr>,
        reason: String,
    },
    #[error("failed to receive datagram from {target:?}: {reason}")]
    ReceiveFailed {
        target: Option<SocketAddr>,
        reason: String,
    },

    // ---- Codec errors ----
    #[error("decode error: {kind}")]
    Decode { kind: DecodeErrorKind },
    #[error("encoding error: {reason}")]
    Encoding { reason: String },
    #[error("invalid pdu: {reason}")]
    InvalidPdu { reason: String },

    // ---- Semantic errors ----
    #[error("invalid oid: {reason}")]
    InvalidOid { reason: String },
    #[error("invalid community string")]
    InvalidCommunity,
    #[error("GETBULK requires SNMPv2c")]
    GetBulkRequiresV2c,
    #[error("noSuchObject")]
    NoSuchObject,
    #[error("noSuchInstance")]
    NoSuchInstance,
    #[error("endOfMibView")]
    EndOfMibView,

    // ---- Breaker / router errors ----
    #[error("circuit open for target")]
    CircuitOpen,
    #[error("no healthy engine available")]
    NoHealthyEngine,
    #[error("max retries exceeded")]
    MaxRetriesExceeded,

    // ---- Resource errors (pool / queue) ----
    #[error("connection pool exhausted")]
    PoolExhausted,
    #[error("request queue full")]
    QueueFull,
    #[error("operation cancelled")]
    Cancelled,
}

impl SnmpError {
    /// Protocol error-status code as carried on the wire (v1/v2c §4.3 table).
    pub fn from_error_status(status: u32, index: u32) -> Option<SnmpError> {
        Some(match status {
            0 => return None,
            1 => SnmpError::TooBig { index },
            2 => SnmpError::NoSuchName { index },
            3 => SnmpError::BadValue { index },
            4 => SnmpError::ReadOnly { index },
            5 => SnmpError::GenErr { index },
            6 => SnmpError::NoAccess { index },
            7 => SnmpError::WrongType { index },
            8 => SnmpError::WrongLength { index },
            9 => SnmpError::WrongEncoding { index },
            10 => SnmpError::WrongValue { index },
            11 => SnmpError::NoCreation { index },
            12 => SnmpError::InconsistentValue { index },
            13 => SnmpError::ResourceUnavailable { index },
            14 => SnmpError::CommitFailed { index },
            15 => SnmpError::UndoFailed { index },
            16 => SnmpError::AuthorizationError { index },
            17 => SnmpError::NotWritable { index },
            18 => SnmpError::InconsistentName { index },
            _ => SnmpError::GenErr { index },
        })
    }

    /// Whether the request engine should retry this failure.
    ///
    /// Recoverable: timeout, tooBig, genErr, and select transport errors.
    /// Terminal: everything else (data/programmer errors, or an agent that
    /// has definitively rejected the request).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SnmpError::Timeout { .. }
                | SnmpError::TooBig { .. }
                | SnmpError::GenErr { .. }
                | SnmpError::SendFailed { .. }
                | SnmpError::ReceiveFailed { .. }
                | SnmpError::NetworkUnreachable { .. }
        )
    }
}
