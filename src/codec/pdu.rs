//! PDU structures and their BER encoding (§4.4).
//!
//! GetBulkRequest reuses the error-status/error-index wire slots for
//! non-repeaters/max-repetitions, per RFC 1905 — the two pairs are never both
//! meaningful on the same PDU, so [`Pdu`] carries a single `kind` tag that
//! picks which interpretation applies.

use crate::codec::ber::{
    self, decode_integer, decode_oid, decode_unsigned, encode_integer, encode_oid,
    encode_unsigned, Decoder, TAG_COUNTER32, TAG_COUNTER64, TAG_END_OF_MIB_VIEW,
    TAG_GAUGE32, TAG_GET_BULK_REQUEST, TAG_GET_NEXT_REQUEST, TAG_GET_REQUEST,
    TAG_GET_RESPONSE, TAG_INTEGER, TAG_IP_ADDRESS, TAG_NO_SUCH_INSTANCE, TAG_NO_SUCH_OBJECT,
    TAG_NULL, TAG_OBJECT_IDENTIFIER, TAG_OCTET_STRING, TAG_OPAQUE, TAG_SEQUENCE,
    TAG_SET_REQUEST, TAG_TIME_TICKS,
};
use crate::error::{DecodeErrorKind, SnmpError};
use crate::oid::Oid;
use crate::value::Value;

/// A single OID/value pair as it travels on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Varbind {
    pub oid: Oid,
    pub value: Value,
}

impl Varbind {
    pub fn new(oid: Oid, value: Value) -> Varbind {
        Varbind { oid, value }
    }

    fn encode(&self) -> Vec<u8> {
        let oid_tlv = ber::encode_tlv(TAG_OBJECT_IDENTIFIER, &encode_oid(self.oid.as_slice()));
        let value_tlv = encode_value(&self.value);
        let mut content = oid_tlv;
        content.extend_from_slice(&value_tlv);
        ber::encode_tlv(TAG_SEQUENCE, &content)
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Varbind, SnmpError> {
        let mut vb = dec.read_sequence()?;
        let oid_bytes = vb.read_tagged(TAG_OBJECT_IDENTIFIER)?;
        let oid = Oid::from_components(decode_oid(oid_bytes)?);
        let (tag, content) = vb.read_tlv()?;
        let value = decode_value(tag, content)?;
        Ok(Varbind { oid, value })
    }
}

fn encode_value(value: &Value) -> Vec<u8> {
    match value {
        Value::Integer(i) => ber::encode_tlv(TAG_INTEGER, &encode_integer(*i as i64)),
        Value::OctetString(b) => ber::encode_tlv(TAG_OCTET_STRING, b),
        Value::ObjectIdentifier(oid) => {
            ber::encode_tlv(TAG_OBJECT_IDENTIFIER, &encode_oid(oid.as_slice()))
        }
        Value::Null => ber::encode_tlv(TAG_NULL, &[]),
        Value::IpAddress(octets) => ber::encode_tlv(TAG_IP_ADDRESS, octets),
        Value::Counter32(v) => ber::encode_tlv(TAG_COUNTER32, &encode_unsigned(*v as u64)),
        Value::Gauge32(v) | Value::Unsigned32(v) => {
            ber::encode_tlv(TAG_GAUGE32, &encode_unsigned(*v as u64))
        }
        Value::TimeTicks(v) => ber::encode_tlv(TAG_TIME_TICKS, &encode_unsigned(*v as u64)),
        Value::Opaque(b) => ber::encode_tlv(TAG_OPAQUE, b),
        Value::Counter64(v) => ber::encode_tlv(TAG_COUNTER64, &encode_unsigned(*v)),
        Value::NoSuchObject => ber::encode_tlv(TAG_NO_SUCH_OBJECT, &[]),
        Value::NoSuchInstance => ber::encode_tlv(TAG_NO_SUCH_INSTANCE, &[]),
        Value::EndOfMibView => ber::encode_tlv(TAG_END_OF_MIB_VIEW, &[]),
        Value::Unknown { tag, bytes } => ber::encode_tlv(*tag, bytes),
    }
}

fn decode_value(tag: u8, content: &[u8]) -> Result<Value, SnmpError> {
    Ok(match tag {
        TAG_INTEGER => Value::Integer(decode_integer(content)? as i32),
        TAG_OCTET_STRING => Value::OctetString(content.to_vec()),
        TAG_OBJECT_IDENTIFIER => Value::ObjectIdentifier(Oid::from_components(decode_oid(content)?)),
        TAG_NULL => Value::Null,
        TAG_IP_ADDRESS => {
            if content.len() != 4 {
                return Err(SnmpError::Decode {
                    kind: DecodeErrorKind::InvalidLength,
                });
            }
            Value::IpAddress([content[0], content[1], content[2], content[3]])
        }
        TAG_COUNTER32 => Value::Counter32(decode_unsigned(content)? as u32),
        TAG_GAUGE32 => Value::Gauge32(decode_unsigned(content)? as u32),
        TAG_TIME_TICKS => Value::TimeTicks(decode_unsigned(content)? as u32),
        TAG_OPAQUE => Value::Opaque(content.to_vec()),
        TAG_COUNTER64 => Value::Counter64(decode_unsigned(content)?),
        TAG_NO_SUCH_OBJECT => Value::NoSuchObject,
        TAG_NO_SUCH_INSTANCE => Value::NoSuchInstance,
        TAG_END_OF_MIB_VIEW => Value::EndOfMibView,
        other => Value::Unknown {
            tag: other,
            bytes: content.to_vec(),
        },
    })
}

/// Which request/response shape a [`Pdu`] carries. Distinguishes the wire tag
/// and which interpretation the error-status/index slots get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduKind {
    GetRequest,
    GetNextRequest,
    GetResponse,
    SetRequest,
    GetBulkRequest,
}

impl PduKind {
    fn tag(self) -> u8 {
        match self {
            PduKind::GetRequest => TAG_GET_REQUEST,
            PduKind::GetNextRequest => TAG_GET_NEXT_REQUEST,
            PduKind::GetResponse => TAG_GET_RESPONSE,
            PduKind::SetRequest => TAG_SET_REQUEST,
            PduKind::GetBulkRequest => TAG_GET_BULK_REQUEST,
        }
    }

    fn from_tag(tag: u8) -> Result<PduKind, SnmpError> {
        Ok(match tag {
            TAG_GET_REQUEST => PduKind::GetRequest,
            TAG_GET_NEXT_REQUEST => PduKind::GetNextRequest,
            TAG_GET_RESPONSE => PduKind::GetResponse,
            TAG_SET_REQUEST => PduKind::SetRequest,
            TAG_GET_BULK_REQUEST => PduKind::GetBulkRequest,
            _ => {
                return Err(SnmpError::InvalidPdu {
                    reason: format!("unrecognized pdu tag 0x{tag:02x}"),
                })
            }
        })
    }
}

/// A decoded or to-be-encoded PDU body (without the enclosing message
/// version/community envelope — see [`crate::codec::message`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub kind: PduKind,
    pub request_id: i32,
    /// error-status on GetResponse; non-repeaters on GetBulkRequest; unused
    /// (encoded as 0) otherwise.
    pub error_status: u32,
    /// error-index on GetResponse; max-repetitions on GetBulkRequest; unused
    /// (encoded as 0) otherwise.
    pub error_index: u32,
    pub varbinds: Vec<Varbind>,
}

impl Pdu {
    pub fn request(kind: PduKind, request_id: i32, varbinds: Vec<Varbind>) -> Pdu {
        Pdu {
            kind,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    pub fn get_bulk(request_id: i32, non_repeaters: u32, max_repetitions: u32, varbinds: Vec<Varbind>) -> Pdu {
        Pdu {
            kind: PduKind::GetBulkRequest,
            request_id,
            error_status: non_repeaters,
            error_index: max_repetitions,
            varbinds,
        }
    }

    pub fn non_repeaters(&self) -> u32 {
        self.error_status
    }

    pub fn max_repetitions(&self) -> u32 {
        self.error_index
    }

    /// The PDU error-status as an [`SnmpError`], or `None` on noError (0).
    pub fn error(&self) -> Option<SnmpError> {
        if self.kind != PduKind::GetResponse {
            return None;
        }
        SnmpError::from_error_status(self.error_status, self.error_index)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut content = ber::encode_tlv(TAG_INTEGER, &encode_integer(self.request_id as i64));
        content.extend_from_slice(&ber::encode_tlv(
            TAG_INTEGER,
            &encode_integer(self.error_status as i64),
        ));
        content.extend_from_slice(&ber::encode_tlv(
            TAG_INTEGER,
            &encode_integer(self.error_index as i64),
        ));
        let mut vb_content = Vec::new();
        for vb in &self.varbinds {
            vb_content.extend_from_slice(&vb.encode());
        }
        content.extend_from_slice(&ber::encode_tlv(TAG_SEQUENCE, &vb_content));
        ber::encode_tlv(self.kind.tag(), &content)
    }

    pub fn decode(dec: &mut Decoder<'_>) -> Result<Pdu, SnmpError> {
        let (tag, content) = dec.read_tlv()?;
        let kind = PduKind::from_tag(tag)?;
        let mut body = Decoder::new(content);
        let request_id = decode_integer(body.read_tagged(TAG_INTEGER)?)? as i32;
        let error_status = decode_integer(body.read_tagged(TAG_INTEGER)?)? as u32;
        let error_index = decode_integer(body.read_tagged(TAG_INTEGER)?)? as u32;
        let mut vb_seq = body.read_sequence()?;
        let mut varbinds = Vec::new();
        while !vb_seq.is_empty() {
            varbinds.push(Varbind::decode(&mut vb_seq)?);
        }
        Ok(Pdu {
            kind,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }
}
