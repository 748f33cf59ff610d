//! Message envelope (§4.4): SNMP version + community string + PDU.

use crate::codec::ber::{self, decode_integer, encode_integer, Decoder, TAG_INTEGER, TAG_OCTET_STRING, TAG_SEQUENCE};
use crate::codec::pdu::Pdu;
use crate::error::{DecodeErrorKind, SnmpError};

/// Protocol version carried in the message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1,
    V2c,
}

impl Version {
    fn wire_value(self) -> i64 {
        match self {
            Version::V1 => 0,
            Version::V2c => 1,
        }
    }

    fn from_wire(v: i64) -> Result<Version, SnmpError> {
        match v {
            0 => Ok(Version::V1),
            1 => Ok(Version::V2c),
            _ => Err(SnmpError::InvalidPdu {
                reason: format!("unsupported snmp version {v}"),
            }),
        }
    }
}

/// The full on-the-wire message: version, community, PDU.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub version: Version,
    pub community: Vec<u8>,
    pub pdu: Pdu,
}

impl Message {
    pub fn new(version: Version, community: impl Into<Vec<u8>>, pdu: Pdu) -> Message {
        Message {
            version,
            community: community.into(),
            pdu,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut content = ber::encode_tlv(TAG_INTEGER, &encode_integer(self.version.wire_value()));
        content.extend_from_slice(&ber::encode_tlv(TAG_OCTET_STRING, &self.community));
        content.extend_from_slice(&self.pdu.encode());
        ber::encode_tlv(TAG_SEQUENCE, &content)
    }

    pub fn decode(bytes: &[u8]) -> Result<Message, SnmpError> {
        let mut dec = Decoder::new(bytes);
        let mut body = dec.read_sequence()?;
        let version = Version::from_wire(decode_integer(body.read_tagged(TAG_INTEGER)?)?)?;
        let community = body.read_tagged(TAG_OCTET_STRING)?.to_vec();
        let pdu = Pdu::decode(&mut body)?;
        if !dec.is_empty() {
            return Err(SnmpError::Decode {
                kind: DecodeErrorKind::InvalidLength,
            });
        }
        Ok(Message {
            version,
            community,
            pdu,
        })
    }

    /// Verify the response's request-id and community match the request
    /// that was sent, per §4.4's correlation invariant.
    pub fn validate_response(&self, request: &Message) -> Result<(), SnmpError> {
        self.validate_response_for_ids(&[request.pdu.request_id], &request.community)
    }

    /// Verify the response's request-id is one of `ids` (every id sent so
    /// far across a retry sequence, not just the most recent one — §4.8
    /// permits request-id rotation on retry only if a response matching any
    /// prior attempt still completes the call) and its community matches.
    pub fn validate_response_for_ids(&self, ids: &[i32], community: &[u8]) -> Result<(), SnmpError> {
        if !ids.contains(&self.pdu.request_id) {
            return Err(SnmpError::InvalidPdu {
                reason: "response request-id does not match any outstanding request".into(),
            });
        }
        if self.community != community {
            return Err(SnmpError::InvalidCommunity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::pdu::PduKind;
    use crate::codec::pdu::Varbind;
    use crate::oid::Oid;
    use crate::value::Value;

    fn sample_pdu(request_id: i32) -> Pdu {
        Pdu::request(
            PduKind::GetRequest,
            request_id,
            vec![Varbind::new(Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(), Value::Null)],
        )
    }

    #[test]
    fn message_roundtrip_v1() {
        let msg = Message::new(Version::V1, "public", sample_pdu(7));
        let bytes = msg.encode();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn message_roundtrip_v2c() {
        let msg = Message::new(Version::V2c, "private", sample_pdu(7));
        let bytes = msg.encode();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn validate_response_checks_request_id_and_community() {
        let req = Message::new(Version::V2c, "public", sample_pdu(1));
        let mut resp = Message::new(Version::V2c, "public", sample_pdu(1));
        resp.pdu.kind = PduKind::GetResponse;
        assert!(resp.validate_response(&req).is_ok());

        let mut mismatched = resp.clone();
        mismatched.pdu.request_id = 2;
        assert!(mismatched.validate_response(&req).is_err());

        let mut wrong_community = resp.clone();
        wrong_community.community = b"other".to_vec();
        assert!(wrong_community.validate_response(&req).is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = Message::new(Version::V1, "public", sample_pdu(1)).encode();
        // Corrupt the encoded version value directly via a known-offset search.
        let pos = bytes.iter().position(|&b| b == TAG_INTEGER).unwrap();
        bytes[pos + 2] = 5;
        assert!(Message::decode(&bytes).is_err());
    }
}
