//! BER primitives (§4.4): tag/length/value encoding and decoding.
//!
//! Encoding builds content first, then prefixes tag and length — the usual
//! shape for BER, since lengths aren't known until the inner content exists.
//! Decoding is a simple cursor over a borrowed byte slice; every read either
//! advances the cursor or returns a [`SnmpError::Decode`] without touching it.

use crate::error::{DecodeErrorKind, SnmpError};

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OBJECT_IDENTIFIER: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;

pub const TAG_IP_ADDRESS: u8 = 0x40;
pub const TAG_COUNTER32: u8 = 0x41;
pub const TAG_GAUGE32: u8 = 0x42;
pub const TAG_TIME_TICKS: u8 = 0x43;
pub const TAG_OPAQUE: u8 = 0x44;
pub const TAG_COUNTER64: u8 = 0x46;

pub const TAG_NO_SUCH_OBJECT: u8 = 0x80;
pub const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
pub const TAG_END_OF_MIB_VIEW: u8 = 0x82;

pub const TAG_GET_REQUEST: u8 = 0xA0;
pub const TAG_GET_NEXT_REQUEST: u8 = 0xA1;
pub const TAG_GET_RESPONSE: u8 = 0xA2;
pub const TAG_SET_REQUEST: u8 = 0xA3;
pub const TAG_GET_BULK_REQUEST: u8 = 0xA5;
pub const TAG_INFORM_REQUEST: u8 = 0xA6;
pub const TAG_SNMPV2_TRAP: u8 = 0xA7;
pub const TAG_REPORT: u8 = 0xA8;

/// Encode `tag || length || content` for a primitive or constructed value.
pub fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag);
    out.extend_from_slice(&encode_length(content.len()));
    out.extend_from_slice(content);
    out
}

/// Definite-form length: short form under 128, long form otherwise.
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        vec![len as u8]
    } else {
        let bytes = len.to_be_bytes();
        let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
        let significant = &bytes[first_nonzero..];
        let mut out = Vec::with_capacity(significant.len() + 1);
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(significant);
        out
    }
}

/// Minimal two's-complement big-endian encoding, as BER INTEGER requires.
pub fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let byte = bytes[start];
        let next = bytes[start + 1];
        let all_ones_ok = byte == 0xff && (next & 0x80) != 0;
        let all_zeros_ok = byte == 0x00 && (next & 0x80) == 0;
        if all_ones_ok || all_zeros_ok {
            start += 1;
        } else {
            break;
        }
    }
    bytes[start..].to_vec()
}

/// Unsigned integer encoding (Counter32/Gauge32/TimeTicks/Counter64): same
/// minimal-form rule but a leading 0x00 pad byte is inserted when the
/// high bit of the first significant byte would otherwise read as negative.
pub fn encode_unsigned(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    let mut content = bytes[first_nonzero..].to_vec();
    if content[0] & 0x80 != 0 {
        content.insert(0, 0x00);
    }
    content
}

/// Base-128 OID content encoding: first two arcs merge as `first*40+second`.
pub fn encode_oid(components: &[u32]) -> Vec<u8> {
    if components.is_empty() {
        return Vec::new();
    }
    let first = components[0];
    let second = components.get(1).copied().unwrap_or(0);
    let mut out = Vec::new();
    push_base128(&mut out, first * 40 + second);
    for &c in &components[2.min(components.len())..] {
        push_base128(&mut out, c);
    }
    out
}

fn push_base128(out: &mut Vec<u8>, mut value: u32) {
    let mut stack = vec![(value & 0x7f) as u8];
    value >>= 7;
    while value > 0 {
        stack.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
    out.extend(stack.into_iter().rev());
}

/// A forward-reading cursor over borrowed BER-encoded bytes.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Decoder<'a> {
        Decoder { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn eof() -> SnmpError {
        SnmpError::Decode {
            kind: DecodeErrorKind::UnexpectedEof,
        }
    }

    fn read_byte(&mut self) -> Result<u8, SnmpError> {
        let b = *self.buf.get(self.pos).ok_or_else(Self::eof)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_length(&mut self) -> Result<usize, SnmpError> {
        let first = self.read_byte()?;
        if first & 0x80 == 0 {
            return Ok(first as usize);
        }
        let count = (first & 0x7f) as usize;
        if count == 0 {
            return Err(SnmpError::Decode {
                kind: DecodeErrorKind::IndefiniteLength,
            });
        }
        if count > 8 {
            return Err(SnmpError::Decode {
                kind: DecodeErrorKind::InvalidLength,
            });
        }
        let mut len: usize = 0;
        for _ in 0..count {
            len = (len << 8) | self.read_byte()? as usize;
        }
        Ok(len)
    }

    /// Read a tag/length/content triple, returning the tag and a borrowed
    /// content slice. Does not interpret the content.
    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8]), SnmpError> {
        let tag = self.read_byte()?;
        let len = self.read_length()?;
        let start = self.pos;
        let end = start.checked_add(len).ok_or_else(|| SnmpError::Decode {
            kind: DecodeErrorKind::InvalidLength,
        })?;
        if end > self.buf.len() {
            return Err(SnmpError::Decode {
                kind: DecodeErrorKind::TruncatedInput,
            });
        }
        self.pos = end;
        Ok((tag, &self.buf[start..end]))
    }

    /// Read a TLV and assert its tag matches `expected`.
    pub fn read_tagged(&mut self, expected: u8) -> Result<&'a [u8], SnmpError> {
        let (tag, content) = self.read_tlv()?;
        if tag != expected {
            return Err(SnmpError::Decode {
                kind: DecodeErrorKind::InvalidTag,
            });
        }
        Ok(content)
    }

    /// A decoder scoped to the content of a SEQUENCE (or any constructed TLV).
    pub fn read_sequence(&mut self) -> Result<Decoder<'a>, SnmpError> {
        let content = self.read_tagged(TAG_SEQUENCE)?;
        Ok(Decoder::new(content))
    }
}

/// Decode a two's-complement big-endian INTEGER body.
pub fn decode_integer(bytes: &[u8]) -> Result<i64, SnmpError> {
    if bytes.is_empty() {
        return Err(SnmpError::Decode {
            kind: DecodeErrorKind::InvalidInteger,
        });
    }
    if bytes.len() > 8 {
        return Err(SnmpError::Decode {
            kind: DecodeErrorKind::InvalidInteger,
        });
    }
    let negative = bytes[0] & 0x80 != 0;
    let mut buf = [if negative { 0xff } else { 0x00 }; 8];
    let offset = 8 - bytes.len();
    buf[offset..].copy_from_slice(bytes);
    Ok(i64::from_be_bytes(buf))
}

/// Decode an unsigned big-endian body (Counter32/Gauge32/TimeTicks/Counter64).
pub fn decode_unsigned(bytes: &[u8]) -> Result<u64, SnmpError> {
    if bytes.is_empty() || bytes.len() > 9 {
        return Err(SnmpError::Decode {
            kind: DecodeErrorKind::InvalidInteger,
        });
    }
    let mut buf = [0u8; 8];
    let trimmed = if bytes.len() == 9 { &bytes[1..] } else { bytes };
    let offset = 8 - trimmed.len();
    buf[offset..].copy_from_slice(trimmed);
    Ok(u64::from_be_bytes(buf))
}

/// Decode an OID content body into sub-identifiers.
pub fn decode_oid(bytes: &[u8]) -> Result<Vec<u32>, SnmpError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut components = Vec::new();
    let mut value: u64 = 0;
    let mut first = true;
    for &b in bytes {
        value = (value << 7) | (b & 0x7f) as u64;
        if b & 0x80 == 0 {
            if first {
                let v = value as u32;
                // Standard first-arc split: the first two arcs are packed as
                // first*40+second, but only arcs 0/1 ever have a second arc
                // below 40 — arc 2 absorbs everything else, so the inverse
                // is a threshold split, not a plain div/mod.
                let (arc0, arc1) = if v < 40 {
                    (0, v)
                } else if v < 80 {
                    (1, v - 40)
                } else {
                    (2, v - 80)
                };
                components.push(arc0);
                components.push(arc1);
                first = false;
            } else {
                components.push(u32::try_from(value).map_err(|_| SnmpError::Decode {
                    kind: DecodeErrorKind::InvalidOid,
                })?);
            }
            value = 0;
        }
    }
    if value != 0 {
        return Err(SnmpError::Decode {
            kind: DecodeErrorKind::InvalidOid,
        });
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_short_and_long_form() {
        assert_eq!(encode_length(5), vec![0x05]);
        assert_eq!(encode_length(128), vec![0x81, 0x80]);
        assert_eq!(encode_length(300), vec![0x82, 0x01, 0x2c]);
    }

    #[test]
    fn integer_roundtrip_minimal_form() {
        for v in [0i64, 1, -1, 127, 128, -128, -129, 255, 65535, i64::MIN, i64::MAX] {
            let enc = encode_integer(v);
            assert_eq!(decode_integer(&enc).unwrap(), v, "value {v}");
        }
    }

    #[test]
    fn unsigned_pads_high_bit() {
        let enc = encode_unsigned(0xff);
        assert_eq!(enc, vec![0x00, 0xff]);
        assert_eq!(decode_unsigned(&enc).unwrap(), 0xff);
    }

    #[test]
    fn oid_roundtrip() {
        let components = vec![1, 3, 6, 1, 2, 1, 1, 1, 0];
        let enc = encode_oid(&components);
        assert_eq!(decode_oid(&enc).unwrap(), components);
    }

    #[test]
    fn oid_single_component_root() {
        let enc = encode_oid(&[2]);
        assert_eq!(decode_oid(&enc).unwrap(), vec![2, 0]);
    }

    #[test]
    fn oid_roundtrip_second_arc_above_40_under_first_arc_2() {
        let components = vec![2, 100, 1];
        let enc = encode_oid(&components);
        assert_eq!(decode_oid(&enc).unwrap(), components);
    }

    #[test]
    fn decoder_reads_nested_sequence() {
        let inner = encode_tlv(TAG_INTEGER, &encode_integer(42));
        let outer = encode_tlv(TAG_SEQUENCE, &inner);
        let mut dec = Decoder::new(&outer);
        let mut seq = dec.read_sequence().unwrap();
        let content = seq.read_tagged(TAG_INTEGER).unwrap();
        assert_eq!(decode_integer(content).unwrap(), 42);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let mut dec = Decoder::new(&[TAG_INTEGER, 0x05, 0x01]);
        assert!(dec.read_tlv().is_err());
    }
}
