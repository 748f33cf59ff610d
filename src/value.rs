//! Type system (§4.2): mapping between host values and SNMP SMI types.

use crate::error::SnmpError;
use crate::oid::Oid;

/// The full SMI value taxonomy a varbind may carry (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    OctetString(Vec<u8>),
    ObjectIdentifier(Oid),
    Null,
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    Unsigned32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    /// Exception sentinel (v2c varbind value, not an error return).
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// A value whose BER tag this codec doesn't recognize. Preserves the
    /// original tag and raw content bytes so the caller can still see the
    /// type discriminant (§4.4 failure policy).
    Unknown { tag: u8, bytes: Vec<u8> },
}

/// The explicit SMI type a caller may request, e.g. for SET (§6 `type`
/// option).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmiType {
    Integer,
    OctetString,
    ObjectIdentifier,
    Null,
    IpAddress,
    Counter32,
    Gauge32,
    Unsigned32,
    TimeTicks,
    Opaque,
    Counter64,
}

impl Value {
    /// The SMI type tag of this value, where one applies.
    pub fn smi_type(&self) -> Option<SmiType> {
        match self {
            Value::Integer(_) => Some(SmiType::Integer),
            Value::OctetString(_) => Some(SmiType::OctetString),
            Value::ObjectIdentifier(_) => Some(SmiType::ObjectIdentifier),
            Value::Null => Some(SmiType::Null),
            Value::IpAddress(_) => Some(SmiType::IpAddress),
            Value::Counter32(_) => Some(SmiType::Counter32),
            Value::Gauge32(_) => Some(SmiType::Gauge32),
            Value::Unsigned32(_) => Some(SmiType::Unsigned32),
            Value::TimeTicks(_) => Some(SmiType::TimeTicks),
            Value::Opaque(_) => Some(SmiType::Opaque),
            Value::Counter64(_) => Some(SmiType::Counter64),
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView | Value::Unknown { .. } => {
                None
            }
        }
    }

    /// Canonical host-facing text representation, per the §6 decoding table.
    pub fn display_text(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::OctetString(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) if s.chars().all(|c| !c.is_control() || c == '\t') => s.to_string(),
                _ => format!("0x{}", hex_encode(bytes)),
            },
            Value::ObjectIdentifier(oid) => oid.to_string(),
            Value::Null => String::new(),
            Value::IpAddress(octets) => {
                format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
            }
            Value::Counter32(v) | Value::Gauge32(v) | Value::Unsigned32(v) | Value::TimeTicks(v) => {
                v.to_string()
            }
            Value::Opaque(bytes) => format!("0x{}", hex_encode(bytes)),
            Value::Counter64(v) => v.to_string(),
            Value::NoSuchObject => "noSuchObject".to_string(),
            Value::NoSuchInstance => "noSuchInstance".to_string(),
            Value::EndOfMibView => "endOfMibView".to_string(),
            Value::Unknown { tag, bytes } => format!("0x{tag:02x}:0x{}", hex_encode(bytes)),
        }
    }

    /// Human-readable formatter for `TimeTicks` (hundredths of a second),
    /// ported from the teacher's `util::format_uptime`.
    pub fn format_timeticks(&self) -> Option<String> {
        let ticks = match self {
            Value::TimeTicks(v) => *v as i64,
            _ => return None,
        };
        let seconds = ticks / 100;
        let days = seconds / 86400;
        let hours = (seconds % 86400) / 3600;
        let minutes = (seconds % 3600) / 60;
        let secs = seconds % 60;
        Some(if days > 0 {
            format!(
                "{} day{} {:02}:{:02}:{:02}",
                days,
                if days != 1 { "s" } else { "" },
                hours,
                minutes,
                secs
            )
        } else {
            format!("{hours:02}:{minutes:02}:{secs:02}")
        })
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A loosely-typed host value, the input to [`infer`] and [`coerce`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Text(String),
    Integer(i64),
    Oid(Vec<u32>),
    Bytes(Vec<u8>),
    Unit,
}

/// Infer a default SMI type from a host value (§4.2).
pub fn infer(hv: &HostValue) -> Value {
    match hv {
        HostValue::Text(s) => Value::OctetString(s.as_bytes().to_vec()),
        HostValue::Integer(i) if *i >= 0 => Value::Unsigned32(*i as u32),
        HostValue::Integer(i) => Value::Integer(*i as i32),
        HostValue::Oid(components) => Value::ObjectIdentifier(Oid::from_components(components.clone())),
        HostValue::Unit => Value::Null,
        HostValue::Bytes(b) => Value::Opaque(b.clone()),
    }
}

/// Coerce a host value to an explicit SMI type, validating along the way.
pub fn coerce(hv: &HostValue, ty: SmiType) -> Result<Value, SnmpError> {
    match ty {
        SmiType::Integer => as_i64(hv).and_then(|i| {
            i32::try_from(i)
                .map(Value::Integer)
                .map_err(|_| encoding_err("INTEGER out of i32 range"))
        }),
        SmiType::OctetString => Ok(Value::OctetString(as_bytes(hv))),
        SmiType::ObjectIdentifier => match hv {
            HostValue::Oid(c) => Ok(Value::ObjectIdentifier(Oid::from_components(c.clone()))),
            HostValue::Text(s) => Ok(Value::ObjectIdentifier(Oid::parse(s)?)),
            _ => Err(encoding_err("expected OID-shaped value")),
        },
        SmiType::Null => Ok(Value::Null),
        SmiType::IpAddress => as_ipv4(hv).map(Value::IpAddress),
        SmiType::Counter32 => as_u32(hv).map(Value::Counter32),
        SmiType::Gauge32 => as_u32(hv).map(Value::Gauge32),
        SmiType::Unsigned32 => as_u32(hv).map(Value::Unsigned32),
        SmiType::TimeTicks => as_u32(hv).map(Value::TimeTicks),
        SmiType::Opaque => Ok(Value::Opaque(as_bytes(hv))),
        SmiType::Counter64 => as_i64(hv).and_then(|i| {
            u64::try_from(i).map(Value::Counter64).map_err(|_| encoding_err("Counter64 requires non-negative value"))
        }),
    }
}

fn encoding_err(msg: &str) -> SnmpError {
    SnmpError::Encoding {
        reason: msg.to_string(),
    }
}

fn as_i64(hv: &HostValue) -> Result<i64, SnmpError> {
    match hv {
        HostValue::Integer(i) => Ok(*i),
        HostValue::Text(s) => s.parse().map_err(|_| encoding_err("not an integer")),
        _ => Err(encoding_err("expected integer-shaped value")),
    }
}

fn as_u32(hv: &HostValue) -> Result<u32, SnmpError> {
    let i = as_i64(hv)?;
    u32::try_from(i).map_err(|_| encoding_err("value out of u32 range [0, 2^32-1]"))
}

fn as_bytes(hv: &HostValue) -> Vec<u8> {
    match hv {
        HostValue::Text(s) => s.as_bytes().to_vec(),
        HostValue::Bytes(b) => b.clone(),
        HostValue::Integer(i) => i.to_string().into_bytes(),
        HostValue::Oid(c) => Oid::from_components(c.clone()).to_string().into_bytes(),
        HostValue::Unit => Vec::new(),
    }
}

fn as_ipv4(hv: &HostValue) -> Result<[u8; 4], SnmpError> {
    match hv {
        HostValue::Text(s) => {
            let octets: Vec<&str> = s.split('.').collect();
            if octets.len() != 4 {
                return Err(encoding_err("IpAddress requires a dotted quad"));
            }
            let mut out = [0u8; 4];
            for (i, part) in octets.iter().enumerate() {
                out[i] = part.parse().map_err(|_| encoding_err("invalid octet in IpAddress"))?;
            }
            Ok(out)
        }
        HostValue::Bytes(b) if b.len() == 4 => Ok([b[0], b[1], b[2], b[3]]),
        _ => Err(encoding_err("IpAddress requires a dotted-quad string or 4 bytes")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_string_is_octet_string() {
        assert_eq!(
            infer(&HostValue::Text("hello".into())),
            Value::OctetString(b"hello".to_vec())
        );
    }

    #[test]
    fn infer_negative_integer_is_integer() {
        assert_eq!(infer(&HostValue::Integer(-5)), Value::Integer(-5));
    }

    #[test]
    fn infer_nonneg_integer_is_unsigned32() {
        assert_eq!(infer(&HostValue::Integer(42)), Value::Unsigned32(42));
    }

    #[test]
    fn infer_oid_shaped_is_object_identifier() {
        assert_eq!(
            infer(&HostValue::Oid(vec![1, 3, 6, 1])),
            Value::ObjectIdentifier(Oid::from_components(vec![1, 3, 6, 1]))
        );
    }

    #[test]
    fn coerce_ipaddress_requires_dotted_quad() {
        let v = coerce(&HostValue::Text("192.168.1.1".into()), SmiType::IpAddress).unwrap();
        assert_eq!(v, Value::IpAddress([192, 168, 1, 1]));
        assert!(coerce(&HostValue::Text("not-an-ip".into()), SmiType::IpAddress).is_err());
    }

    #[test]
    fn coerce_counter32_rejects_out_of_range() {
        assert!(coerce(&HostValue::Integer(-1), SmiType::Counter32).is_err());
        assert!(coerce(&HostValue::Integer(4294967295), SmiType::Counter32).is_ok());
    }

    #[test]
    fn display_text_ipaddress() {
        assert_eq!(Value::IpAddress([10, 0, 0, 1]).display_text(), "10.0.0.1");
    }

    #[test]
    fn format_timeticks_human_readable() {
        let v = Value::TimeTicks(8640150); // just over 1 day
        assert!(v.format_timeticks().unwrap().starts_with("1 day"));
    }
}
