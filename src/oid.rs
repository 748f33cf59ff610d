//! OID service (§4.1): parse, validate, compare, and manipulate OIDs.

use std::fmt;

use crate::error::SnmpError;
use crate::registry::NameRegistry;

/// An immutable, ordered sequence of unsigned sub-identifiers.
///
/// `Ord`/`PartialOrd` are derived from the wrapped `Vec<u32>`, which already
/// gives lexicographic comparison with the shorter-but-equal-prefix sequence
/// sorting first — exactly the ordering spec §3 requires (P2).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(Vec<u32>);

impl Oid {
    /// Build an OID from raw sub-identifiers without the textual-parse
    /// validation in [`Oid::parse`] (used internally by the codec and table
    /// service, which build OIDs component-by-component).
    pub fn from_components(components: Vec<u32>) -> Oid {
        Oid(components)
    }

    /// Parse dot-separated numeric text (`"1.3.6.1.2.1.1.1.0"`).
    ///
    /// Fails with `invalid_oid` on a non-digit component, `u32` overflow, or
    /// a leading component greater than 2 when a second component is present.
    pub fn parse(text: &str) -> Result<Oid, SnmpError> {
        let text = text.trim().trim_start_matches('.');
        if text.is_empty() {
            return Err(SnmpError::InvalidOid {
                reason: "empty oid".into(),
            });
        }
        let mut components = Vec::new();
        for part in text.split('.') {
            let v: u32 = part.parse().map_err(|_| SnmpError::InvalidOid {
                reason: format!("non-numeric component: {part:?}"),
            })?;
            components.push(v);
        }
        let oid = Oid(components);
        oid.validate()?;
        Ok(oid)
    }

    /// Resolve a surface form that may be symbolic (`"sysDescr.0"`) or purely
    /// numeric (`"1.3.6.1.2.1.1.1.0"`) against a name registry.
    pub fn resolve(text: &str, registry: &NameRegistry) -> Result<Oid, SnmpError> {
        if text
            .chars()
            .next()
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
        {
            return Oid::parse(text);
        }
        let mut parts = text.splitn(2, '.');
        let name = parts.next().unwrap();
        let suffix = parts.next();
        let base = registry.resolve(name).ok_or_else(|| SnmpError::InvalidOid {
            reason: format!("unknown symbolic name: {name}"),
        })?;
        match suffix {
            None => Ok(base),
            Some(rest) => {
                let mut components = base.0.clone();
                for part in rest.split('.') {
                    let v: u32 = part.parse().map_err(|_| SnmpError::InvalidOid {
                        reason: format!("non-numeric suffix component: {part:?}"),
                    })?;
                    components.push(v);
                }
                Ok(Oid(components))
            }
        }
    }

    /// Validate non-emptiness and the conventional first/second-component
    /// constraint (first in {0,1,2}; second in [0,39] when first < 2).
    pub fn validate(&self) -> Result<(), SnmpError> {
        if self.0.is_empty() {
            return Err(SnmpError::InvalidOid {
                reason: "empty oid".into(),
            });
        }
        if self.0.len() >= 2 {
            let first = self.0[0];
            let second = self.0[1];
            if first > 2 {
                return Err(SnmpError::InvalidOid {
                    reason: format!("leading component {first} out of range [0,2]"),
                });
            }
            if first < 2 && second > 39 {
                return Err(SnmpError::InvalidOid {
                    reason: format!("second component {second} out of range [0,39]"),
                });
            }
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self` is a prefix of `other` iff `len(self) <= len(other)` and their
    /// first `len(self)` components are equal.
    pub fn is_prefix_of(&self, other: &Oid) -> bool {
        self.0.len() <= other.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Append one sub-identifier, returning a new OID.
    pub fn child(&self, index: u32) -> Oid {
        let mut v = self.0.clone();
        v.push(index);
        Oid(v)
    }

    /// Append a whole suffix, returning a new OID.
    pub fn append(&self, suffix: &[u32]) -> Oid {
        let mut v = self.0.clone();
        v.extend_from_slice(suffix);
        Oid(v)
    }

    /// Drop the last sub-identifier, if any.
    pub fn parent(&self) -> Option<Oid> {
        if self.0.is_empty() {
            None
        } else {
            Some(Oid(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The suffix of `self` after stripping `prefix`, if `prefix` is indeed a
    /// prefix of `self`.
    pub fn strip_prefix(&self, prefix: &Oid) -> Option<&[u32]> {
        if prefix.is_prefix_of(self) {
            Some(&self.0[prefix.0.len()..])
        } else {
            None
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<Vec<u32>> for Oid {
    fn from(v: Vec<u32>) -> Oid {
        Oid(v)
    }
}

impl From<&[u32]> for Oid {
    fn from(v: &[u32]) -> Oid {
        Oid(v.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_text() {
        let oid = Oid::parse("1.3.6.1.2.1.1.1.0").unwrap();
        assert_eq!(oid.as_slice(), &[1, 3, 6, 1, 2, 1, 1, 1, 0]);
    }

    #[test]
    fn rejects_non_digit() {
        assert!(Oid::parse("1.3.a.1").is_err());
    }

    #[test]
    fn rejects_leading_component_over_2() {
        assert!(Oid::parse("5.1").is_err());
    }

    #[test]
    fn rejects_second_component_over_39_when_first_lt_2() {
        assert!(Oid::parse("1.40.1").is_err());
        assert!(Oid::parse("2.40.1").is_ok()); // unbounded when first == 2
    }

    #[test]
    fn prefix_relation() {
        let root = Oid::parse("1.3.6.1.2.1.1").unwrap();
        let child = Oid::parse("1.3.6.1.2.1.1.5.0").unwrap();
        assert!(root.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&root));
        assert!(root.is_prefix_of(&root));
    }

    #[test]
    fn total_order_and_prefix_implies_le() {
        let a = Oid::parse("1.3.6.1.2.1.1").unwrap();
        let b = Oid::parse("1.3.6.1.2.1.1.1").unwrap();
        let c = Oid::parse("1.3.6.1.2.1.2").unwrap();
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
        assert!(a.is_prefix_of(&b) && a <= b);
    }

    #[test]
    fn display_round_trips_text() {
        let oid = Oid::parse("1.3.6.1.4.1.9.9.23").unwrap();
        assert_eq!(oid.to_string(), "1.3.6.1.4.1.9.9.23");
    }

    #[test]
    fn child_and_parent() {
        let root = Oid::parse("1.3.6.1.2.1.2.2.1.2").unwrap();
        let row = root.child(7);
        assert_eq!(row.as_slice(), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 7]);
        assert_eq!(row.parent().unwrap(), root);
    }

    #[test]
    fn strip_prefix_suffix() {
        let root = Oid::parse("1.3.6.1.2.1.2.2.1.2").unwrap();
        let row = root.child(7);
        assert_eq!(row.strip_prefix(&root), Some(&[7u32][..]));
    }
}
