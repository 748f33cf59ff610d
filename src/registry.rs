//! Name registry (§4.5): symbolic-name → OID, built from the MIB-II objects
//! the teacher's `snmp/oids.rs` hard-coded as Rust constants, plus dynamic
//! registration.
//!
//! Concurrent reads never block (`DashMap` shards internally); registrations
//! are rare and may serialize behind a shard lock, matching the "rare writes"
//! guidance in spec §4.5.

use dashmap::DashMap;

use crate::oid::Oid;

/// Symbolic-name → OID map, pre-populated with MIB-II well-known objects.
pub struct NameRegistry {
    names: DashMap<String, Oid>,
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NameRegistry {
    /// A registry with the built-in MIB-II object table.
    pub fn new() -> Self {
        let names = DashMap::new();
        for (name, oid) in builtin_table() {
            names.insert(name.to_string(), Oid::from(oid));
        }
        NameRegistry { names }
    }

    /// An empty registry (for tests or hosts that want to build their own
    /// table from scratch).
    pub fn empty() -> Self {
        NameRegistry {
            names: DashMap::new(),
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Oid> {
        self.names.get(name).map(|e| e.value().clone())
    }

    /// Reverse lookup with longest-prefix-match fallback: if `oid` is not
    /// registered exactly, find the longest registered prefix and return
    /// `"name.suffix"`.
    pub fn reverse_lookup(&self, oid: &Oid) -> Option<String> {
        if let Some(exact) = self
            .names
            .iter()
            .find(|e| e.value() == oid)
            .map(|e| e.key().clone())
        {
            return Some(exact);
        }
        let mut best: Option<(String, usize)> = None;
        for entry in self.names.iter() {
            if entry.value().is_prefix_of(oid) {
                let plen = entry.value().len();
                if best.as_ref().map(|(_, l)| plen > *l).unwrap_or(true) {
                    best = Some((entry.key().clone(), plen));
                }
            }
        }
        best.map(|(name, plen)| {
            let suffix = &oid.as_slice()[plen..];
            if suffix.is_empty() {
                name
            } else {
                let suffix_text = suffix
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(".");
                format!("{name}.{suffix_text}")
            }
        })
    }

    pub fn register(&self, name: impl Into<String>, oid: Oid) {
        self.names.insert(name.into(), oid);
    }

    pub fn list(&self) -> Vec<(String, Oid)> {
        self.names
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Direct children of `oid`: registered names one component longer than
    /// `oid` with `oid` as a prefix.
    pub fn children(&self, oid: &Oid) -> Vec<(String, Oid)> {
        self.names
            .iter()
            .filter(|e| e.value().len() == oid.len() + 1 && oid.is_prefix_of(e.value()))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

/// Built-in MIB-II name table, ported from the teacher's `snmp/oids.rs`
/// constants into name→OID entries.
fn builtin_table() -> Vec<(&'static str, &'static [u32])> {
    vec![
        // System group (RFC 1213)
        ("system", &[1, 3, 6, 1, 2, 1, 1]),
        ("sysDescr", &[1, 3, 6, 1, 2, 1, 1, 1]),
        ("sysObjectID", &[1, 3, 6, 1, 2, 1, 1, 2]),
        ("sysUpTime", &[1, 3, 6, 1, 2, 1, 1, 3]),
        ("sysContact", &[1, 3, 6, 1, 2, 1, 1, 4]),
        ("sysName", &[1, 3, 6, 1, 2, 1, 1, 5]),
        ("sysLocation", &[1, 3, 6, 1, 2, 1, 1, 6]),
        ("sysServices", &[1, 3, 6, 1, 2, 1, 1, 7]),
        // Interfaces group (IF-MIB)
        ("interfaces", &[1, 3, 6, 1, 2, 1, 2]),
        ("ifNumber", &[1, 3, 6, 1, 2, 1, 2, 1]),
        ("ifIndex", &[1, 3, 6, 1, 2, 1, 2, 2, 1, 1]),
        ("ifDescr", &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2]),
        ("ifType", &[1, 3, 6, 1, 2, 1, 2, 2, 1, 3]),
        ("ifMtu", &[1, 3, 6, 1, 2, 1, 2, 2, 1, 4]),
        ("ifSpeed", &[1, 3, 6, 1, 2, 1, 2, 2, 1, 5]),
        ("ifPhysAddress", &[1, 3, 6, 1, 2, 1, 2, 2, 1, 6]),
        ("ifAdminStatus", &[1, 3, 6, 1, 2, 1, 2, 2, 1, 7]),
        ("ifOperStatus", &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8]),
        ("ifLastChange", &[1, 3, 6, 1, 2, 1, 2, 2, 1, 9]),
        ("ifName", &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1]),
        ("ifHighSpeed", &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 15]),
        ("ifAlias", &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 18]),
        // IP group
        ("ip", &[1, 3, 6, 1, 2, 1, 4]),
        ("ipAdEntAddr", &[1, 3, 6, 1, 2, 1, 4, 20, 1, 1]),
        ("ipNetToMediaPhysAddress", &[1, 3, 6, 1, 2, 1, 4, 22, 1, 2]),
        ("ipNetToMediaType", &[1, 3, 6, 1, 2, 1, 4, 22, 1, 4]),
        // ICMP group
        ("icmp", &[1, 3, 6, 1, 2, 1, 5]),
        // TCP group
        ("tcp", &[1, 3, 6, 1, 2, 1, 6]),
        // UDP group
        ("udp", &[1, 3, 6, 1, 2, 1, 7]),
        // SNMP group
        ("snmp", &[1, 3, 6, 1, 2, 1, 11]),
        // Bridge MIB - MAC address table
        ("dot1dTpFdbAddress", &[1, 3, 6, 1, 2, 1, 17, 4, 3, 1, 1]),
        ("dot1dTpFdbPort", &[1, 3, 6, 1, 2, 1, 17, 4, 3, 1, 2]),
        ("dot1dTpFdbStatus", &[1, 3, 6, 1, 2, 1, 17, 4, 3, 1, 3]),
        ("dot1qTpFdbPort", &[1, 3, 6, 1, 2, 1, 17, 7, 1, 2, 2]),
        // Entity MIB
        ("entPhysicalDescr", &[1, 3, 6, 1, 2, 1, 47, 1, 1, 1, 1, 2]),
        ("entPhysicalClass", &[1, 3, 6, 1, 2, 1, 47, 1, 1, 1, 1, 5]),
        ("entPhysicalName", &[1, 3, 6, 1, 2, 1, 47, 1, 1, 1, 1, 7]),
        ("entPhysicalSerialNum", &[1, 3, 6, 1, 2, 1, 47, 1, 1, 1, 1, 11]),
        ("entPhysicalModelName", &[1, 3, 6, 1, 2, 1, 47, 1, 1, 1, 1, 13]),
        // LLDP-MIB
        ("lldpRemSysName", &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 9]),
        ("lldpRemSysDesc", &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 10]),
        ("lldpRemPortId", &[1, 0, 8802, 1, 1, 2, 1, 4, 1, 1, 7]),
        // POWER-ETHERNET-MIB
        ("pethPsePortAdminEnable", &[1, 3, 6, 1, 2, 1, 105, 1, 1, 1, 3]),
        ("pethPsePortDetectionStatus", &[1, 3, 6, 1, 2, 1, 105, 1, 1, 1, 6]),
        ("pethPsePortPowerCurrent", &[1, 3, 6, 1, 2, 1, 105, 1, 1, 1, 7]),
    ]
}
