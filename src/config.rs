//! Configuration provider contract (§6, AMBIENT).
//!
//! Mirrors the teacher's `NetdiscoConfig`/`load_config` layered-override
//! shape (`#[serde(default)]` over a YAML-deserializable struct), minus the
//! env-var override layer — that belongs to the host application per this
//! crate's scope. `merge` overlays defaults with call-site options so the
//! call site always wins, matching the contract's `merge(opts)` description.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{RequestOptions, SnmpVersion};
use crate::value::SmiType;

/// Process-wide defaults for engine request options. Deserializable from
/// YAML the way `NetdiscoConfig` is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineDefaults {
    pub community: String,
    pub version: ConfigVersion,
    pub timeout_ms: u64,
    pub retries: u32,
    pub port: u16,
    pub non_repeaters: u32,
    pub max_repetitions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigVersion {
    V1,
    V2c,
}

impl Default for ConfigVersion {
    fn default() -> Self {
        ConfigVersion::V2c
    }
}

impl Default for EngineDefaults {
    fn default() -> Self {
        EngineDefaults {
            community: "public".to_string(),
            version: ConfigVersion::V2c,
            timeout_ms: 5000,
            retries: 1,
            port: 161,
            non_repeaters: 0,
            max_repetitions: 10,
        }
    }
}

impl EngineDefaults {
    /// Parse from YAML text, falling back to defaults for any missing key.
    pub fn from_yaml(text: &str) -> Result<EngineDefaults, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// The named default's current value, rendered as text (for a generic
    /// `get_default(option)`-style accessor).
    pub fn get_default(&self, option: &str) -> Option<String> {
        Some(match option {
            "community" => self.community.clone(),
            "version" => match self.version {
                ConfigVersion::V1 => "v1".to_string(),
                ConfigVersion::V2c => "v2c".to_string(),
            },
            "timeout" => self.timeout_ms.to_string(),
            "retries" => self.retries.to_string(),
            "port" => self.port.to_string(),
            "non_repeaters" => self.non_repeaters.to_string(),
            "max_repetitions" => self.max_repetitions.to_string(),
            _ => return None,
        })
    }

    /// Overlay these defaults with call-site `overrides`; any field left at
    /// `None` in `overrides` keeps this instance's value.
    pub fn merge(&self, overrides: RequestOptionsOverride) -> RequestOptions {
        RequestOptions {
            community: overrides.community.unwrap_or_else(|| self.community.clone().into_bytes()),
            version: overrides.version.unwrap_or(match self.version {
                ConfigVersion::V1 => SnmpVersion::V1,
                ConfigVersion::V2c => SnmpVersion::V2c,
            }),
            timeout: overrides.timeout.unwrap_or(Duration::from_millis(self.timeout_ms)),
            retries: overrides.retries.unwrap_or(self.retries),
            port: overrides.port.unwrap_or(self.port),
            non_repeaters: overrides.non_repeaters.unwrap_or(self.non_repeaters),
            max_repetitions: overrides.max_repetitions.unwrap_or(self.max_repetitions),
            set_type: overrides.set_type,
        }
    }
}

/// Call-site overrides for [`EngineDefaults::merge`]; every field optional so
/// the caller specifies only what it wants to override.
#[derive(Debug, Clone, Default)]
pub struct RequestOptionsOverride {
    pub community: Option<Vec<u8>>,
    pub version: Option<SnmpVersion>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub port: Option<u16>,
    pub non_repeaters: Option<u32>,
    pub max_repetitions: Option<u32>,
    pub set_type: Option<SmiType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let defaults = EngineDefaults::default();
        assert_eq!(defaults.community, "public");
        assert_eq!(defaults.version, ConfigVersion::V2c);
        assert_eq!(defaults.timeout_ms, 5000);
        assert_eq!(defaults.retries, 1);
        assert_eq!(defaults.port, 161);
        assert_eq!(defaults.max_repetitions, 10);
    }

    #[test]
    fn yaml_partial_override_keeps_remaining_defaults() {
        let defaults = EngineDefaults::from_yaml("community: private\nretries: 3\n").unwrap();
        assert_eq!(defaults.community, "private");
        assert_eq!(defaults.retries, 3);
        assert_eq!(defaults.port, 161);
    }

    #[test]
    fn merge_overlays_call_site_options() {
        let defaults = EngineDefaults::default();
        let opts = defaults.merge(RequestOptionsOverride {
            retries: Some(5),
            ..Default::default()
        });
        assert_eq!(opts.retries, 5);
        assert_eq!(opts.community, b"public");
    }

    #[test]
    fn get_default_renders_known_options() {
        let defaults = EngineDefaults::default();
        assert_eq!(defaults.get_default("port").as_deref(), Some("161"));
        assert_eq!(defaults.get_default("nonexistent"), None);
    }
}
