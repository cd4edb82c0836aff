//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default bound on envelopes held while their description is outstanding.
pub const DEFAULT_MAX_PENDING_EVENTS: usize = 1024;

/// Default number of info entries retained.
pub const DEFAULT_INFO_CAPACITY: usize = 256;

/// What to do with a configuration whose categorical value is undeclared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainPolicy {
    /// Drop the whole event with a domain violation
    #[default]
    Reject,
    /// Keep the record; projections show it as out of domain
    Flag,
}

impl DomainPolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Flag => "flag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_pending_events: usize,
    pub info_capacity: usize,
    pub domain_policy: DomainPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pending_events: DEFAULT_MAX_PENDING_EVENTS,
            info_capacity: DEFAULT_INFO_CAPACITY,
            domain_policy: DomainPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_pending_events, 1024);
        assert_eq!(config.info_capacity, 256);
        assert_eq!(config.domain_policy, DomainPolicy::Reject);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str("domain_policy = \"flag\"").unwrap();
        assert_eq!(config.domain_policy, DomainPolicy::Flag);
        assert_eq!(config.max_pending_events, DEFAULT_MAX_PENDING_EVENTS);
    }
}
