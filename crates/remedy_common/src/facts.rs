//! Machine power and reachability facts.

use serde::{Deserialize, Serialize};

/// Power state of a machine, independent of its provisioning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Running,
    Stopped,
    Deallocated,
    Unknown,
}

impl PowerState {
    /// Map a platform instance-view code like `PowerState/running`.
    pub fn from_platform_code(code: &str) -> Self {
        match code.rsplit('/').next() {
            Some("running") => Self::Running,
            Some("stopped") => Self::Stopped,
            Some("deallocated") => Self::Deallocated,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Deallocated => "deallocated",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Which fact a collector was after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactKind {
    Power,
    Acl,
    Reachability,
}

impl std::fmt::Display for FactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Power => "power",
            Self::Acl => "acl",
            Self::Reachability => "reachability",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of the power collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerFact {
    pub exists: bool,
    pub power_state: PowerState,
    pub provisioning_state: Option<String>,
}

impl PowerFact {
    /// Fact for a machine the provider does not know about.
    pub fn missing() -> Self {
        Self {
            exists: false,
            power_state: PowerState::Unknown,
            provisioning_state: None,
        }
    }
}

/// Addresses attached to the machine's network interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityFact {
    pub public_address: Option<String>,
    pub private_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_state_from_platform_code() {
        assert_eq!(
            PowerState::from_platform_code("PowerState/running"),
            PowerState::Running
        );
        assert_eq!(
            PowerState::from_platform_code("PowerState/deallocated"),
            PowerState::Deallocated
        );
        assert_eq!(
            PowerState::from_platform_code("PowerState/stopping"),
            PowerState::Unknown
        );
        assert_eq!(PowerState::from_platform_code(""), PowerState::Unknown);
    }

    #[test]
    fn test_power_state_serializes_lowercase() {
        let json = serde_json::to_string(&PowerState::Deallocated).unwrap();
        assert_eq!(json, "\"deallocated\"");
    }

    #[test]
    fn test_missing_fact_is_unknown() {
        let fact = PowerFact::missing();
        assert!(!fact.exists);
        assert_eq!(fact.power_state, PowerState::Unknown);
    }
}
