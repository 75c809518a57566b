//! Access-control list rules and their analysis against a target port.
//!
//! Precedence is numeric and lower wins. The platform accepts values in
//! the 100-4096 window; rule names are unique within one group.

use serde::{Deserialize, Serialize};

/// Traffic direction a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Whether a matching rule admits or drops traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleAccess {
    Allow,
    Deny,
}

/// Transport protocol a rule covers. `Any` matches everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
    Any,
}

impl Protocol {
    /// Rules match a target protocol when equal or when either side is the wildcard.
    pub fn compatible_with(self, other: Protocol) -> bool {
        self == other || self == Protocol::Any || other == Protocol::Any
    }
}

/// Destination port coverage of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortSpec {
    Any,
    Single(u16),
    Span(u16, u16),
    List(Vec<PortSpec>),
}

impl PortSpec {
    /// Parse one platform port string: `"3389"`, `"*"` or `"1000-2000"`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "*" {
            return Some(Self::Any);
        }
        if let Some((lo, hi)) = text.split_once('-') {
            let lo: u16 = lo.trim().parse().ok()?;
            let hi: u16 = hi.trim().parse().ok()?;
            if lo > hi {
                return None;
            }
            return Some(Self::Span(lo, hi));
        }
        text.parse().ok().map(Self::Single)
    }

    /// Parse a multi-valued port field into one spec.
    pub fn parse_many(values: &[String]) -> Option<Self> {
        let specs: Vec<PortSpec> = values
            .iter()
            .map(|v| Self::parse(v))
            .collect::<Option<Vec<_>>>()?;
        match specs.len() {
            0 => None,
            1 => specs.into_iter().next(),
            _ => Some(Self::List(specs)),
        }
    }

    pub fn matches(&self, port: u16) -> bool {
        match self {
            Self::Any => true,
            Self::Single(p) => *p == port,
            Self::Span(lo, hi) => (*lo..=*hi).contains(&port),
            Self::List(specs) => specs.iter().any(|s| s.matches(port)),
        }
    }
}

impl std::fmt::Display for PortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Single(p) => write!(f, "{}", p),
            Self::Span(lo, hi) => write!(f, "{}-{}", lo, hi),
            Self::List(specs) => {
                let parts: Vec<String> = specs.iter().map(|s| s.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

/// One rule in a network security group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclRule {
    pub name: String,
    pub direction: Direction,
    pub access: RuleAccess,
    pub protocol: Protocol,
    pub ports: PortSpec,
    pub precedence: u32,
    pub source_prefix: Option<String>,
    pub description: Option<String>,
}

/// Upsert payload for a rule, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub direction: Direction,
    pub access: RuleAccess,
    pub protocol: Protocol,
    pub ports: PortSpec,
    pub precedence: u32,
    pub source_prefix: Option<String>,
    pub description: Option<String>,
}

impl RuleSpec {
    /// True when an existing rule already carries this spec.
    ///
    /// The description is cosmetic and not compared.
    pub fn satisfied_by(&self, rule: &AclRule) -> bool {
        rule.name == self.name
            && rule.direction == self.direction
            && rule.access == self.access
            && rule.protocol == self.protocol
            && rule.ports == self.ports
            && rule.precedence == self.precedence
            && rule.source_prefix == self.source_prefix
    }

    pub fn into_rule(self) -> AclRule {
        AclRule {
            name: self.name,
            direction: self.direction,
            access: self.access,
            protocol: self.protocol,
            ports: self.ports,
            precedence: self.precedence,
            source_prefix: self.source_prefix,
            description: self.description,
        }
    }
}

/// What the rule set says about one port. Derived, recomputed every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclAnalysis {
    pub port_allowed: bool,
    pub conflict: bool,
    pub best_allow_precedence: Option<u32>,
    pub best_deny_precedence: Option<u32>,
    pub matching_rules: Vec<AclRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_port() {
        assert_eq!(PortSpec::parse("3389"), Some(PortSpec::Single(3389)));
        assert_eq!(PortSpec::parse(" 80 "), Some(PortSpec::Single(80)));
    }

    #[test]
    fn test_parse_wildcard() {
        assert_eq!(PortSpec::parse("*"), Some(PortSpec::Any));
    }

    #[test]
    fn test_parse_span() {
        assert_eq!(PortSpec::parse("1000-2000"), Some(PortSpec::Span(1000, 2000)));
        assert_eq!(PortSpec::parse("2000-1000"), None);
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(PortSpec::parse("rdp"), None);
        assert_eq!(PortSpec::parse("70000"), None);
    }

    #[test]
    fn test_parse_many_builds_list() {
        let values = vec!["80".to_string(), "443".to_string(), "8000-8080".to_string()];
        let spec = PortSpec::parse_many(&values).unwrap();
        assert!(spec.matches(443));
        assert!(spec.matches(8042));
        assert!(!spec.matches(22));
    }

    #[test]
    fn test_parse_many_single_collapses() {
        let values = vec!["3389".to_string()];
        assert_eq!(PortSpec::parse_many(&values), Some(PortSpec::Single(3389)));
        assert_eq!(PortSpec::parse_many(&[]), None);
    }

    #[test]
    fn test_matches_span_edges() {
        let spec = PortSpec::Span(1000, 2000);
        assert!(spec.matches(1000));
        assert!(spec.matches(2000));
        assert!(!spec.matches(999));
        assert!(!spec.matches(2001));
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(PortSpec::Any.to_string(), "*");
        assert_eq!(PortSpec::Single(3389).to_string(), "3389");
        assert_eq!(PortSpec::Span(1, 9).to_string(), "1-9");
    }

    #[test]
    fn test_protocol_compatibility() {
        assert!(Protocol::Tcp.compatible_with(Protocol::Tcp));
        assert!(Protocol::Any.compatible_with(Protocol::Tcp));
        assert!(Protocol::Udp.compatible_with(Protocol::Any));
        assert!(!Protocol::Udp.compatible_with(Protocol::Tcp));
    }

    fn sample_spec() -> RuleSpec {
        RuleSpec {
            name: "AllowRDP".to_string(),
            direction: Direction::Inbound,
            access: RuleAccess::Allow,
            protocol: Protocol::Tcp,
            ports: PortSpec::Single(3389),
            precedence: 500,
            source_prefix: Some("*".to_string()),
            description: Some("Allow remote desktop access".to_string()),
        }
    }

    #[test]
    fn test_spec_satisfied_ignores_description() {
        let spec = sample_spec();
        let mut rule = spec.clone().into_rule();
        rule.description = Some("something else".to_string());
        assert!(spec.satisfied_by(&rule));
    }

    #[test]
    fn test_spec_not_satisfied_by_other_precedence() {
        let spec = sample_spec();
        let mut rule = spec.clone().into_rule();
        rule.precedence = 900;
        assert!(!spec.satisfied_by(&rule));
    }
}
