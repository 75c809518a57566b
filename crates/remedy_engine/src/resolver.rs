//! Rule analysis for the remote-access port.
//!
//! The platform evaluates inbound rules lowest precedence first, and
//! the first match wins. Diagnosis therefore reduces to two numbers:
//! the best allow and the best deny that cover the port.

use remedy_common::config::PrecedenceConfig;
use remedy_common::{AclAnalysis, AclRule, Direction, Protocol, RuleAccess};

/// Analyze the inbound rules that cover a port.
pub fn analyze_rules(rules: &[AclRule], port: u16, protocol: Protocol) -> AclAnalysis {
    let matching: Vec<AclRule> = rules
        .iter()
        .filter(|r| {
            r.direction == Direction::Inbound
                && r.protocol.compatible_with(protocol)
                && r.ports.matches(port)
        })
        .cloned()
        .collect();

    let best_allow = matching
        .iter()
        .filter(|r| r.access == RuleAccess::Allow)
        .map(|r| r.precedence)
        .min();
    let best_deny = matching
        .iter()
        .filter(|r| r.access == RuleAccess::Deny)
        .map(|r| r.precedence)
        .min();

    // Deny outranks only when strictly lower; the platform forbids
    // duplicate precedences inside one group.
    let conflict = matches!((best_allow, best_deny), (Some(a), Some(d)) if d < a);
    let port_allowed = match (best_allow, best_deny) {
        (Some(a), Some(d)) => a < d,
        (Some(_), None) => true,
        _ => false,
    };

    AclAnalysis {
        port_allowed,
        conflict,
        best_allow_precedence: best_allow,
        best_deny_precedence: best_deny,
        matching_rules: matching,
    }
}

/// Pick a precedence for the managed allow rule.
///
/// Prefers the configured default, drops just below the best deny when
/// one outranks it, and gives up when the deny already sits at the
/// platform minimum.
pub fn fix_precedence(best_deny: Option<u32>, window: &PrecedenceConfig) -> Option<u32> {
    match best_deny {
        None => Some(window.default.min(window.maximum)),
        Some(deny) if deny <= window.minimum => None,
        Some(deny) => {
            let fix = window.minimum.max(window.default.min(deny - 1));
            Some(fix.min(window.maximum))
        }
    }
}
