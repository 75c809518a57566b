//! Issue synthesis.
//!
//! Turns a collected fact set into the ordered issue list the planner
//! consumes. Power findings come first, then the port analysis, then
//! collection failures that only degrade the report.

use crate::collectors::FactSet;
use crate::resolver;
use remedy_common::config::RuleConfig;
use remedy_common::{AclAnalysis, FactKind, Issue, PowerState};

/// Issues plus the rule analysis they were derived from.
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub issues: Vec<Issue>,
    pub analysis: Option<AclAnalysis>,
}

/// Derive issues from the facts.
pub fn synthesize(facts: &FactSet, rule: &RuleConfig) -> Diagnosis {
    let mut issues = Vec::new();

    match &facts.power {
        Ok(fact) if !fact.exists => issues.push(Issue::CollectionError {
            fact: FactKind::Power,
            message: "machine not found".to_string(),
        }),
        Ok(fact) if fact.power_state != PowerState::Running => issues.push(Issue::PowerOff {
            observed: fact.power_state,
        }),
        Ok(_) => {}
        Err(e) => issues.push(Issue::CollectionError {
            fact: FactKind::Power,
            message: e.to_string(),
        }),
    }

    let analysis = match &facts.acl {
        Ok(rules) => {
            let analysis = resolver::analyze_rules(rules, rule.port, rule.protocol);
            if analysis.conflict {
                if let (Some(deny), Some(allow)) = (
                    analysis.best_deny_precedence,
                    analysis.best_allow_precedence,
                ) {
                    issues.push(Issue::PrecedenceConflict {
                        port: rule.port,
                        deny_precedence: deny,
                        allow_precedence: allow,
                    });
                }
            } else if !analysis.port_allowed {
                issues.push(Issue::PortBlocked {
                    port: rule.port,
                    analysis: analysis.clone(),
                });
            }
            Some(analysis)
        }
        Err(e) => {
            issues.push(Issue::CollectionError {
                fact: FactKind::Acl,
                message: e.to_string(),
            });
            None
        }
    };

    if let Err(e) = &facts.reachability {
        issues.push(Issue::CollectionError {
            fact: FactKind::Reachability,
            message: e.to_string(),
        });
    }

    Diagnosis { issues, analysis }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::collect_facts;
    use crate::sim::{sim_target, Scenario, SimCloud};
    use std::time::Duration;

    async fn diagnose(cloud: &std::sync::Arc<SimCloud>) -> Diagnosis {
        let facts = collect_facts(&sim_target(), &cloud.handles(), Duration::from_secs(5)).await;
        synthesize(&facts, &RuleConfig::default())
    }

    #[tokio::test]
    async fn test_healthy_has_no_issues() {
        let cloud = SimCloud::with_scenario(Scenario::Healthy);
        let diagnosis = diagnose(&cloud).await;
        assert!(diagnosis.issues.is_empty());
        assert!(diagnosis.analysis.unwrap().port_allowed);
    }

    #[tokio::test]
    async fn test_stopped_machine_is_a_power_issue() {
        let cloud = SimCloud::with_scenario(Scenario::Stopped);
        let diagnosis = diagnose(&cloud).await;
        assert_eq!(diagnosis.issues.len(), 1);
        assert!(matches!(
            diagnosis.issues[0],
            Issue::PowerOff {
                observed: PowerState::Deallocated
            }
        ));
    }

    #[tokio::test]
    async fn test_blocked_port_is_reported() {
        let cloud = SimCloud::with_scenario(Scenario::Blocked);
        let diagnosis = diagnose(&cloud).await;
        assert_eq!(diagnosis.issues.len(), 1);
        assert!(matches!(
            diagnosis.issues[0],
            Issue::PortBlocked { port: 3389, .. }
        ));
    }

    #[tokio::test]
    async fn test_conflict_reports_both_precedences() {
        let cloud = SimCloud::with_scenario(Scenario::Conflict);
        let diagnosis = diagnose(&cloud).await;
        assert_eq!(diagnosis.issues.len(), 1);
        assert!(matches!(
            diagnosis.issues[0],
            Issue::PrecedenceConflict {
                port: 3389,
                deny_precedence: 200,
                allow_precedence: 1000,
            }
        ));
    }

    #[tokio::test]
    async fn test_power_issue_precedes_port_issue() {
        let cloud = SimCloud::with_scenario(Scenario::StoppedBlocked);
        let diagnosis = diagnose(&cloud).await;
        assert_eq!(diagnosis.issues.len(), 2);
        assert!(matches!(diagnosis.issues[0], Issue::PowerOff { .. }));
        assert!(matches!(diagnosis.issues[1], Issue::PortBlocked { .. }));
    }

    #[tokio::test]
    async fn test_rule_outage_degrades_to_collection_error() {
        let cloud = SimCloud::with_scenario(Scenario::Healthy);
        cloud.set_fail_acl_reads(true);
        let diagnosis = diagnose(&cloud).await;
        assert!(diagnosis.analysis.is_none());
        assert_eq!(diagnosis.issues.len(), 1);
        assert!(matches!(
            &diagnosis.issues[0],
            Issue::CollectionError {
                fact: FactKind::Acl,
                ..
            }
        ));
        assert!(!diagnosis.issues[0].is_warning_only());
    }

    #[tokio::test]
    async fn test_reachability_outage_is_warning_only() {
        let cloud = SimCloud::with_scenario(Scenario::Healthy);
        cloud.set_fail_reachability(true);
        let diagnosis = diagnose(&cloud).await;
        assert_eq!(diagnosis.issues.len(), 1);
        assert!(diagnosis.issues[0].is_warning_only());
    }

    #[tokio::test]
    async fn test_missing_machine_is_a_power_collection_issue() {
        let cloud = SimCloud::new();
        let target = sim_target();
        cloud.put_rules(&target.acl, vec![]);
        let diagnosis = diagnose(&cloud).await;
        assert!(diagnosis.issues.iter().any(|i| matches!(
            i,
            Issue::CollectionError {
                fact: FactKind::Power,
                ..
            }
        )));
        assert!(!diagnosis.issues.iter().any(|i| matches!(i, Issue::PowerOff { .. })));
    }
}
