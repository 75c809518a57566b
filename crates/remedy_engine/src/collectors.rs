//! Read-only fact collectors.
//!
//! Each collector wraps one capability read in a timeout and reports
//! failure as a value instead of aborting the session. A machine the
//! provider has never heard of is a fact, not a collection failure.

use crate::capability::CloudHandles;
use remedy_common::{
    AclRule, CapabilityError, CollectorError, FactKind, PowerFact, ReachabilityFact, TargetRef,
};
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Everything the collectors observed, failures included.
#[derive(Debug, Clone)]
pub struct FactSet {
    pub power: Result<PowerFact, CollectorError>,
    pub acl: Result<Vec<AclRule>, CollectorError>,
    pub reachability: Result<ReachabilityFact, CollectorError>,
}

impl FactSet {
    pub fn error_count(&self) -> usize {
        [
            self.power.is_err(),
            self.acl.is_err(),
            self.reachability.is_err(),
        ]
        .iter()
        .filter(|failed| **failed)
        .count()
    }
}

/// Run all three collectors concurrently.
pub async fn collect_facts(target: &TargetRef, cloud: &CloudHandles, limit: Duration) -> FactSet {
    let (power, acl, reachability) = tokio::join!(
        collect_power(target, cloud, limit),
        collect_acl(target, cloud, limit),
        collect_reachability(target, cloud, limit),
    );
    FactSet {
        power,
        acl,
        reachability,
    }
}

pub async fn collect_power(
    target: &TargetRef,
    cloud: &CloudHandles,
    limit: Duration,
) -> Result<PowerFact, CollectorError> {
    match timeout(limit, cloud.power_read.get(&target.machine)).await {
        Ok(Ok(fact)) => Ok(fact),
        Ok(Err(CapabilityError::NotFound(_))) => Ok(PowerFact::missing()),
        Ok(Err(e)) => {
            warn!("Power collector failed: {}", e);
            Err(CollectorError::Failed {
                fact: FactKind::Power,
                message: e.to_string(),
            })
        }
        Err(_) => {
            warn!("Power collector timed out after {:?}", limit);
            Err(CollectorError::Timeout {
                fact: FactKind::Power,
                secs: limit.as_secs(),
            })
        }
    }
}

pub async fn collect_acl(
    target: &TargetRef,
    cloud: &CloudHandles,
    limit: Duration,
) -> Result<Vec<AclRule>, CollectorError> {
    match timeout(limit, cloud.acl_read.list_rules(&target.acl)).await {
        Ok(Ok(rules)) => Ok(rules),
        Ok(Err(e)) => {
            warn!("Rule collector failed: {}", e);
            Err(CollectorError::Failed {
                fact: FactKind::Acl,
                message: e.to_string(),
            })
        }
        Err(_) => {
            warn!("Rule collector timed out after {:?}", limit);
            Err(CollectorError::Timeout {
                fact: FactKind::Acl,
                secs: limit.as_secs(),
            })
        }
    }
}

pub async fn collect_reachability(
    target: &TargetRef,
    cloud: &CloudHandles,
    limit: Duration,
) -> Result<ReachabilityFact, CollectorError> {
    match timeout(limit, cloud.reachability.addresses(&target.machine)).await {
        Ok(Ok(fact)) => Ok(fact),
        Ok(Err(e)) => {
            warn!("Reachability collector failed: {}", e);
            Err(CollectorError::Failed {
                fact: FactKind::Reachability,
                message: e.to_string(),
            })
        }
        Err(_) => {
            warn!("Reachability collector timed out after {:?}", limit);
            Err(CollectorError::Timeout {
                fact: FactKind::Reachability,
                secs: limit.as_secs(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{sim_target, Scenario, SimCloud};
    use remedy_common::PowerState;

    #[tokio::test]
    async fn test_collect_all_facts() {
        let cloud = SimCloud::with_scenario(Scenario::Blocked);
        let facts = collect_facts(&sim_target(), &cloud.handles(), Duration::from_secs(5)).await;

        assert_eq!(facts.error_count(), 0);
        let power = facts.power.unwrap();
        assert!(power.exists);
        assert_eq!(power.power_state, PowerState::Running);
        assert_eq!(facts.acl.unwrap().len(), 2);
        assert!(facts.reachability.unwrap().public_address.is_some());
    }

    #[tokio::test]
    async fn test_missing_machine_becomes_missing_fact() {
        let cloud = SimCloud::new();
        let facts = collect_facts(&sim_target(), &cloud.handles(), Duration::from_secs(5)).await;

        let power = facts.power.unwrap();
        assert!(!power.exists);
        // The ACL group is also absent, and that stays an error.
        assert!(facts.acl.is_err());
    }

    #[tokio::test]
    async fn test_read_outage_is_reported_per_fact() {
        let cloud = SimCloud::with_scenario(Scenario::Healthy);
        cloud.set_fail_acl_reads(true);
        let facts = collect_facts(&sim_target(), &cloud.handles(), Duration::from_secs(5)).await;

        assert!(facts.power.is_ok());
        assert_eq!(facts.error_count(), 1);
        let err = facts.acl.unwrap_err();
        assert_eq!(err.fact(), FactKind::Acl);
        assert!(matches!(err, CollectorError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_slow_read_times_out() {
        let cloud = SimCloud::with_scenario(Scenario::Healthy);
        cloud.set_read_delay(Duration::from_millis(50));
        let facts = collect_facts(&sim_target(), &cloud.handles(), Duration::from_millis(10)).await;

        assert_eq!(facts.error_count(), 3);
        assert!(matches!(
            facts.power.unwrap_err(),
            CollectorError::Timeout { .. }
        ));
    }
}
