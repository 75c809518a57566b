//! In-memory cloud simulator.
//!
//! Backs all five capability traits with a mutex-guarded fixture store.
//! Scenarios seed the store with the failure shapes the engine has to
//! recognize; knobs inject read outages, write failures, and latency.

use crate::capability::{
    AclReader, AclWriter, CloudHandles, PowerReader, PowerWriter, ReachabilityReader,
};
use async_trait::async_trait;
use remedy_common::{
    AclContext, AclRule, CapabilityError, Direction, MachineRef, PortSpec, PowerFact, PowerState,
    Protocol, ReachabilityFact, RuleAccess, RuleSpec, TargetRef,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const SIM_RESOURCE_GROUP: &str = "rg-problem-vm";
pub const SIM_MACHINE: &str = "problem-vm";
pub const SIM_ACL_GROUP: &str = "problem-vm-nsg";

/// Target the scenarios seed.
pub fn sim_target() -> TargetRef {
    TargetRef::in_group(SIM_RESOURCE_GROUP, SIM_MACHINE, SIM_ACL_GROUP)
}

/// Seeded failure shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Machine deallocated, port rules fine
    Stopped,
    /// Machine running, a deny rule covers the port and no allow admits it
    Blocked,
    /// Machine running, deny outranks an existing allow on the port
    Conflict,
    /// Deallocated and blocked at once
    StoppedBlocked,
    /// Nothing wrong
    Healthy,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::Stopped,
        Scenario::Blocked,
        Scenario::Conflict,
        Scenario::StoppedBlocked,
        Scenario::Healthy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Stopped => "stopped",
            Scenario::Blocked => "blocked",
            Scenario::Conflict => "conflict",
            Scenario::StoppedBlocked => "stopped-blocked",
            Scenario::Healthy => "healthy",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(Scenario::Stopped),
            "blocked" => Ok(Scenario::Blocked),
            "conflict" => Ok(Scenario::Conflict),
            "stopped-blocked" => Ok(Scenario::StoppedBlocked),
            "healthy" => Ok(Scenario::Healthy),
            other => Err(format!(
                "unknown scenario '{}' (expected one of: stopped, blocked, conflict, stopped-blocked, healthy)",
                other
            )),
        }
    }
}

/// Inbound TCP allow rule on a single port, source any.
pub fn allow_rule(name: &str, port: u16, precedence: u32) -> AclRule {
    AclRule {
        name: name.to_string(),
        direction: Direction::Inbound,
        access: RuleAccess::Allow,
        protocol: Protocol::Tcp,
        ports: PortSpec::Single(port),
        precedence,
        source_prefix: Some("*".to_string()),
        description: None,
    }
}

/// Inbound TCP deny rule on a single port, source any.
pub fn deny_rule(name: &str, port: u16, precedence: u32) -> AclRule {
    AclRule {
        name: name.to_string(),
        direction: Direction::Inbound,
        access: RuleAccess::Deny,
        protocol: Protocol::Tcp,
        ports: PortSpec::Single(port),
        precedence,
        source_prefix: Some("*".to_string()),
        description: None,
    }
}

struct SimMachine {
    power_state: PowerState,
    provisioning_state: String,
    public_address: Option<String>,
    private_address: Option<String>,
}

impl SimMachine {
    fn with_power(power_state: PowerState) -> Self {
        Self {
            power_state,
            provisioning_state: "Succeeded".to_string(),
            public_address: Some("203.0.113.10".to_string()),
            private_address: Some("10.0.0.4".to_string()),
        }
    }
}

#[derive(Default)]
struct SimState {
    machines: HashMap<String, SimMachine>,
    acls: HashMap<String, Vec<AclRule>>,
    fail_power_reads: bool,
    fail_acl_reads: bool,
    fail_reachability: bool,
    fail_power_writes: bool,
    fail_acl_writes: bool,
    read_delay: Duration,
    power_writes: u32,
    acl_writes: u32,
}

/// Fixture-backed cloud.
pub struct SimCloud {
    state: Mutex<SimState>,
}

impl SimCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SimState::default()),
        })
    }

    pub fn with_scenario(scenario: Scenario) -> Arc<Self> {
        let cloud = Self::new();
        cloud.load_scenario(scenario);
        cloud
    }

    /// Reset fixtures to a scenario's shape. Knobs and counters survive.
    pub fn load_scenario(&self, scenario: Scenario) {
        let port = 3389;
        let (power, rules) = match scenario {
            Scenario::Stopped => (
                PowerState::Deallocated,
                vec![allow_rule("AllowRDP", port, 500)],
            ),
            Scenario::Blocked => (
                PowerState::Running,
                vec![
                    deny_rule("DenyRDP", port, 1000),
                    allow_rule("AllowHTTP", 80, 1001),
                ],
            ),
            Scenario::Conflict => (
                PowerState::Running,
                vec![
                    deny_rule("DenyRDP", port, 200),
                    allow_rule("AllowRDP", port, 1000),
                ],
            ),
            Scenario::StoppedBlocked => (
                PowerState::Deallocated,
                vec![
                    deny_rule("DenyRDP", port, 1000),
                    allow_rule("AllowHTTP", 80, 1001),
                ],
            ),
            Scenario::Healthy => (
                PowerState::Running,
                vec![allow_rule("AllowRDP", port, 500)],
            ),
        };

        let target = sim_target();
        let mut state = self.lock();
        state
            .machines
            .insert(target.machine.to_string(), SimMachine::with_power(power));
        state.acls.insert(target.acl.to_string(), rules);
    }

    /// Clone handles for all five capabilities.
    pub fn handles(self: &Arc<Self>) -> CloudHandles {
        CloudHandles {
            power_read: self.clone(),
            power_write: self.clone(),
            acl_read: self.clone(),
            acl_write: self.clone(),
            reachability: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        let delay = self.lock().read_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn put_machine(&self, machine: &MachineRef, power: PowerState) {
        self.lock()
            .machines
            .insert(machine.to_string(), SimMachine::with_power(power));
    }

    pub fn put_rules(&self, acl: &AclContext, rules: Vec<AclRule>) {
        self.lock().acls.insert(acl.to_string(), rules);
    }

    /// Current power state, if the machine exists.
    pub fn power(&self, machine: &MachineRef) -> Option<PowerState> {
        self.lock()
            .machines
            .get(&machine.to_string())
            .map(|m| m.power_state)
    }

    /// Current rules of an ACL group, empty when absent.
    pub fn rules(&self, acl: &AclContext) -> Vec<AclRule> {
        self.lock()
            .acls
            .get(&acl.to_string())
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_fail_power_reads(&self, fail: bool) {
        self.lock().fail_power_reads = fail;
    }

    pub fn set_fail_acl_reads(&self, fail: bool) {
        self.lock().fail_acl_reads = fail;
    }

    pub fn set_fail_reachability(&self, fail: bool) {
        self.lock().fail_reachability = fail;
    }

    pub fn set_fail_power_writes(&self, fail: bool) {
        self.lock().fail_power_writes = fail;
    }

    pub fn set_fail_acl_writes(&self, fail: bool) {
        self.lock().fail_acl_writes = fail;
    }

    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = delay;
    }

    /// Successful machine starts so far.
    pub fn power_write_count(&self) -> u32 {
        self.lock().power_writes
    }

    /// Successful rule upserts so far.
    pub fn acl_write_count(&self) -> u32 {
        self.lock().acl_writes
    }
}

#[async_trait]
impl PowerReader for SimCloud {
    async fn get(&self, machine: &MachineRef) -> Result<PowerFact, CapabilityError> {
        self.pause().await;
        let state = self.lock();
        if state.fail_power_reads {
            return Err(CapabilityError::Provider(
                "simulated power read outage".to_string(),
            ));
        }
        match state.machines.get(&machine.to_string()) {
            Some(m) => Ok(PowerFact {
                exists: true,
                power_state: m.power_state,
                provisioning_state: Some(m.provisioning_state.clone()),
            }),
            None => Err(CapabilityError::NotFound(machine.to_string())),
        }
    }
}

#[async_trait]
impl PowerWriter for SimCloud {
    async fn start(&self, machine: &MachineRef) -> Result<(), CapabilityError> {
        let mut state = self.lock();
        if state.fail_power_writes {
            return Err(CapabilityError::Provider(
                "simulated start failure".to_string(),
            ));
        }
        match state.machines.get_mut(&machine.to_string()) {
            Some(m) => {
                m.power_state = PowerState::Running;
                m.provisioning_state = "Succeeded".to_string();
                state.power_writes += 1;
                Ok(())
            }
            None => Err(CapabilityError::NotFound(machine.to_string())),
        }
    }
}

#[async_trait]
impl AclReader for SimCloud {
    async fn list_rules(&self, acl: &AclContext) -> Result<Vec<AclRule>, CapabilityError> {
        self.pause().await;
        let state = self.lock();
        if state.fail_acl_reads {
            return Err(CapabilityError::Provider(
                "simulated rule list outage".to_string(),
            ));
        }
        match state.acls.get(&acl.to_string()) {
            Some(rules) => Ok(rules.clone()),
            None => Err(CapabilityError::NotFound(acl.to_string())),
        }
    }
}

#[async_trait]
impl AclWriter for SimCloud {
    async fn upsert_rule(&self, acl: &AclContext, spec: &RuleSpec) -> Result<(), CapabilityError> {
        let mut state = self.lock();
        if state.fail_acl_writes {
            return Err(CapabilityError::Provider(
                "simulated rule write failure".to_string(),
            ));
        }
        let rules = state.acls.entry(acl.to_string()).or_default();
        let incoming = spec.clone().into_rule();
        match rules.iter_mut().find(|r| r.name == spec.name) {
            Some(existing) => *existing = incoming,
            None => rules.push(incoming),
        }
        state.acl_writes += 1;
        Ok(())
    }
}

#[async_trait]
impl ReachabilityReader for SimCloud {
    async fn addresses(&self, machine: &MachineRef) -> Result<ReachabilityFact, CapabilityError> {
        self.pause().await;
        let state = self.lock();
        if state.fail_reachability {
            return Err(CapabilityError::Provider(
                "simulated address lookup outage".to_string(),
            ));
        }
        match state.machines.get(&machine.to_string()) {
            Some(m) => Ok(ReachabilityFact {
                public_address: m.public_address.clone(),
                private_address: m.private_address.clone(),
            }),
            None => Err(CapabilityError::NotFound(machine.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>(), Ok(scenario));
        }
        assert!("bogus".parse::<Scenario>().is_err());
    }

    #[tokio::test]
    async fn test_blocked_scenario_shape() {
        let cloud = SimCloud::with_scenario(Scenario::Blocked);
        let target = sim_target();

        let fact = cloud.get(&target.machine).await.unwrap();
        assert_eq!(fact.power_state, PowerState::Running);

        let rules = cloud.list_rules(&target.acl).await.unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules
            .iter()
            .any(|r| r.access == RuleAccess::Deny && r.ports.matches(3389)));
        assert!(!rules
            .iter()
            .any(|r| r.access == RuleAccess::Allow && r.ports.matches(3389)));
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_name() {
        let cloud = SimCloud::with_scenario(Scenario::Conflict);
        let target = sim_target();

        let spec = RuleSpec {
            name: "AllowRDP".to_string(),
            direction: Direction::Inbound,
            access: RuleAccess::Allow,
            protocol: Protocol::Tcp,
            ports: PortSpec::Single(3389),
            precedence: 199,
            source_prefix: Some("*".to_string()),
            description: None,
        };
        cloud.upsert_rule(&target.acl, &spec).await.unwrap();

        let rules = cloud.rules(&target.acl);
        assert_eq!(rules.len(), 2);
        let updated = rules.iter().find(|r| r.name == "AllowRDP").unwrap();
        assert_eq!(updated.precedence, 199);
        assert_eq!(cloud.acl_write_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_machine_is_not_found() {
        let cloud = SimCloud::new();
        let target = sim_target();
        let err = cloud.get(&target.machine).await.unwrap_err();
        assert!(matches!(err, CapabilityError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_power_write_knob_fails_without_mutating() {
        let cloud = SimCloud::with_scenario(Scenario::Stopped);
        let target = sim_target();
        cloud.set_fail_power_writes(true);

        let err = cloud.start(&target.machine).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Provider(_)));
        assert_eq!(cloud.power(&target.machine), Some(PowerState::Deallocated));
        assert_eq!(cloud.power_write_count(), 0);
    }
}
