//! Capability seams between the engine and whatever cloud sits behind it.
//!
//! Reads and writes are split so the authorization gate can grant one
//! without the other. The simulator implements all five; a real
//! provider wires in the same way.

use async_trait::async_trait;
use remedy_common::{
    AclContext, AclRule, CapabilityError, MachineRef, PowerFact, ReachabilityFact, RuleSpec,
};
use std::sync::Arc;

/// Observe machine power state.
#[async_trait]
pub trait PowerReader: Send + Sync {
    async fn get(&self, machine: &MachineRef) -> Result<PowerFact, CapabilityError>;
}

/// Start a stopped machine.
#[async_trait]
pub trait PowerWriter: Send + Sync {
    async fn start(&self, machine: &MachineRef) -> Result<(), CapabilityError>;
}

/// List the rules of a network ACL group.
#[async_trait]
pub trait AclReader: Send + Sync {
    async fn list_rules(&self, acl: &AclContext) -> Result<Vec<AclRule>, CapabilityError>;
}

/// Create or update a rule in a network ACL group.
#[async_trait]
pub trait AclWriter: Send + Sync {
    async fn upsert_rule(&self, acl: &AclContext, spec: &RuleSpec) -> Result<(), CapabilityError>;
}

/// Look up the machine's public and private addresses.
#[async_trait]
pub trait ReachabilityReader: Send + Sync {
    async fn addresses(&self, machine: &MachineRef) -> Result<ReachabilityFact, CapabilityError>;
}

/// One handle per capability.
#[derive(Clone)]
pub struct CloudHandles {
    pub power_read: Arc<dyn PowerReader>,
    pub power_write: Arc<dyn PowerWriter>,
    pub acl_read: Arc<dyn AclReader>,
    pub acl_write: Arc<dyn AclWriter>,
    pub reachability: Arc<dyn ReachabilityReader>,
}
