//! Diagnosed issues.

use crate::acl::AclAnalysis;
use crate::facts::{FactKind, PowerState};
use serde::{Deserialize, Serialize};

/// One diagnosed problem. The synthesizer orders power issues before
/// ACL issues so a plan starts the machine before touching rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// Machine is not running.
    PowerOff { observed: PowerState },
    /// No inbound allow rule admits the remote-access port.
    PortBlocked { port: u16, analysis: AclAnalysis },
    /// A deny rule numerically outranks the best allow rule on the port.
    PrecedenceConflict {
        port: u16,
        deny_precedence: u32,
        allow_precedence: u32,
    },
    /// A collector failed. Suppresses planning for its fact only.
    CollectionError { fact: FactKind, message: String },
}

impl Issue {
    /// Reachability failures are advisory and never block planning.
    pub fn is_warning_only(&self) -> bool {
        matches!(
            self,
            Issue::CollectionError {
                fact: FactKind::Reachability,
                ..
            }
        )
    }

    /// Short label used in reports and logs.
    pub fn summary(&self) -> String {
        match self {
            Issue::PowerOff { observed } => {
                format!("machine is {} instead of running", observed)
            }
            Issue::PortBlocked { port, .. } => {
                format!("no inbound allow rule admits port {}", port)
            }
            Issue::PrecedenceConflict {
                port,
                deny_precedence,
                allow_precedence,
            } => format!(
                "deny rule at precedence {} outranks allow at {} for port {}",
                deny_precedence, allow_precedence, port
            ),
            Issue::CollectionError { fact, message } => {
                format!("{} facts unavailable: {}", fact, message)
            }
        }
    }
}
