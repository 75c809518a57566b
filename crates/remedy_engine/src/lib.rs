//! Remediation engine - diagnoses and repairs remote-access outages.

pub mod audit;
pub mod capability;
pub mod collectors;
pub mod diagnosis;
pub mod executor;
pub mod gate;
pub mod intent;
pub mod narrative;
pub mod planner;
pub mod resolver;
pub mod session;
pub mod sim;
pub mod validation;

pub use capability::CloudHandles;
pub use intent::{classify_request, RequestIntent};
pub use session::SessionEngine;
