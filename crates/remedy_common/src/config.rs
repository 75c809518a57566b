//! Configuration for the remediation engine.
//!
//! Loads settings from /etc/remedy/config.toml, falling back to
//! ./remedy.toml and then to defaults.

use crate::acl::{Direction, Protocol, RuleAccess, RuleSpec};
use crate::PortSpec;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/remedy/config.toml";

/// Fallback config file path (working directory)
pub const LOCAL_CONFIG_PATH: &str = "remedy.toml";

/// Fact collection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Per-collector timeout in seconds
    #[serde(default = "default_collector_timeout")]
    pub timeout_secs: u64,
}

fn default_collector_timeout() -> u64 {
    10
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_collector_timeout(),
        }
    }
}

/// Precedence window for the managed allow rule. Lower wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecedenceConfig {
    /// Lowest precedence the platform accepts
    #[serde(default = "default_minimum_precedence")]
    pub minimum: u32,

    /// Preferred precedence when no deny rule constrains the choice
    #[serde(default = "default_default_precedence")]
    pub default: u32,

    /// Highest precedence the platform accepts
    #[serde(default = "default_maximum_precedence")]
    pub maximum: u32,
}

fn default_minimum_precedence() -> u32 {
    100
}

fn default_default_precedence() -> u32 {
    500
}

fn default_maximum_precedence() -> u32 {
    4096
}

impl Default for PrecedenceConfig {
    fn default() -> Self {
        Self {
            minimum: default_minimum_precedence(),
            default: default_default_precedence(),
            maximum: default_maximum_precedence(),
        }
    }
}

/// The managed allow rule and the port it protects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Name of the upserted allow rule
    #[serde(default = "default_rule_name")]
    pub name: String,

    /// Remote-access port the engine watches
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_protocol")]
    pub protocol: Protocol,

    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,

    #[serde(default = "default_rule_description")]
    pub description: String,
}

fn default_rule_name() -> String {
    "AllowRDP".to_string()
}

fn default_port() -> u16 {
    3389
}

fn default_protocol() -> Protocol {
    Protocol::Tcp
}

fn default_source_prefix() -> String {
    "*".to_string()
}

fn default_rule_description() -> String {
    "Allow remote desktop access".to_string()
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            name: default_rule_name(),
            port: default_port(),
            protocol: default_protocol(),
            source_prefix: default_source_prefix(),
            description: default_rule_description(),
        }
    }
}

impl RuleConfig {
    /// Desired spec for the managed allow rule at a given precedence.
    pub fn allow_spec(&self, precedence: u32) -> RuleSpec {
        RuleSpec {
            name: self.name.clone(),
            direction: Direction::Inbound,
            access: RuleAccess::Allow,
            protocol: self.protocol,
            ports: PortSpec::Single(self.port),
            precedence,
            source_prefix: Some(self.source_prefix.clone()),
            description: Some(self.description.clone()),
        }
    }
}

/// Narrative generator endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarratorConfig {
    /// Use the HTTP generator; the template fallback serves otherwise
    #[serde(default = "default_narrator_enabled")]
    pub enabled: bool,

    #[serde(default = "default_narrator_base_url")]
    pub base_url: String,

    #[serde(default = "default_narrator_model")]
    pub model: String,

    #[serde(default = "default_narrator_timeout")]
    pub timeout_secs: u64,
}

fn default_narrator_enabled() -> bool {
    false
}

fn default_narrator_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_narrator_model() -> String {
    "llama3.2".to_string()
}

fn default_narrator_timeout() -> u64 {
    30
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_narrator_enabled(),
            base_url: default_narrator_base_url(),
            model: default_narrator_model(),
            timeout_secs: default_narrator_timeout(),
        }
    }
}

/// Audit log location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_path")]
    pub log_path: String,
}

fn default_audit_path() -> String {
    "/var/log/remedy/audit.jsonl".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: default_audit_path(),
        }
    }
}

/// Engine behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pause at awaiting_confirmation before any write
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: bool,
}

fn default_require_confirmation() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            require_confirmation: default_require_confirmation(),
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub collect: CollectConfig,

    #[serde(default)]
    pub precedence: PrecedenceConfig,

    #[serde(default)]
    pub rule: RuleConfig,

    #[serde(default)]
    pub narrator: NarratorConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load config from the standard locations, or return defaults.
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(LOCAL_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            })
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.collect.timeout_secs, 10);
        assert_eq!(config.precedence.minimum, 100);
        assert_eq!(config.precedence.default, 500);
        assert_eq!(config.precedence.maximum, 4096);
        assert_eq!(config.rule.name, "AllowRDP");
        assert_eq!(config.rule.port, 3389);
        assert!(config.engine.require_confirmation);
        assert!(!config.narrator.enabled);
    }

    #[test]
    fn test_parse_toml_overrides() {
        let toml_str = r#"
[precedence]
default = 900

[rule]
name = "AllowRemoteAccess"
port = 3390
protocol = "Tcp"

[engine]
require_confirmation = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.precedence.default, 900);
        assert_eq!(config.rule.name, "AllowRemoteAccess");
        assert_eq!(config.rule.port, 3390);
        assert!(!config.engine.require_confirmation);
        // Defaults for missing fields
        assert_eq!(config.precedence.minimum, 100);
        assert_eq!(config.collect.timeout_secs, 10);
    }

    #[test]
    fn test_allow_spec_carries_the_precedence() {
        let config = Config::default();
        let spec = config.rule.allow_spec(499);
        assert_eq!(spec.name, "AllowRDP");
        assert_eq!(spec.precedence, 499);
        assert_eq!(spec.access, RuleAccess::Allow);
        assert_eq!(spec.direction, Direction::Inbound);
        assert!(spec.ports.matches(3389));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("remedy.toml");
        fs::write(&path, "[rule]\nport = 2222\n").unwrap();

        let config = Config::load_from_path(path.to_str().unwrap()).unwrap();
        assert_eq!(config.rule.port, 2222);
        assert_eq!(config.rule.name, "AllowRDP");
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(Config::load_from_path("/nonexistent/remedy.toml").is_err());
    }
}
