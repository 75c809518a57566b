//! Append-only JSONL audit log for remediation writes.

use anyhow::{Context, Result};
use remedy_common::AuditEntry;
use std::path::{Path, PathBuf};
use tokio::fs::{create_dir_all, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Audit logger for recording every attempted action
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    /// Create a logger for the given JSONL file, creating its directory.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let log_path = path.into();
        if let Some(dir) = log_path.parent() {
            create_dir_all(dir)
                .await
                .context("Failed to create audit log directory")?;
        }

        info!("Audit logger initialized: {}", log_path.display());

        Ok(Self { log_path })
    }

    /// Log an audit entry
    pub async fn log(&self, entry: &AuditEntry) -> Result<()> {
        let json = serde_json::to_string(entry)? + "\n";

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .context("Failed to open audit log")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write audit entry")?;

        file.sync_all().await.context("Failed to sync audit log")?;

        Ok(())
    }

    /// Read all audit entries (for reports)
    pub async fn read_all(&self) -> Result<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(vec![]);
        }

        let content = tokio::fs::read_to_string(&self.log_path)
            .await
            .context("Failed to read audit log")?;

        let entries: Vec<AuditEntry> = content
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        Ok(entries)
    }

    /// Get the path to the audit log
    pub fn path(&self) -> &Path {
        &self.log_path
    }
}
