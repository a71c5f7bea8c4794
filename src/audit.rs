//! Audit logging for sandbox violations and cache removals
//!
//! Writes JSON lines to `~/.local/state/imagix/audit.log`.
//! Enabled by default; `general.audit_log = false` turns it off.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-based audit logger that appends JSON lines
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    /// Create a new audit logger from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: ConfigManager::audit_log_path(),
        }
    }

    /// Log an audit event as a JSON line
    ///
    /// IO failures are reported with `warn!` and otherwise ignored.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log: {}", e);
        }
    }

    /// Record a request that tried to leave a sandbox root
    pub async fn path_forbidden(&self, operation: &str, requested: &str, reason: &str) {
        self.log(
            "path.forbidden",
            &serde_json::json!({
                "operation": operation,
                "requested": requested,
                "reason": reason,
            }),
        )
        .await;
    }

    /// Record a removal of cached files
    pub async fn cache_removed(
        &self,
        source: Option<&str>,
        format: Option<&str>,
        lifetime: Option<Duration>,
        count: usize,
    ) {
        self.log(
            "cache.remove",
            &serde_json::json!({
                "source": source,
                "format": format,
                "lifetime_secs": lifetime.map(|l| l.as_secs()),
                "count": count,
            }),
        )
        .await;
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
