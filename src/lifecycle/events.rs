//! Build event log
//!
//! Appends JSON lines to `<layers>/build-events.log`, one per detect
//! decision, cache decision and build outcome. Write failures are logged
//! and dropped; the event log never fails a build.

use chrono::Utc;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

/// File name of the event log inside the layers directory
pub const EVENT_LOG_FILE: &str = "build-events.log";

/// File-based event logger that appends JSON lines
pub struct BuildEventLog {
    enabled: bool,
    path: PathBuf,
    build_id: Uuid,
}

impl BuildEventLog {
    pub fn new(enabled: bool, path: PathBuf, build_id: Uuid) -> Self {
        Self {
            enabled,
            path,
            build_id,
        }
    }

    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    /// Log an event as a JSON line
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "build_id": self.build_id.to_string(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize build event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write build event log: {}", e);
        }
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
