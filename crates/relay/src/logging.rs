//! Routing decision log.
//!
//! Emits one structured JSON record per relayed event on the `relay_decision`
//! tracing target, and optionally appends it to a JSON-lines file.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::types::{DecisionLog, RelayOutcome};

pub struct DecisionLogger {
    log_path: Option<PathBuf>,
    // Concurrent requests share one file; appends must not interleave.
    write_lock: Mutex<()>,
}

impl DecisionLogger {
    /// Create a logger that also appends to the given file path.
    /// If `None`, records go to tracing output only.
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self {
            log_path,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn log(&self, entry: &DecisionLog) {
        let json = serde_json::to_string(entry)
            .unwrap_or_else(|e| fallback_record(&format!("serialization failed: {}", e)));

        tracing::info!(target: "relay_decision", "{}", json);

        if let Some(ref path) = self.log_path {
            let _guard = self.write_lock.lock().await;
            if let Err(e) = append_log_line(path, &json).await {
                tracing::warn!("Failed to write decision log: {}", e);
            }
        }
    }

    /// Start a record for `request_id`; callers fill in what they learned.
    pub fn entry(request_id: &str, outcome: RelayOutcome) -> DecisionLog {
        DecisionLog {
            ts: Utc::now(),
            request_id: request_id.to_string(),
            source_channel: None,
            destination: None,
            destination_channel: None,
            outcome,
            attempts: None,
            duration_ms: None,
            error: None,
        }
    }
}

fn fallback_record(error: &str) -> String {
    serde_json::json!({
        "error": error,
        "ts": Utc::now().to_rfc3339(),
    })
    .to_string()
}

async fn append_log_line(path: &Path, line: &str) -> Result<(), std::io::Error> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
