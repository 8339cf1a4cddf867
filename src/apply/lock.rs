//! Named exclusive locks for destructive operations.
//!
//! A lock is a JSON marker file created with `create_new`, so acquisition
//! is a single atomic filesystem operation. Try-once semantics: if the
//! marker already exists the acquisition fails immediately with a
//! CONCURRENCY error carrying the holder's details; there is no waiting
//! and no retry. The guard removes the marker on drop, which covers every
//! exit path including errors and panics.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Marker payload, for diagnostics only. Staleness inspection is a
/// human's job; correctness relies solely on the marker's existence.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockInfo {
    pub created_at: String,
    pub pid: u32,
    pub operation: String,
}

/// Held exclusive lock. Dropping it releases the marker.
#[derive(Debug)]
pub struct Lock {
    path: PathBuf,
    operation: String,
}

impl Lock {
    /// Try to acquire the named lock, failing fast if it is held.
    pub fn try_acquire(locks_dir: &Path, operation: &str) -> Result<Self> {
        std::fs::create_dir_all(locks_dir)?;
        let path = locks_dir.join(format!("{operation}.lock"));

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(&path)
                    .ok()
                    .and_then(|s| serde_json::from_str::<LockInfo>(&s).ok());
                let detail = match holder {
                    Some(info) => format!(
                        "operation '{operation}' already running (pid {}, since {})",
                        info.pid, info.created_at
                    ),
                    None => format!("operation '{operation}' already running"),
                };
                return Err(Error::concurrency(detail));
            }
            Err(e) => return Err(e.into()),
        };

        let info = LockInfo {
            created_at: chrono::Utc::now().to_rfc3339(),
            pid: std::process::id(),
            operation: operation.to_string(),
        };
        let payload = serde_json::to_string_pretty(&info)
            .map_err(|e| Error::internal(format!("failed to serialize lock info: {e}")))?;
        file.write_all(payload.as_bytes())?;

        tracing::debug!(target: "apply", operation, path = %path.display(), "lock acquired");
        Ok(Self {
            path,
            operation: operation.to_string(),
        })
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(
                target: "apply",
                operation = %self.operation,
                error = %e,
                "failed to release lock marker"
            );
        } else {
            tracing::debug!(target: "apply", operation = %self.operation, "lock released");
        }
    }
}
