//! Explicit active-store pointer.
//!
//! Multiple staging stores can exist side by side (one per collection
//! under consolidation). Instead of a process-global "current database",
//! the chosen store is recorded in a small JSON pointer file under the
//! config directory, and every command resolves it explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct ActivePointer {
    db_path: PathBuf,
}

fn pointer_path() -> Result<PathBuf> {
    config::config_dir()
        .map(|d| d.join("active_store.json"))
        .ok_or_else(|| Error::precondition("could not determine config directory"))
}

/// Record `db` as the active staging store.
///
/// The store file itself does not have to exist yet; `init_store` creates
/// it on first use. The parent directory of `db` must exist so a typo'd
/// path fails here rather than later.
pub fn set_active(db: &Path) -> Result<PathBuf> {
    if let Some(parent) = db.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(Error::validation(format!(
                "parent directory does not exist: {}",
                parent.display()
            )));
        }
    }

    let absolute = if db.is_absolute() {
        db.to_path_buf()
    } else {
        std::env::current_dir()?.join(db)
    };

    let path = pointer_path()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let pointer = ActivePointer {
        db_path: absolute.clone(),
    };
    let contents = serde_json::to_string_pretty(&pointer)
        .map_err(|e| Error::internal(format!("failed to serialize active pointer: {e}")))?;
    std::fs::write(&path, contents)?;

    tracing::info!(target: "store", db = %absolute.display(), "active store set");
    Ok(absolute)
}

/// Resolve the active staging store, if one has been set.
pub fn get_active() -> Result<Option<PathBuf>> {
    let path = pointer_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)?;
    let pointer: ActivePointer = serde_json::from_str(&contents)
        .map_err(|e| Error::internal(format!("corrupt active pointer {}: {e}", path.display())))?;
    Ok(Some(pointer.db_path))
}

/// Resolve the store to operate on: explicit `--db` wins, then the
/// active pointer. No store at all is a precondition failure.
pub fn resolve_store(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(db) = explicit {
        return Ok(db.to_path_buf());
    }
    get_active()?.ok_or_else(|| {
        Error::precondition("no active store; run `activate --db <path>` or pass --db")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_roundtrip_json() {
        let pointer = ActivePointer {
            db_path: PathBuf::from("/stores/crate.db"),
        };
        let json = serde_json::to_string(&pointer).unwrap();
        let parsed: ActivePointer = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.db_path, PathBuf::from("/stores/crate.db"));
    }

    #[test]
    fn test_resolve_store_prefers_explicit() {
        let explicit = PathBuf::from("/tmp/explicit.db");
        let resolved = resolve_store(Some(&explicit)).unwrap();
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn test_set_active_rejects_missing_parent() {
        let err = set_active(Path::new("/definitely/not/a/real/dir/store.db")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
