//! Durable checkpoint storage for harvested records.
//!
//! The checkpoint is a whole-file JSON array of records, rewritten on every
//! trigger and promoted to the final artifact when a run completes cleanly.
//! Writes go through a temp-then-rename so a crash mid-write never leaves a
//! truncated file under the canonical path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::Record;

#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error("no checkpoint present")]
    Missing,
    #[error("checkpoint {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Load previously harvested records.
///
/// An absent artifact yields an empty set. A malformed artifact is a
/// recoverable condition: it is logged and the harvest restarts from
/// scratch rather than blocking.
pub fn load(path: &Path) -> Vec<Record> {
    match try_load(path) {
        Ok(records) => {
            info!("Loaded {} records from {}", records.len(), path.display());
            records
        }
        Err(LoadError::Missing) => Vec::new(),
        Err(err) => {
            warn!("Ignoring unreadable checkpoint, starting fresh: {}", err);
            Vec::new()
        }
    }
}

fn try_load(path: &Path) -> Result<Vec<Record>, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing);
    }
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|source| LoadError::Corrupt {
        path: path.display().to_string(),
        source,
    })
}

/// Write the full record set atomically.
///
/// Serializes to a `.tmp` sibling and renames it onto the canonical path, so
/// the prior checkpoint (or its absence) survives a crash mid-write.
pub fn save(path: &Path, records: &[Record]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("serializing records")?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}

/// Write the final artifact and retire the checkpoint.
///
/// A checkpoint that cannot be removed is harmless: the next run re-loads
/// already-finalized data and the ledger dedups it.
pub fn promote(checkpoint_path: &Path, final_path: &Path, records: &[Record]) -> Result<()> {
    save(final_path, records)?;
    if checkpoint_path.exists() {
        if let Err(err) = fs::remove_file(checkpoint_path) {
            warn!(
                "Could not remove checkpoint {}: {}",
                checkpoint_path.display(),
                err
            );
        }
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, Record};

    fn record(name: &str) -> Record {
        Record {
            name: name.to_string(),
            price: Some(2.5),
            description: Some("desc".to_string()),
            rating: None,
            category: "All Products".to_string(),
            availability: Availability::Unknown,
            image_url: None,
        }
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).is_empty());
    }

    #[test]
    fn test_load_corrupt_is_empty_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, "[{\"name\": \"trunca").unwrap();
        assert!(load(&path).is_empty());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        let records = vec![record("a"), record("b")];
        save(&path, &records).unwrap();
        assert_eq!(load(&path), records);
        // No temp residue after a completed save
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_interrupted_write_leaves_prior_checkpoint_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        let records = vec![record("a")];
        save(&path, &records).unwrap();

        // A crash mid-write leaves a half-written temp sibling; the
        // canonical path must still hold the prior valid snapshot.
        fs::write(tmp_path(&path), "[{\"name\":").unwrap();
        assert_eq!(load(&path), records);

        // And the next save replaces the leftover temp cleanly
        let more = vec![record("a"), record("b")];
        save(&path, &more).unwrap();
        assert_eq!(load(&path), more);
    }

    #[test]
    fn test_promote_writes_final_and_removes_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let partial = dir.path().join("partial.json");
        let output = dir.path().join("products.json");
        let records = vec![record("a"), record("b")];
        save(&partial, &records).unwrap();

        promote(&partial, &output, &records).unwrap();
        assert!(!partial.exists());
        assert_eq!(load(&output), records);
    }
}
